//! Per-call import state and the two-pass graph build
//!
//! Pass one walks the document depth-first, creates graph objects and
//! records each node's world matrix by uuid. Objects are only anchored to a
//! node uuid plus an offset at that point. Pass two applies the anchored
//! worlds and resolves fixture focus points, which may appear anywhere in
//! the document.

use super::profiles::{ProfileCache, ProfileLookup, entry_source};
use crate::archive::{Archive, AssetManifest, AssetSource, ExtractionCache};
use crate::error::{Diagnostics, Error, Result, Warning, WarningKind};
use crate::graph::{
    Constraint, FixtureInfo, GdtfLink, GraphObject, MeshAsset, ObjectId, ObjectKind, SceneGraph,
};
use crate::model::{
    Fixture, Geometry3D, GeometryItem, ImportConfig, Layer, NodeHeader, NodeKind, SceneDocument,
    SceneNode, Symbol,
};
use crate::transform::{LocalSource, relative_matrix, world_matrix};
use nalgebra::{Matrix4, Vector3};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::path::Path;

/// Name of the hidden root collection holding symbol definitions
pub const AUX_DATA_ROOT: &str = "AUXData";

/// Distance of a fresh fixture target below the fixture, in meters
const TARGET_DISTANCE: f64 = 2.0;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

enum PlacementKind {
    /// World is the anchor's world times this offset
    Offset(Matrix4<f64>),
    /// Move an already present subtree so its root lands on the anchor's world
    Rebase,
}

struct Placement {
    object: ObjectId,
    anchor: String,
    kind: PlacementKind,
}

struct PendingFixture {
    uuid: String,
    focus: Option<String>,
    aim: Option<ObjectId>,
    target: Option<ObjectId>,
}

pub(crate) struct ImportContext<'a, R: Read + Seek> {
    config: &'a ImportConfig,
    lookup: ProfileLookup<'a, R>,
    graph: SceneGraph,
    manifest: AssetManifest,
    diagnostics: Diagnostics,
    extraction: ExtractionCache,
    profiles: ProfileCache,
    existing: HashSet<String>,
    symdefs: HashMap<String, ObjectId>,
    node_worlds: HashMap<String, Matrix4<f64>>,
    placements: Vec<Placement>,
    fixtures: Vec<PendingFixture>,
}

impl<'a, R: Read + Seek> ImportContext<'a, R> {
    pub(crate) fn new(
        graph: SceneGraph,
        archive: Option<&'a mut Archive<R>>,
        archive_path: Option<&'a Path>,
        config: &'a ImportConfig,
    ) -> Self {
        let existing = graph.iter().filter_map(|(_, o)| o.uuid.clone()).collect();
        Self {
            config,
            lookup: ProfileLookup {
                archive,
                archive_path,
                config,
            },
            graph,
            manifest: AssetManifest::new(),
            diagnostics: Diagnostics::new(),
            extraction: ExtractionCache::new(),
            profiles: ProfileCache::default(),
            existing,
            symdefs: HashMap::new(),
            node_worlds: HashMap::new(),
            placements: Vec::new(),
            fixtures: Vec::new(),
        }
    }

    pub(crate) fn run(&mut self, document: &SceneDocument) -> Result<()> {
        for class in &document.aux_data.classes {
            self.graph.add_class(class.clone());
        }
        for position in &document.aux_data.positions {
            self.graph.add_position(position.clone());
        }
        self.symdefs(document)?;
        let global = *self.config.global().matrix();
        for (index, layer) in document.layers.iter().enumerate() {
            self.check_cancelled()?;
            self.layer(layer, index, &global)?;
        }
        self.images();

        self.apply_transforms();
        self.resolve_focus();
        tracing::debug!(
            templates = self.profiles.template_count(),
            extracted = self.extraction.len(),
            "Import pass finished"
        );
        Ok(())
    }

    pub(crate) fn finish(self) -> (SceneGraph, AssetManifest, Vec<Warning>) {
        (self.graph, self.manifest, self.diagnostics.into_vec())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.config.cancellation().is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn place(&mut self, object: ObjectId, anchor: &str, offset: Matrix4<f64>) {
        self.placements.push(Placement {
            object,
            anchor: anchor.to_string(),
            kind: PlacementKind::Offset(offset),
        });
    }

    /// Object created for `uuid` by an earlier import into the same graph
    fn existing_object(&self, uuid: &str, kind: NodeKind) -> Option<ObjectId> {
        if !self.existing.contains(uuid) {
            return None;
        }
        self.graph
            .find_uuid(uuid)
            .into_iter()
            .find(|id| self.graph.get(*id).is_some_and(|o| o.class == Some(kind)))
    }

    /// Sibling-unique name; collisions get a ` {scope}-{index}` suffix
    fn unique_name(&self, parent: Option<ObjectId>, base: &str, scope: &str, index: usize) -> String {
        let siblings = match parent {
            Some(p) => self.graph.children(p),
            None => self.graph.roots(),
        };
        let taken = |name: &str| {
            siblings
                .iter()
                .any(|id| self.graph.get(*id).is_some_and(|o| o.name == name))
        };
        if !taken(base) {
            return base.to_string();
        }
        let suffixed = format!("{} {}-{}", base, scope, index);
        let mut candidate = suffixed.clone();
        let mut counter = 1;
        while taken(&candidate) {
            candidate = format!("{}.{}", suffixed, counter);
            counter += 1;
        }
        candidate
    }

    fn symdefs(&mut self, document: &SceneDocument) -> Result<()> {
        let symdefs = &document.aux_data.symdefs;
        if symdefs.is_empty() {
            return Ok(());
        }
        let aux = match self.graph.root_by_name(AUX_DATA_ROOT) {
            Some(id) => id,
            None => {
                let mut root = GraphObject::new(AUX_DATA_ROOT, ObjectKind::Collection);
                root.hidden = true;
                self.graph.add(root, None)
            }
        };

        // Containers first, so symbols nested in definitions resolve in any order
        let mut fresh = Vec::new();
        for (index, symdef) in symdefs.iter().enumerate() {
            let uuid = &symdef.header.uuid;
            if let Some(id) = self.existing_object(uuid, NodeKind::Symdef) {
                self.symdefs.insert(uuid.clone(), id);
                continue;
            }
            let base = display_name(&symdef.header, NodeKind::Symdef);
            let name = self.unique_name(Some(aux), base, "aux", index);
            let mut container = GraphObject::new(name, ObjectKind::Collection)
                .with_class(NodeKind::Symdef, uuid.as_str());
            container.mvr_name = Some(symdef.header.name.clone());
            container.classing = symdef.header.classing.clone();
            container.hidden = true;
            let id = self.graph.add(container, Some(aux));
            self.symdefs.insert(uuid.clone(), id);
            self.node_worlds.insert(uuid.clone(), Matrix4::identity());
            fresh.push((id, symdef));
        }

        for (id, symdef) in fresh {
            self.check_cancelled()?;
            self.geometry_items(&symdef.geometries, id, &symdef.header.uuid, "aux");
            tracing::debug!(uuid = %symdef.header.uuid, name = %symdef.header.name, "Created symbol definition");
        }
        Ok(())
    }

    fn layer(&mut self, layer: &Layer, index: usize, global: &Matrix4<f64>) -> Result<()> {
        let uuid = &layer.header.uuid;
        let existing = self.graph.root_by_uuid(uuid);
        let placeholder = existing
            .and_then(|id| self.graph.get(id))
            .and_then(|o| relative_matrix(global, &o.world));
        let local = LocalSource::select(layer.header.matrix.as_ref(), placeholder.as_ref())
            .resolve(self.config.shear_policy());
        let world = world_matrix(&local, global);
        self.node_worlds.insert(uuid.clone(), world);

        let id = match existing {
            Some(id) => {
                self.placements.push(Placement {
                    object: id,
                    anchor: uuid.clone(),
                    kind: PlacementKind::Rebase,
                });
                id
            }
            None => {
                let base = display_name(&layer.header, NodeKind::Layer);
                let name = self.unique_name(None, base, "layer", index);
                let mut object =
                    GraphObject::new(name, ObjectKind::Collection).with_class(NodeKind::Layer, uuid.as_str());
                object.mvr_name = Some(layer.header.name.clone());
                object.classing = layer.header.classing.clone();
                let id = self.graph.add(object, None);
                self.place(id, uuid, Matrix4::identity());
                id
            }
        };

        self.child_list(&layer.child_list, id, uuid, &world, &index.to_string())?;

        if existing.is_none() && self.config.prune_empty_layers() && self.graph.children(id).is_empty() {
            tracing::debug!(uuid = %uuid, "Removing empty layer");
            self.graph.remove(id);
        }
        Ok(())
    }

    fn child_list(
        &mut self,
        nodes: &[SceneNode],
        parent: ObjectId,
        anchor: &str,
        parent_world: &Matrix4<f64>,
        scope: &str,
    ) -> Result<()> {
        let mut fixture_index = 0;
        for (index, node) in nodes.iter().enumerate() {
            self.check_cancelled()?;
            let result = match node {
                SceneNode::Fixture(fixture) => {
                    fixture_index += 1;
                    self.fixture(fixture, parent, parent_world, scope, index, fixture_index - 1)
                }
                _ => self.node(node, parent, anchor, parent_world, scope, index),
            };
            match result {
                Ok(()) => {}
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    let message = format!(
                        "Skipped {} '{}': {}",
                        node.kind().element_name(),
                        node.name(),
                        e
                    );
                    match node.uuid() {
                        Some(uuid) => self.diagnostics.warn_node(WarningKind::NodeSkipped, uuid, message),
                        None => self.diagnostics.warn(WarningKind::NodeSkipped, message),
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve a node's local matrix and world, reusing an earlier import's object
    ///
    /// Returns the world and, when the node was imported before, its object.
    fn enter(
        &mut self,
        header: &NodeHeader,
        kind: NodeKind,
        parent_world: &Matrix4<f64>,
    ) -> (Matrix4<f64>, Option<ObjectId>) {
        let existing = self.existing_object(&header.uuid, kind);
        let placeholder = existing
            .and_then(|id| self.graph.get(id))
            .and_then(|o| relative_matrix(parent_world, &o.world));
        let local = LocalSource::select(header.matrix.as_ref(), placeholder.as_ref())
            .resolve(self.config.shear_policy());
        let world = world_matrix(&local, parent_world);
        self.node_worlds.insert(header.uuid.clone(), world);
        if let Some(id) = existing {
            self.placements.push(Placement {
                object: id,
                anchor: header.uuid.clone(),
                kind: PlacementKind::Rebase,
            });
        }
        (world, existing)
    }

    fn node(
        &mut self,
        node: &SceneNode,
        parent: ObjectId,
        anchor: &str,
        parent_world: &Matrix4<f64>,
        scope: &str,
        index: usize,
    ) -> Result<()> {
        let kind = node.kind();
        let header = match node {
            SceneNode::Geometry3D(geometry) => {
                self.mesh(geometry, parent, anchor, scope, index);
                return Ok(());
            }
            SceneNode::Symdef(symdef) => {
                self.diagnostics.warn_node(
                    WarningKind::SchemaViolation,
                    &symdef.header.uuid,
                    "Symdef outside AUXData ignored",
                );
                return Ok(());
            }
            SceneNode::Symbol(symbol) => {
                let (_, existing) = self.enter(&symbol.header, kind, parent_world);
                if existing.is_none() {
                    self.symbol(symbol, parent, &symbol.header.uuid, Matrix4::identity(), scope, index);
                }
                return Ok(());
            }
            other => match other.header() {
                Some(header) => header,
                None => return Ok(()),
            },
        };

        let (world, existing) = self.enter(header, kind, parent_world);
        let child_scope = match kind {
            NodeKind::Layer | NodeKind::GroupObject => format!("{}-{}", scope, index),
            _ => index.to_string(),
        };
        let id = match existing {
            Some(id) => id,
            None => {
                let name = self.unique_name(Some(parent), display_name(header, kind), scope, index);
                let object_kind = match kind {
                    NodeKind::Layer | NodeKind::GroupObject => ObjectKind::Collection,
                    _ => ObjectKind::Empty,
                };
                let mut object = GraphObject::new(name, object_kind).with_class(kind, header.uuid.as_str());
                object.mvr_name = Some(header.name.clone());
                object.classing = header.classing.clone();
                object.gdtf = node.as_object().and_then(GdtfLink::from_node);
                let id = self.graph.add(object, Some(parent));
                self.place(id, &header.uuid, Matrix4::identity());
                self.geometry_items(node.geometries(), id, &header.uuid, &child_scope);
                tracing::debug!(kind = kind.element_name(), uuid = %header.uuid, "Created node");
                id
            }
        };
        self.child_list(node.children(), id, &header.uuid, &world, &child_scope)
    }

    fn geometry_items(&mut self, items: &[GeometryItem], parent: ObjectId, anchor: &str, scope: &str) {
        for (index, item) in items.iter().enumerate() {
            match item {
                GeometryItem::Geometry3D(geometry) => self.mesh(geometry, parent, anchor, scope, index),
                GeometryItem::Symbol(symbol) => {
                    let local = LocalSource::select(symbol.header.matrix.as_ref(), None)
                        .resolve(self.config.shear_policy());
                    self.symbol(symbol, parent, anchor, local, scope, index);
                }
            }
        }
    }

    fn symbol(
        &mut self,
        symbol: &Symbol,
        parent: ObjectId,
        anchor: &str,
        offset: Matrix4<f64>,
        scope: &str,
        index: usize,
    ) {
        let Some(definition) = self.symdefs.get(&symbol.symdef).copied() else {
            self.diagnostics.warn_node(
                WarningKind::UnresolvedReference,
                &symbol.header.uuid,
                format!("Symbol references unknown symdef '{}'", symbol.symdef),
            );
            return;
        };
        let base = if symbol.header.name.is_empty() {
            self.graph
                .get(definition)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| NodeKind::Symbol.element_name().to_string())
        } else {
            symbol.header.name.clone()
        };
        let name = self.unique_name(Some(parent), &base, scope, index);
        let mut object = GraphObject::new(name, ObjectKind::Instance { definition })
            .with_class(NodeKind::Symbol, symbol.header.uuid.as_str());
        object.mvr_name = Some(symbol.header.name.clone());
        object.classing = symbol.header.classing.clone();
        let id = self.graph.add(object, Some(parent));
        self.place(id, anchor, offset);
    }

    fn mesh(&mut self, geometry: &Geometry3D, parent: ObjectId, anchor: &str, scope: &str, index: usize) {
        let Some(asset) = self.mesh_asset(&geometry.file_name, anchor) else {
            return;
        };
        let local = LocalSource::select(geometry.matrix.as_ref(), None).resolve(self.config.shear_policy());
        let offset = local * Matrix4::new_scaling(asset.unit_scale);
        let base = Path::new(&geometry.file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| geometry.file_name.clone());
        let name = self.unique_name(Some(parent), &base, scope, index);
        let mut object = GraphObject::new(name, ObjectKind::Mesh(asset));
        object.class = Some(NodeKind::Geometry3D);
        let id = self.graph.add(object, Some(parent));
        self.place(id, anchor, offset);
    }

    /// Locate a mesh file and record it in the manifest
    ///
    /// Without an archive the mesh is kept by name only.
    fn mesh_asset(&mut self, file_name: &str, owner: &str) -> Option<MeshAsset> {
        let Some(archive) = self.lookup.archive.as_deref_mut() else {
            return Some(MeshAsset::new(file_name, None));
        };
        let Some(entry) = archive.find_entry(file_name).map(str::to_string) else {
            self.diagnostics.warn_node(
                WarningKind::MissingAsset,
                owner,
                format!("Mesh '{}' is not in the archive", file_name),
            );
            return None;
        };
        let source = match self.config.extract_dir() {
            Some(dir) => match archive.extract(&entry, dir, &mut self.extraction) {
                Ok(path) => Some(AssetSource::File(path)),
                Err(e) => {
                    self.diagnostics.warn_node(
                        WarningKind::MissingAsset,
                        owner,
                        format!("Cannot extract mesh '{}': {}", file_name, e),
                    );
                    return None;
                }
            },
            None => entry_source(self.lookup.archive_path, &entry),
        };
        if let Some(source) = &source
            && let Some(warning) = self.manifest.insert(source.clone(), file_name)
        {
            self.diagnostics.push(warning);
        }
        Some(MeshAsset::new(file_name, source))
    }

    fn fixture(
        &mut self,
        fixture: &Fixture,
        parent: ObjectId,
        parent_world: &Matrix4<f64>,
        scope: &str,
        index: usize,
        fixture_index: usize,
    ) -> Result<()> {
        let header = &fixture.header;
        let uuid = header.uuid.as_str();
        let (world, existing) = self.enter(header, NodeKind::Fixture, parent_world);
        let child_scope = index.to_string();
        if let Some(id) = existing {
            return self.child_list(&fixture.child_list, id, uuid, &world, &child_scope);
        }

        let profile = self.profiles.resolve(
            &fixture.gdtf_spec,
            &mut self.lookup,
            &mut self.manifest,
            &mut self.diagnostics,
        )?;
        let template = profile.as_ref().and_then(|p| {
            self.profiles.template(
                p,
                &fixture.gdtf_mode,
                self.config.add_targets(),
                &mut self.diagnostics,
            )
        });

        let base = format!(
            "{} {}-{}",
            display_name(header, NodeKind::Fixture),
            scope,
            fixture_index
        );
        let name = self.unique_name(Some(parent), &base, scope, index);
        let mut root = GraphObject::new(name, ObjectKind::Empty).with_class(NodeKind::Fixture, uuid);
        root.mvr_name = Some(header.name.clone());
        root.classing = header.classing.clone();
        root.fixture = Some(FixtureInfo {
            gdtf_spec: fixture.gdtf_spec.clone(),
            gdtf_mode: fixture.gdtf_mode.clone(),
            fixture_id: fixture.fixture_id.clone(),
            fixture_id_numeric: fixture.fixture_id_numeric,
            unit_number: fixture.unit_number,
            custom_id: fixture.custom_id,
            addresses: fixture.addresses.clone(),
            color: fixture.color,
            focus: fixture.focus.clone(),
            position: fixture.position.clone(),
            cast_shadow: fixture.cast_shadow,
            profile: profile.as_ref().map(|p| p.source.clone()),
            channel_count: template.as_ref().map_or(0, |t| t.layout.channel_count()),
        });
        let root = self.graph.add(root, Some(parent));
        self.place(root, uuid, Matrix4::identity());

        let mut aim = None;
        let mut target = None;
        if let Some(template) = template {
            let mut parts: Vec<ObjectId> = Vec::with_capacity(template.nodes.len());
            for (i, node) in template.nodes.iter().enumerate() {
                let part_parent = node.parent.and_then(|p| parts.get(p).copied()).unwrap_or(root);
                let mut part = GraphObject::new(
                    node.name.clone(),
                    ObjectKind::FixturePart {
                        geometry: node.original_name.clone(),
                        model: node.model.clone(),
                        beam: node.beam.clone(),
                    },
                );
                if let Some(constraint) = node.constraint {
                    part.constraints.push(Constraint::Rotation(constraint));
                }
                let id = self.graph.add(part, Some(part_parent));
                self.place(id, uuid, template.fixture_matrix(i));
                parts.push(id);
            }
            aim = parts.get(template.aim_node()).copied();

            if self.config.add_targets() {
                let id = self.graph.add(GraphObject::new("Target", ObjectKind::Target), Some(root));
                self.place(
                    id,
                    uuid,
                    Matrix4::new_translation(&Vector3::new(0.0, 0.0, -TARGET_DISTANCE)),
                );
                target = Some(id);
            }
        }
        self.fixtures.push(PendingFixture {
            uuid: uuid.to_string(),
            focus: fixture.focus.clone(),
            aim,
            target,
        });
        tracing::debug!(uuid, spec = %fixture.gdtf_spec, mode = %fixture.gdtf_mode, "Created fixture");

        self.child_list(&fixture.child_list, root, uuid, &world, &child_scope)
    }

    /// Attach image entries of the archive
    fn images(&mut self) {
        if !self.config.include_images() {
            return;
        }
        let Some(archive) = self.lookup.archive.as_deref_mut() else {
            return;
        };
        let names: Vec<String> = archive
            .entry_names()
            .iter()
            .filter(|n| is_image(n))
            .cloned()
            .collect();
        for name in names {
            let source = match self.config.extract_dir() {
                Some(dir) => match archive.extract(&name, dir, &mut self.extraction) {
                    Ok(path) => Some(AssetSource::File(path)),
                    Err(e) => {
                        self.diagnostics.warn(
                            WarningKind::MissingAsset,
                            format!("Cannot extract image '{}': {}", name, e),
                        );
                        None
                    }
                },
                None => entry_source(self.lookup.archive_path, &name),
            };
            let Some(source) = source else { continue };
            self.graph.attach(source.clone(), name.as_str());
            if let Some(warning) = self.manifest.insert(source, name) {
                self.diagnostics.push(warning);
            }
        }
    }

    fn apply_transforms(&mut self) {
        for placement in std::mem::take(&mut self.placements) {
            let Some(anchor) = self.node_worlds.get(&placement.anchor).copied() else {
                continue;
            };
            match placement.kind {
                PlacementKind::Offset(offset) => {
                    if let Some(object) = self.graph.get_mut(placement.object) {
                        object.world = anchor * offset;
                    }
                }
                PlacementKind::Rebase => self.rebase(placement.object, &anchor),
            }
        }
    }

    fn rebase(&mut self, id: ObjectId, target: &Matrix4<f64>) {
        let Some(current) = self.graph.get(id).map(|o| o.world) else {
            return;
        };
        let Some(inverse) = current.try_inverse() else {
            if let Some(object) = self.graph.get_mut(id) {
                object.world = *target;
            }
            return;
        };
        let delta = target * inverse;
        for d in self.graph.descendants(id) {
            if let Some(object) = self.graph.get_mut(d) {
                object.world = delta * object.world;
            }
        }
    }

    fn resolve_focus(&mut self) {
        for pending in std::mem::take(&mut self.fixtures) {
            let mut focus_object = None;
            if let Some(focus) = &pending.focus {
                focus_object = self.graph.find_uuid(focus).into_iter().find(|id| {
                    self.graph
                        .get(*id)
                        .is_some_and(|o| o.class == Some(NodeKind::FocusPoint))
                });
                if focus_object.is_none() {
                    self.diagnostics.warn_node(
                        WarningKind::UnresolvedReference,
                        &pending.uuid,
                        format!("Focus point '{}' not found", focus),
                    );
                }
            }

            let track = match (pending.target, focus_object) {
                (Some(target), Some(focus)) => {
                    let focus_world = self.graph.get(focus).map(|o| o.world);
                    if let (Some(world), Some(object)) = (focus_world, self.graph.get_mut(target)) {
                        object.world = world;
                    }
                    Some(target)
                }
                (Some(target), None) => Some(target),
                (None, focus) => focus,
            };
            if let (Some(aim), Some(track)) = (pending.aim, track)
                && let Some(object) = self.graph.get_mut(aim)
            {
                object.constraints.push(Constraint::TrackTo(track));
            }
        }
    }
}

fn display_name(header: &NodeHeader, kind: NodeKind) -> &str {
    if header.name.is_empty() {
        kind.element_name()
    } else {
        &header.name
    }
}

fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image() {
        assert!(is_image("textures/stage.PNG"));
        assert!(is_image("photo.jpeg"));
        assert!(!is_image("truss.3ds"));
        assert!(!is_image("png"));
    }

    #[test]
    fn test_display_name_defaults_to_element() {
        let header = NodeHeader::new("U1", "");
        assert_eq!(display_name(&header, NodeKind::Truss), "Truss");
        let header = NodeHeader::new("U1", "Main");
        assert_eq!(display_name(&header, NodeKind::Truss), "Main");
    }
}
