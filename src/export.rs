//! Scene graph serialization to MVR
//!
//! [`serialize`] turns a [`SceneGraph`] back into a [`SceneDocument`] plus the
//! asset manifest of the package. Local matrices are recovered from world
//! matrices, so the graph may have been edited freely after import.

use crate::archive::{AssetManifest, AssetSource, write_package_to_file};
use crate::error::{Diagnostics, Result, Warning, WarningKind};
use crate::graph::{FixtureInfo, GraphObject, MeshAsset, ObjectId, ObjectKind, SceneGraph};
use crate::ident::stable_uuid;
use crate::import::AUX_DATA_ROOT;
use crate::model::{
    ExportConfig, Fixture, FocusPoint, Geometry3D, GeometryItem, GroupObject, Layer, NodeHeader,
    NodeKind, ObjectNode, SceneDocument, SceneNode, Symbol, Symdef,
};
use crate::transform::{LocalSource, Transform, relative_matrix};
use crate::writer::write_scene_xml;
use nalgebra::Matrix4;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Name of the layer collecting top-level objects that are not layers
const LOOSE_OBJECTS_LAYER: &str = "Layer";

/// Result of serializing a graph
#[derive(Debug)]
pub struct ExportOutput {
    /// The scene description
    pub document: SceneDocument,
    /// Files to pack next to the description
    pub manifest: AssetManifest,
    /// Recoverable problems, in the order they were found
    pub warnings: Vec<Warning>,
}

/// Per-call export state
struct ExportContext<'a> {
    graph: &'a SceneGraph,
    config: &'a ExportConfig,
    manifest: AssetManifest,
    diagnostics: Diagnostics,
    /// Definition containers in first-use order
    definitions: Vec<ObjectId>,
    uuids: HashMap<ObjectId, String>,
}

/// Convert a graph into a scene document and asset manifest
pub fn serialize(graph: &SceneGraph, config: &ExportConfig) -> Result<ExportOutput> {
    let mut context = ExportContext {
        graph,
        config,
        manifest: AssetManifest::new(),
        diagnostics: Diagnostics::new(),
        definitions: Vec::new(),
        uuids: HashMap::new(),
    };
    let document = context.document();
    Ok(ExportOutput {
        document,
        manifest: context.manifest,
        warnings: context.diagnostics.into_vec(),
    })
}

/// Export a graph to an MVR package at `path`
///
/// Returns the warnings of serialization followed by those of packing.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn export_mvr(
    graph: &SceneGraph,
    path: impl AsRef<Path>,
    config: &ExportConfig,
) -> Result<Vec<Warning>> {
    let start = Instant::now();
    let output = serialize(graph, config)?;
    let xml = write_scene_xml(&output.document)?;
    let mut warnings = output.warnings;
    warnings.extend(write_package_to_file(path, &xml, &output.manifest)?);
    tracing::info!(
        layers = output.document.layers.len(),
        symdefs = output.document.aux_data.symdefs.len(),
        assets = output.manifest.len(),
        warnings = warnings.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Exported scene"
    );
    Ok(warnings)
}

impl ExportContext<'_> {
    fn document(&mut self) -> SceneDocument {
        let graph = self.graph;
        let global = *self.config.global().matrix();
        let mut document = SceneDocument::new();
        document.provider = Some(self.config.provider().to_string());
        document.provider_version = Some(self.config.provider_version().to_string());
        document.aux_data.classes = graph.classes().to_vec();
        document.aux_data.positions = graph.positions().to_vec();

        let mut loose = Vec::new();
        for &id in graph.roots() {
            let Some(object) = graph.get(id) else {
                continue;
            };
            if object.name == AUX_DATA_ROOT && object.uuid.is_none() {
                // Definitions come out through their instances; unused ones are kept too
                for &child in graph.children(id) {
                    self.definition_index(child);
                }
                continue;
            }
            if object.is_collection() {
                let header = self.header(id, object, &global);
                let child_list = self.child_list(id, &object.world);
                document.layers.push(Layer { header, child_list });
            } else {
                loose.push(id);
            }
        }

        if !loose.is_empty() {
            let header = NodeHeader::new(stable_uuid(LOOSE_OBJECTS_LAYER), LOOSE_OBJECTS_LAYER);
            let mut child_list = Vec::new();
            for id in loose {
                self.node(id, &global, &mut child_list);
            }
            document.layers.push(Layer { header, child_list });
        }

        // Symdefs may reference further definitions while being converted
        let mut index = 0;
        while let Some(&id) = self.definitions.get(index) {
            if let Some(symdef) = self.symdef(id) {
                document.aux_data.symdefs.push(symdef);
            }
            index += 1;
        }
        self.attachments();
        document
    }

    fn uuid(&mut self, id: ObjectId) -> String {
        let graph = self.graph;
        if let Some(uuid) = self.uuids.get(&id) {
            return uuid.clone();
        }
        let uuid = match graph.get(id).and_then(|o| o.uuid.clone()) {
            Some(uuid) if !uuid.is_empty() => uuid,
            _ => stable_uuid(&graph.path(id)),
        };
        self.uuids.insert(id, uuid.clone());
        uuid
    }

    fn local(&mut self, object: &GraphObject, parent_world: &Matrix4<f64>) -> Matrix4<f64> {
        match relative_matrix(parent_world, &object.world) {
            Some(local) => LocalSource::Placeholder(&local).resolve(self.config.shear_policy()),
            None => {
                self.diagnostics.warn(
                    WarningKind::MalformedTransform,
                    format!("Parent frame of '{}' is singular, writing its world matrix", object.name),
                );
                object.world
            }
        }
    }

    fn header(&mut self, id: ObjectId, object: &GraphObject, parent_world: &Matrix4<f64>) -> NodeHeader {
        let local = self.local(object, parent_world);
        NodeHeader {
            uuid: self.uuid(id),
            name: object.export_name().to_string(),
            matrix: Some(Transform::from_matrix(&local)),
            classing: object.classing.clone(),
        }
    }

    fn definition_index(&mut self, id: ObjectId) {
        if !self.definitions.contains(&id) {
            self.definitions.push(id);
        }
    }

    /// Child list of a layer or group; meshes and instances become list entries
    fn child_list(&mut self, parent: ObjectId, parent_world: &Matrix4<f64>) -> Vec<SceneNode> {
        let graph = self.graph;
        let mut nodes = Vec::new();
        for &child in graph.children(parent) {
            match self.geometry_item(child, parent_world) {
                Some(GeometryItem::Geometry3D(g)) => nodes.push(SceneNode::Geometry3D(g)),
                Some(GeometryItem::Symbol(s)) => nodes.push(SceneNode::Symbol(s)),
                None => self.node(child, parent_world, &mut nodes),
            }
        }
        nodes
    }

    /// Children of an object node split into geometries and child nodes
    fn object_children(
        &mut self,
        parent: ObjectId,
        parent_world: &Matrix4<f64>,
    ) -> (Vec<GeometryItem>, Vec<SceneNode>) {
        let graph = self.graph;
        let mut geometries = Vec::new();
        let mut nodes = Vec::new();
        for &child in graph.children(parent) {
            match self.geometry_item(child, parent_world) {
                Some(item) => geometries.push(item),
                None => self.node(child, parent_world, &mut nodes),
            }
        }
        (geometries, nodes)
    }

    /// Geometry entry for mesh and instance objects
    ///
    /// Mesh objects whose file cannot be found yield no entry and a warning.
    fn geometry_item(&mut self, id: ObjectId, parent_world: &Matrix4<f64>) -> Option<GeometryItem> {
        let graph = self.graph;
        let object = graph.get(id)?;
        match &object.kind {
            ObjectKind::Mesh(asset) => {
                let source = self.locate(asset)?;
                if let Some(warning) = self.manifest.insert(source, asset.archive_name.as_str()) {
                    self.diagnostics.push(warning);
                }
                let local = self.local(object, parent_world) * Matrix4::new_scaling(1.0 / asset.unit_scale);
                Some(GeometryItem::Geometry3D(Geometry3D {
                    file_name: asset.archive_name.clone(),
                    matrix: Some(Transform::from_matrix(&local)),
                }))
            }
            ObjectKind::Instance { definition } => {
                let definition = *definition;
                if graph.get(definition).is_none() {
                    self.diagnostics.warn(
                        WarningKind::UnresolvedReference,
                        format!("Instance '{}' has no definition", object.name),
                    );
                    return None;
                }
                self.definition_index(definition);
                let symdef = self.uuid(definition);
                Some(GeometryItem::Symbol(Symbol {
                    header: self.header(id, object, parent_world),
                    symdef,
                }))
            }
            _ => None,
        }
    }

    /// Convert a non-geometry object, appending the result to `out`
    fn node(&mut self, id: ObjectId, parent_world: &Matrix4<f64>, out: &mut Vec<SceneNode>) {
        let graph = self.graph;
        let Some(object) = graph.get(id) else {
            return;
        };
        if let Some(info) = &object.fixture {
            self.fixture(id, object, info, parent_world, out);
            return;
        }
        match (&object.kind, object.class) {
            (ObjectKind::Collection, Some(NodeKind::Symdef)) => self.definition_index(id),
            (ObjectKind::Collection, _) => {
                let header = self.header(id, object, parent_world);
                let child_list = self.child_list(id, &object.world);
                out.push(SceneNode::GroupObject(GroupObject { header, child_list }));
            }
            (ObjectKind::Empty, Some(NodeKind::FocusPoint)) => {
                // A focus point has no child list; other children become its siblings
                let header = self.header(id, object, parent_world);
                let mut geometries = Vec::new();
                let mut siblings = Vec::new();
                for &child in graph.children(id) {
                    match self.geometry_item(child, &object.world) {
                        Some(item) => geometries.push(item),
                        None => self.node(child, parent_world, &mut siblings),
                    }
                }
                out.push(SceneNode::FocusPoint(FocusPoint { header, geometries }));
                out.extend(siblings);
            }
            (ObjectKind::Empty, class) => {
                let kind = class.filter(NodeKind::is_object).unwrap_or(NodeKind::SceneObject);
                let header = self.header(id, object, parent_world);
                let (geometries, child_list) = self.object_children(id, &object.world);
                let gdtf = object.gdtf.clone().unwrap_or_default();
                let node = ObjectNode {
                    header,
                    geometries,
                    child_list,
                    gdtf_spec: gdtf.gdtf_spec,
                    gdtf_mode: gdtf.gdtf_mode,
                    fixture_id: gdtf.fixture_id,
                };
                out.extend(SceneNode::object(kind, node));
            }
            (ObjectKind::FixturePart { .. } | ObjectKind::Target, _) => {
                tracing::debug!(name = %object.name, "Skipping fixture part outside a fixture");
            }
            (ObjectKind::Mesh(_) | ObjectKind::Instance { .. }, _) => {}
        }
    }

    fn fixture(
        &mut self,
        id: ObjectId,
        object: &GraphObject,
        info: &FixtureInfo,
        parent_world: &Matrix4<f64>,
        out: &mut Vec<SceneNode>,
    ) {
        let graph = self.graph;
        let header = self.header(id, object, parent_world);
        let mut focus = info.focus.clone();
        let mut focus_point = None;
        let mut child_list = Vec::new();

        for &child in graph.children(id) {
            let Some(part) = graph.get(child) else {
                continue;
            };
            match part.kind {
                ObjectKind::FixturePart { .. } => {}
                ObjectKind::Target => {
                    if focus.is_none() {
                        let uuid = self.uuid(child);
                        let name = format!("{} Target", object.export_name());
                        let mut point = NodeHeader::new(uuid.as_str(), name);
                        point.matrix = Some(Transform::from_matrix(&self.local(part, parent_world)));
                        focus = Some(uuid);
                        focus_point = Some(FocusPoint {
                            header: point,
                            geometries: Vec::new(),
                        });
                    }
                }
                _ => match self.geometry_item(child, &object.world) {
                    Some(GeometryItem::Geometry3D(g)) => child_list.push(SceneNode::Geometry3D(g)),
                    Some(GeometryItem::Symbol(s)) => child_list.push(SceneNode::Symbol(s)),
                    None => self.node(child, &object.world, &mut child_list),
                },
            }
        }

        if let Some(source) = info.profile.as_ref().and_then(|p| p.asset_source()) {
            match self.locate_source(Some(&source), &info.gdtf_spec) {
                Some(source) => {
                    if let Some(warning) = self.manifest.insert(source, info.gdtf_spec.as_str()) {
                        self.diagnostics.push(warning);
                    }
                }
                None => self.diagnostics.warn_node(
                    WarningKind::MissingAsset,
                    &header.uuid,
                    format!("Profile '{}' not found", info.gdtf_spec),
                ),
            }
        }

        tracing::debug!(uuid = %header.uuid, spec = %info.gdtf_spec, "Exported fixture");
        out.push(SceneNode::Fixture(Fixture {
            header,
            gdtf_spec: info.gdtf_spec.clone(),
            gdtf_mode: info.gdtf_mode.clone(),
            focus,
            position: info.position.clone(),
            fixture_id: info.fixture_id.clone(),
            fixture_id_numeric: info.fixture_id_numeric,
            unit_number: info.unit_number,
            custom_id: info.custom_id,
            addresses: info.addresses.clone(),
            color: info.color,
            cast_shadow: info.cast_shadow,
            child_list,
        }));
        out.extend(focus_point.map(SceneNode::FocusPoint));
    }

    fn symdef(&mut self, id: ObjectId) -> Option<Symdef> {
        let graph = self.graph;
        let object = graph.get(id)?;
        let uuid = self.uuid(id);
        let mut geometries = Vec::new();
        for &child in graph.children(id) {
            if let Some(item) = self.geometry_item(child, &object.world) {
                geometries.push(item);
            }
        }
        Some(Symdef {
            header: NodeHeader {
                uuid,
                name: object.export_name().to_string(),
                matrix: None,
                classing: object.classing.clone(),
            },
            geometries,
        })
    }

    fn attachments(&mut self) {
        let graph = self.graph;
        for (source, name) in graph.attachments() {
            match self.locate_source(Some(source), name) {
                Some(source) => {
                    if let Some(warning) = self.manifest.insert(source, name.as_str()) {
                        self.diagnostics.push(warning);
                    }
                }
                None => self.diagnostics.warn(
                    WarningKind::MissingAsset,
                    format!("Attachment '{}' not found", name),
                ),
            }
        }
    }

    fn locate(&mut self, asset: &MeshAsset) -> Option<AssetSource> {
        let found = self.locate_source(asset.source.as_ref(), &asset.archive_name);
        if found.is_none() {
            self.diagnostics.warn(
                WarningKind::MissingAsset,
                format!("Mesh '{}' not found, geometry skipped", asset.archive_name),
            );
        }
        found
    }

    /// An existing source for an asset, searching the asset directories by file name
    fn locate_source(&self, source: Option<&AssetSource>, archive_name: &str) -> Option<AssetSource> {
        if let Some(source) = source
            && source_exists(source)
        {
            return Some(source.clone());
        }
        let file_name = Path::new(archive_name).file_name()?.to_string_lossy().into_owned();
        find_in_dirs(self.config.asset_dirs(), &file_name).map(AssetSource::File)
    }
}

fn source_exists(source: &AssetSource) -> bool {
    match source {
        AssetSource::File(path) => path.is_file(),
        AssetSource::ArchiveEntry { archive, .. } => archive.is_file(),
    }
}

fn find_in_dirs(dirs: &[PathBuf], file_name: &str) -> Option<PathBuf> {
    dirs.iter().find_map(|dir| {
        WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| {
                e.file_type().is_file() && e.file_name().to_string_lossy().eq_ignore_ascii_case(file_name)
            })
            .map(|e| e.into_path())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FixtureInfo;
    use nalgebra::Vector3;

    fn translation(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    fn layer(graph: &mut SceneGraph) -> ObjectId {
        graph.add(
            GraphObject::new("Main", ObjectKind::Collection).with_class(NodeKind::Layer, "L1"),
            None,
        )
    }

    #[test]
    fn test_local_recovered_from_worlds() {
        let mut graph = SceneGraph::new();
        let l = layer(&mut graph);
        let group = graph.add(
            GraphObject::new("Rig", ObjectKind::Collection).with_world(translation(0.0, 2.0, 0.0)),
            Some(l),
        );
        graph.add(
            GraphObject::new("Truss", ObjectKind::Empty)
                .with_class(NodeKind::Truss, "T1")
                .with_world(translation(1.0, 2.0, 0.0)),
            Some(group),
        );

        let output = serialize(&graph, &ExportConfig::new()).unwrap();
        let SceneNode::GroupObject(group) = &output.document.layers[0].child_list[0] else {
            panic!("expected a group");
        };
        let SceneNode::Truss(truss) = &group.child_list[0] else {
            panic!("expected a truss");
        };
        let local = truss.header.matrix.unwrap().to_matrix();
        assert!((local[(0, 3)] - 1.0).abs() < 1e-9);
        assert!(local[(1, 3)].abs() < 1e-9);
        assert_eq!(truss.header.uuid, "T1");
        assert_eq!(group.header.uuid, stable_uuid("Main/Rig"));
    }

    #[test]
    fn test_missing_mesh_skips_geometry_keeps_node() {
        let mut graph = SceneGraph::new();
        let l = layer(&mut graph);
        let object = graph.add(
            GraphObject::new("Screen", ObjectKind::Empty).with_class(NodeKind::VideoScreen, "V1"),
            Some(l),
        );
        graph.add(
            GraphObject::new(
                "screen.glb",
                ObjectKind::Mesh(MeshAsset::new(
                    "screen.glb",
                    Some(AssetSource::File(PathBuf::from("/nonexistent/screen.glb"))),
                )),
            ),
            Some(object),
        );

        let output = serialize(&graph, &ExportConfig::new()).unwrap();
        let SceneNode::VideoScreen(screen) = &output.document.layers[0].child_list[0] else {
            panic!("expected a video screen");
        };
        assert!(screen.geometries.is_empty());
        assert!(output.manifest.is_empty());
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].kind, WarningKind::MissingAsset);
    }

    #[test]
    fn test_mesh_found_in_asset_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("meshes")).unwrap();
        std::fs::write(dir.path().join("meshes/truss.3ds"), b"3ds").unwrap();

        let mut graph = SceneGraph::new();
        let l = layer(&mut graph);
        graph.add(
            GraphObject::new("truss.3ds", ObjectKind::Mesh(MeshAsset::new("truss.3ds", None)))
                .with_world(Matrix4::new_scaling(0.001)),
            Some(l),
        );

        let config = ExportConfig::new().with_asset_dir(dir.path());
        let output = serialize(&graph, &config).unwrap();
        assert!(output.warnings.is_empty());
        assert!(output.manifest.contains("truss.3ds"));
        let SceneNode::Geometry3D(geometry) = &output.document.layers[0].child_list[0] else {
            panic!("expected a geometry");
        };
        assert!(geometry.matrix.unwrap().to_matrix().is_identity(1e-9));
    }

    #[test]
    fn test_shared_definition_written_once() {
        let mut graph = SceneGraph::new();
        let aux = graph.add(GraphObject::new(AUX_DATA_ROOT, ObjectKind::Collection), None);
        let definition = graph.add(
            GraphObject::new("Pipe", ObjectKind::Collection).with_class(NodeKind::Symdef, "S1"),
            Some(aux),
        );
        let l = layer(&mut graph);
        for i in 0..4 {
            graph.add(
                GraphObject::new(format!("Pipe {}", i), ObjectKind::Instance { definition })
                    .with_world(translation(i as f64, 0.0, 0.0)),
                Some(l),
            );
        }

        let output = serialize(&graph, &ExportConfig::new()).unwrap();
        assert_eq!(output.document.aux_data.symdefs.len(), 1);
        assert_eq!(output.document.layers.len(), 1);
        let symbols: Vec<_> = output.document.layers[0]
            .child_list
            .iter()
            .filter_map(|n| match n {
                SceneNode::Symbol(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(symbols.len(), 4);
        assert!(symbols.iter().all(|s| s.symdef == "S1"));
    }

    #[test]
    fn test_fixture_target_becomes_focus_point() {
        let mut graph = SceneGraph::new();
        let l = layer(&mut graph);
        let mut fixture = GraphObject::new("Spot", ObjectKind::Empty)
            .with_class(NodeKind::Fixture, "F1")
            .with_world(translation(0.0, 0.0, 5.0));
        fixture.fixture = Some(FixtureInfo {
            gdtf_spec: "Acme@Spot.gdtf".to_string(),
            gdtf_mode: "Basic".to_string(),
            ..Default::default()
        });
        let f = graph.add(fixture, Some(l));
        graph.add(
            GraphObject::new("Target", ObjectKind::Target).with_world(translation(0.0, 0.0, 3.0)),
            Some(f),
        );

        let output = serialize(&graph, &ExportConfig::new()).unwrap();
        let children = &output.document.layers[0].child_list;
        assert_eq!(children.len(), 2);
        let SceneNode::Fixture(fixture) = &children[0] else {
            panic!("expected a fixture");
        };
        let SceneNode::FocusPoint(point) = &children[1] else {
            panic!("expected a focus point");
        };
        assert_eq!(fixture.focus.as_deref(), Some(point.header.uuid.as_str()));
        assert!(fixture.child_list.is_empty());
        let local = point.header.matrix.unwrap().to_matrix();
        assert!((local[(2, 3)] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_focus_point_children_written_in_parent_frame() {
        let mut graph = SceneGraph::new();
        let l = layer(&mut graph);
        let point = graph.add(
            GraphObject::new("Center", ObjectKind::Empty)
                .with_class(NodeKind::FocusPoint, "FP1")
                .with_world(translation(0.0, 0.0, 5.0)),
            Some(l),
        );
        graph.add(
            GraphObject::new("Marker", ObjectKind::Empty)
                .with_class(NodeKind::SceneObject, "O1")
                .with_world(translation(1.0, 0.0, 5.0)),
            Some(point),
        );

        let output = serialize(&graph, &ExportConfig::new()).unwrap();
        let children = &output.document.layers[0].child_list;
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].kind(), NodeKind::FocusPoint);
        let SceneNode::SceneObject(marker) = &children[1] else {
            panic!("expected a scene object");
        };
        let local = marker.header.matrix.unwrap().to_matrix();
        assert!((local[(0, 3)] - 1.0).abs() < 1e-9);
        assert!((local[(2, 3)] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_mvr_name_and_gdtf_link_written() {
        let mut graph = SceneGraph::new();
        let l = layer(&mut graph);
        let mut projector = GraphObject::new("Beamer 0-1", ObjectKind::Empty)
            .with_class(NodeKind::Projector, "PR1");
        projector.mvr_name = Some("Beamer".to_string());
        projector.gdtf = Some(crate::graph::GdtfLink {
            gdtf_spec: Some("Acme@Proj.gdtf".to_string()),
            ..Default::default()
        });
        graph.add(projector, Some(l));
        graph.add_class(crate::model::NamedRef {
            uuid: "C1".to_string(),
            name: "Video".to_string(),
        });

        let output = serialize(&graph, &ExportConfig::new()).unwrap();
        let SceneNode::Projector(node) = &output.document.layers[0].child_list[0] else {
            panic!("expected a projector");
        };
        assert_eq!(node.header.name, "Beamer");
        assert_eq!(node.gdtf_spec.as_deref(), Some("Acme@Proj.gdtf"));
        assert_eq!(output.document.aux_data.classes.len(), 1);
    }

    #[test]
    fn test_loose_roots_collected_in_layer() {
        let mut graph = SceneGraph::new();
        graph.add(
            GraphObject::new("Truss", ObjectKind::Empty).with_class(NodeKind::Truss, "T1"),
            None,
        );
        let output = serialize(&graph, &ExportConfig::new()).unwrap();
        assert_eq!(output.document.layers.len(), 1);
        assert_eq!(output.document.layers[0].header.name, LOOSE_OBJECTS_LAYER);
        assert_eq!(output.document.provider.as_deref(), Some(crate::model::DEFAULT_PROVIDER));
    }
}
