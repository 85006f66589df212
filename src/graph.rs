//! In-memory scene graph produced by import and consumed by export
//!
//! The graph is an arena of [`GraphObject`]s addressed by [`ObjectId`].
//! Objects carry typed metadata (MVR class, uuid, fixture patch data) and a
//! world matrix in the host frame, that is after the global coordinate
//! conversion.

use crate::archive::AssetSource;
use crate::gdtf::{ModelSource, ProfileSource, RotationConstraint};
use crate::model::{Address, BeamParams, CieColor, NamedRef, NodeKind, ObjectNode};
use nalgebra::Matrix4;

/// Handle of an object in a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Arena index
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A mesh file referenced by the scene
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAsset {
    /// Name of the file inside an MVR archive
    pub archive_name: String,
    /// Where the bytes can be read, when known
    pub source: Option<AssetSource>,
    /// Scale from file units to meters, baked into the object's world matrix
    pub unit_scale: f64,
}

impl MeshAsset {
    /// Create an asset; `.3ds` files are in millimeters
    pub fn new(archive_name: impl Into<String>, source: Option<AssetSource>) -> Self {
        let archive_name = archive_name.into();
        let unit_scale = if archive_name.to_ascii_lowercase().ends_with(".3ds") {
            crate::gdtf::UNIT_SCALE_3DS
        } else {
            1.0
        };
        Self {
            archive_name,
            source,
            unit_scale,
        }
    }
}

/// What an object is
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// Grouping container (layers, groups, scene objects, definitions)
    Collection,
    /// Placed mesh
    Mesh(MeshAsset),
    /// Placement of a definition container
    Instance {
        /// The definition container
        definition: ObjectId,
    },
    /// Transform-only object
    Empty,
    /// Part of a fixture's kinematic chain
    FixturePart {
        /// Geometry name in the profile
        geometry: String,
        /// Model rendering the part
        model: ModelSource,
        /// Beam parameters of beam parts
        beam: Option<BeamParams>,
    },
    /// Aim target of a fixture
    Target,
}

/// Constraint attached to an object
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Keep aiming at another object
    TrackTo(ObjectId),
    /// Rotation limited to a channel's physical range
    Rotation(RotationConstraint),
}

/// Patch and profile data of a fixture object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixtureInfo {
    /// Profile file name
    pub gdtf_spec: String,
    /// DMX mode
    pub gdtf_mode: String,
    /// Fixture id
    pub fixture_id: Option<String>,
    /// Numeric fixture id
    pub fixture_id_numeric: Option<u32>,
    /// Unit number
    pub unit_number: Option<u32>,
    /// Custom id
    pub custom_id: Option<u32>,
    /// Patch addresses
    pub addresses: Vec<Address>,
    /// Gel color
    pub color: Option<CieColor>,
    /// Focus point uuid
    pub focus: Option<String>,
    /// Position uuid
    pub position: Option<String>,
    /// Cast shadow flag
    pub cast_shadow: Option<bool>,
    /// Where the profile came from, `None` when it was never loaded
    pub profile: Option<ProfileSource>,
    /// Flattened channel count of the mode
    pub channel_count: usize,
}

/// GDTF link of a scene object, truss, support, projector or video screen
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GdtfLink {
    /// Profile file name
    pub gdtf_spec: Option<String>,
    /// DMX mode
    pub gdtf_mode: Option<String>,
    /// Fixture id
    pub fixture_id: Option<String>,
}

impl GdtfLink {
    /// Link of an object node; `None` when it carries no GDTF data
    pub fn from_node(node: &ObjectNode) -> Option<Self> {
        let link = Self {
            gdtf_spec: node.gdtf_spec.clone(),
            gdtf_mode: node.gdtf_mode.clone(),
            fixture_id: node.fixture_id.clone(),
        };
        (link != Self::default()).then_some(link)
    }
}

/// One object of the scene graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphObject {
    /// Display name, unique among siblings
    pub name: String,
    /// Name of the MVR node, written back on export instead of `name`
    pub mvr_name: Option<String>,
    /// Object type
    pub kind: ObjectKind,
    /// MVR node type the object was created from
    pub class: Option<NodeKind>,
    /// MVR uuid
    pub uuid: Option<String>,
    /// Class uuid
    pub classing: Option<String>,
    /// Parent object
    pub parent: Option<ObjectId>,
    /// Child objects in creation order
    pub children: Vec<ObjectId>,
    /// World matrix in the host frame
    pub world: Matrix4<f64>,
    /// Excluded from display
    pub hidden: bool,
    /// Fixture data of fixture roots
    pub fixture: Option<FixtureInfo>,
    /// GDTF data of non-fixture objects
    pub gdtf: Option<GdtfLink>,
    /// Attached constraints
    pub constraints: Vec<Constraint>,
}

impl GraphObject {
    /// Create an object at the origin
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            mvr_name: None,
            kind,
            class: None,
            uuid: None,
            classing: None,
            parent: None,
            children: Vec::new(),
            world: Matrix4::identity(),
            hidden: false,
            fixture: None,
            gdtf: None,
            constraints: Vec::new(),
        }
    }

    /// Set the MVR class and uuid
    pub fn with_class(mut self, class: NodeKind, uuid: impl Into<String>) -> Self {
        self.class = Some(class);
        self.uuid = Some(uuid.into());
        self
    }

    /// Set the world matrix
    pub fn with_world(mut self, world: Matrix4<f64>) -> Self {
        self.world = world;
        self
    }

    /// Name to write on export: the MVR name, else the display name
    pub fn export_name(&self) -> &str {
        self.mvr_name.as_deref().unwrap_or(&self.name)
    }

    /// Whether this is a collection
    pub fn is_collection(&self) -> bool {
        matches!(self.kind, ObjectKind::Collection)
    }
}

/// Arena of scene objects
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    slots: Vec<Option<GraphObject>>,
    roots: Vec<ObjectId>,
    attachments: Vec<(AssetSource, String)>,
    classes: Vec<NamedRef>,
    positions: Vec<NamedRef>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object under `parent`, or as a root
    ///
    /// The object's `parent` field is overwritten.
    pub fn add(&mut self, mut object: GraphObject, parent: Option<ObjectId>) -> ObjectId {
        let id = ObjectId(self.slots.len());
        object.parent = parent.filter(|p| self.get(*p).is_some());
        match object.parent {
            Some(p) => {
                if let Some(parent) = self.get_mut(p) {
                    parent.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.slots.push(Some(object));
        id
    }

    /// Object by id; `None` once removed
    pub fn get(&self, id: ObjectId) -> Option<&GraphObject> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable object by id
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GraphObject> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Remove an object and its descendants
    pub fn remove(&mut self, id: ObjectId) {
        let Some(parent) = self.get(id).map(|o| o.parent) else {
            return;
        };
        match parent {
            Some(p) => {
                if let Some(parent) = self.get_mut(p) {
                    parent.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        self.drop_subtree(id);
    }

    fn drop_subtree(&mut self, id: ObjectId) {
        let Some(object) = self.slots.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for child in object.children {
            self.drop_subtree(child);
        }
    }

    /// Top-level objects in creation order
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    /// Children of an object
    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.get(id).map(|o| o.children.as_slice()).unwrap_or_default()
    }

    /// Live objects in creation order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &GraphObject)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.as_ref().map(|o| (ObjectId(i), o)))
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether the graph holds no objects
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first order from the roots, parents before children
    pub fn walk(&self) -> Vec<ObjectId> {
        let mut order = Vec::with_capacity(self.slots.len());
        let mut stack: Vec<ObjectId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// An object followed by all its descendants, depth-first
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.get(current).is_none() {
                continue;
            }
            order.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        order
    }

    /// All objects carrying a uuid, in creation order
    pub fn find_uuid(&self, uuid: &str) -> Vec<ObjectId> {
        self.iter()
            .filter(|(_, o)| o.uuid.as_deref() == Some(uuid))
            .map(|(id, _)| id)
            .collect()
    }

    /// Root with a uuid
    pub fn root_by_uuid(&self, uuid: &str) -> Option<ObjectId> {
        self.roots
            .iter()
            .copied()
            .find(|r| self.get(*r).and_then(|o| o.uuid.as_deref()) == Some(uuid))
    }

    /// Root with a name
    pub fn root_by_name(&self, name: &str) -> Option<ObjectId> {
        self.roots
            .iter()
            .copied()
            .find(|r| self.get(*r).is_some_and(|o| o.name == name))
    }

    /// Instances placing a definition container
    pub fn instances_of(&self, definition: ObjectId) -> Vec<ObjectId> {
        self.iter()
            .filter(|(_, o)| o.kind == ObjectKind::Instance { definition })
            .map(|(id, _)| id)
            .collect()
    }

    /// Slash-separated names from the root down to `id`
    pub fn path(&self, id: ObjectId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let Some(object) = self.get(c) else { break };
            names.push(object.name.as_str());
            current = object.parent;
        }
        names.reverse();
        names.join("/")
    }

    /// World matrix of an object's parent; `None` for roots
    pub fn parent_world(&self, id: ObjectId) -> Option<Matrix4<f64>> {
        let parent = self.get(id)?.parent?;
        self.get(parent).map(|p| p.world)
    }

    /// Attach a file (such as a reference image) to be packed on export
    pub fn attach(&mut self, source: AssetSource, archive_name: impl Into<String>) {
        let archive_name = archive_name.into();
        if !self.attachments.iter().any(|(_, n)| *n == archive_name) {
            self.attachments.push((source, archive_name));
        }
    }

    /// Attached files
    pub fn attachments(&self) -> &[(AssetSource, String)] {
        &self.attachments
    }

    /// Record an MVR class; a known uuid takes the new name
    pub fn add_class(&mut self, class: NamedRef) {
        upsert(&mut self.classes, class);
    }

    /// MVR classes referenced by `classing`
    pub fn classes(&self) -> &[NamedRef] {
        &self.classes
    }

    /// Record an MVR position; a known uuid takes the new name
    pub fn add_position(&mut self, position: NamedRef) {
        upsert(&mut self.positions, position);
    }

    /// MVR positions referenced by fixtures
    pub fn positions(&self) -> &[NamedRef] {
        &self.positions
    }
}

fn upsert(entries: &mut Vec<NamedRef>, entry: NamedRef) {
    match entries.iter_mut().find(|e| e.uuid == entry.uuid) {
        Some(existing) => existing.name = entry.name,
        None => entries.push(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(name: &str) -> GraphObject {
        GraphObject::new(name, ObjectKind::Collection)
    }

    #[test]
    fn test_add_and_walk() {
        let mut graph = SceneGraph::new();
        let layer = graph.add(collection("Layer"), None);
        let truss = graph.add(GraphObject::new("Truss", ObjectKind::Empty), Some(layer));
        let mesh = graph.add(
            GraphObject::new("truss.3ds", ObjectKind::Mesh(MeshAsset::new("truss.3ds", None))),
            Some(truss),
        );
        let other = graph.add(collection("Other"), None);

        assert_eq!(graph.roots(), &[layer, other]);
        assert_eq!(graph.walk(), vec![layer, truss, mesh, other]);
        assert_eq!(graph.path(mesh), "Layer/Truss/truss.3ds");
        assert_eq!(graph.descendants(truss), vec![truss, mesh]);
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_mesh_unit_scale() {
        assert_eq!(MeshAsset::new("a.3DS", None).unit_scale, 0.001);
        assert_eq!(MeshAsset::new("a.glb", None).unit_scale, 1.0);
    }

    #[test]
    fn test_remove_subtree() {
        let mut graph = SceneGraph::new();
        let layer = graph.add(collection("Layer"), None);
        let group = graph.add(collection("Group"), Some(layer));
        let leaf = graph.add(GraphObject::new("Leaf", ObjectKind::Empty), Some(group));
        let keep = graph.add(GraphObject::new("Keep", ObjectKind::Empty), Some(layer));

        graph.remove(group);
        assert!(graph.get(group).is_none());
        assert!(graph.get(leaf).is_none());
        assert_eq!(graph.children(layer), &[keep]);
        assert_eq!(graph.roots(), &[layer]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_uuid_lookup_and_instances() {
        let mut graph = SceneGraph::new();
        let aux = graph.add(collection("AUXData"), None);
        let def = graph.add(collection("Chair").with_class(NodeKind::Symdef, "S1"), Some(aux));
        let layer = graph.add(collection("Layer").with_class(NodeKind::Layer, "L1"), None);
        for _ in 0..2 {
            graph.add(
                GraphObject::new("Chair", ObjectKind::Instance { definition: def }),
                Some(layer),
            );
        }
        assert_eq!(graph.find_uuid("S1"), vec![def]);
        assert_eq!(graph.root_by_uuid("L1"), Some(layer));
        assert_eq!(graph.root_by_name("AUXData"), Some(aux));
        assert_eq!(graph.instances_of(def).len(), 2);
    }

    #[test]
    fn test_classes_keyed_by_uuid() {
        let mut graph = SceneGraph::new();
        let class = |uuid: &str, name: &str| NamedRef {
            uuid: uuid.to_string(),
            name: name.to_string(),
        };
        graph.add_class(class("C1", "Lighting"));
        graph.add_class(class("C2", "Video"));
        graph.add_class(class("C1", "Light"));
        assert_eq!(graph.classes().len(), 2);
        assert_eq!(graph.classes()[0].name, "Light");
        assert!(graph.positions().is_empty());
    }

    #[test]
    fn test_export_name_prefers_mvr_name() {
        let mut object = GraphObject::new("Spot 0-0", ObjectKind::Empty);
        assert_eq!(object.export_name(), "Spot 0-0");
        object.mvr_name = Some("Spot".to_string());
        assert_eq!(object.export_name(), "Spot");
    }

    #[test]
    fn test_gdtf_link_only_when_present() {
        assert_eq!(GdtfLink::from_node(&ObjectNode::default()), None);
        let node = ObjectNode {
            gdtf_spec: Some("Acme@Proj.gdtf".to_string()),
            ..ObjectNode::default()
        };
        let link = GdtfLink::from_node(&node).unwrap();
        assert_eq!(link.gdtf_spec.as_deref(), Some("Acme@Proj.gdtf"));
        assert_eq!(link.gdtf_mode, None);
    }

    #[test]
    fn test_attachments_are_unique_by_name() {
        let mut graph = SceneGraph::new();
        graph.attach(AssetSource::File("/a/stage.png".into()), "stage.png");
        graph.attach(AssetSource::File("/b/stage.png".into()), "stage.png");
        assert_eq!(graph.attachments().len(), 1);
    }
}
