//! Typed MVR scene description nodes

use super::color::CieColor;
use crate::error::{Error, Result};
use crate::transform::Transform;

/// Number of DMX channels in one universe
pub const UNIVERSE_SIZE: u32 = 512;

/// Highest universe whose absolute addresses fit in a `u32`
pub const MAX_UNIVERSE: u32 = (u32::MAX - UNIVERSE_SIZE) / UNIVERSE_SIZE + 1;

/// Kind of a scene node, one per MVR element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// `<Layer>`
    Layer,
    /// `<GroupObject>`
    GroupObject,
    /// `<SceneObject>`
    SceneObject,
    /// `<Truss>`
    Truss,
    /// `<Support>`
    Support,
    /// `<Projector>`
    Projector,
    /// `<VideoScreen>`
    VideoScreen,
    /// `<Fixture>`
    Fixture,
    /// `<FocusPoint>`
    FocusPoint,
    /// `<Symbol>`
    Symbol,
    /// `<Symdef>`
    Symdef,
    /// `<Geometry3D>`
    Geometry3D,
}

impl NodeKind {
    /// XML element name of this kind
    pub fn element_name(&self) -> &'static str {
        match self {
            NodeKind::Layer => "Layer",
            NodeKind::GroupObject => "GroupObject",
            NodeKind::SceneObject => "SceneObject",
            NodeKind::Truss => "Truss",
            NodeKind::Support => "Support",
            NodeKind::Projector => "Projector",
            NodeKind::VideoScreen => "VideoScreen",
            NodeKind::Fixture => "Fixture",
            NodeKind::FocusPoint => "FocusPoint",
            NodeKind::Symbol => "Symbol",
            NodeKind::Symdef => "Symdef",
            NodeKind::Geometry3D => "Geometry3D",
        }
    }

    /// Kind for an XML element name, if it is a scene node
    pub fn from_element_name(name: &str) -> Option<Self> {
        Some(match name {
            "Layer" => NodeKind::Layer,
            "GroupObject" => NodeKind::GroupObject,
            "SceneObject" => NodeKind::SceneObject,
            "Truss" => NodeKind::Truss,
            "Support" => NodeKind::Support,
            "Projector" => NodeKind::Projector,
            "VideoScreen" => NodeKind::VideoScreen,
            "Fixture" => NodeKind::Fixture,
            "FocusPoint" => NodeKind::FocusPoint,
            "Symbol" => NodeKind::Symbol,
            "Symdef" => NodeKind::Symdef,
            "Geometry3D" => NodeKind::Geometry3D,
            _ => return None,
        })
    }

    /// Whether this kind is one of the geometry-carrying object kinds
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            NodeKind::SceneObject
                | NodeKind::Truss
                | NodeKind::Support
                | NodeKind::Projector
                | NodeKind::VideoScreen
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Attributes shared by every node that carries an identity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeHeader {
    /// Stable identity, the only cross-reference key
    pub uuid: String,
    /// Display label, may be empty and may collide
    pub name: String,
    /// Local transform, `None` when absent or unparseable
    pub matrix: Option<Transform>,
    /// Uuid of an AUXData class
    pub classing: Option<String>,
}

impl NodeHeader {
    /// Create a header with a uuid and name
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            matrix: None,
            classing: None,
        }
    }

    /// Set the local matrix (builder style)
    pub fn with_matrix(mut self, matrix: Transform) -> Self {
        self.matrix = Some(matrix);
        self
    }
}

/// A reference to a mesh file
///
/// Geometry3D carries no uuid on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry3D {
    /// Archive-relative mesh file name
    pub file_name: String,
    /// Local transform
    pub matrix: Option<Transform>,
}

impl Geometry3D {
    /// Create a geometry reference
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            matrix: None,
        }
    }
}

/// An instance of a symbol definition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Symbol {
    /// Identity and placement
    pub header: NodeHeader,
    /// Uuid of the referenced [`Symdef`]
    pub symdef: String,
}

/// Geometry entry of an object or symbol definition
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryItem {
    /// A mesh file
    Geometry3D(Geometry3D),
    /// An instance of a symbol definition
    Symbol(Symbol),
}

/// A reusable, named geometry group
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Symdef {
    /// Identity
    pub header: NodeHeader,
    /// Geometries and nested symbols of the definition
    pub geometries: Vec<GeometryItem>,
}

/// A top-level layer of the scene
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layer {
    /// Identity
    pub header: NodeHeader,
    /// Child nodes in document order
    pub child_list: Vec<SceneNode>,
}

impl Layer {
    /// Create an empty layer
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            header: NodeHeader::new(uuid, name),
            child_list: Vec::new(),
        }
    }
}

/// A group of nodes sharing a frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupObject {
    /// Identity and placement
    pub header: NodeHeader,
    /// Child nodes in document order
    pub child_list: Vec<SceneNode>,
}

/// Common shape of SceneObject, Truss, Support, Projector and VideoScreen
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectNode {
    /// Identity and placement
    pub header: NodeHeader,
    /// Geometries of this object
    pub geometries: Vec<GeometryItem>,
    /// Child nodes in document order
    pub child_list: Vec<SceneNode>,
    /// Optional GDTF profile file (objects may be GDTF based)
    pub gdtf_spec: Option<String>,
    /// Optional DMX mode of the GDTF profile
    pub gdtf_mode: Option<String>,
    /// Optional fixture id
    pub fixture_id: Option<String>,
}

/// One DMX patch record of a fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    /// DMX break the address belongs to
    pub dmx_break: u32,
    /// Universe, 1-based
    pub universe: u32,
    /// Address within the universe, 1..=512
    pub address: u32,
}

impl Address {
    /// Create an address from an absolute channel number
    pub fn from_absolute(dmx_break: u32, absolute: u32) -> Result<Self> {
        if absolute == 0 {
            return Err(Error::parse_error_with_context(
                "Address",
                "0",
                "absolute DMX address starting at 1",
            ));
        }
        Ok(Self {
            dmx_break,
            universe: (absolute - 1) / UNIVERSE_SIZE + 1,
            address: (absolute - 1) % UNIVERSE_SIZE + 1,
        })
    }

    /// Parse patch text: absolute (`513`) or `universe.address` (`2.1`)
    pub fn parse(text: &str, dmx_break: u32) -> Result<Self> {
        let text = text.trim();
        match text.split_once('.') {
            Some((universe, address)) => {
                let universe: u32 = universe.trim().parse().map_err(|_| {
                    Error::parse_error_with_context("Address", text, "universe.address")
                })?;
                let address: u32 = address.trim().parse().map_err(|_| {
                    Error::parse_error_with_context("Address", text, "universe.address")
                })?;
                if universe == 0 || universe > MAX_UNIVERSE || address == 0 || address > UNIVERSE_SIZE
                {
                    return Err(Error::parse_error_with_context(
                        "Address",
                        text,
                        "universe in 1..=8388607 and address in 1..=512",
                    ));
                }
                Ok(Self {
                    dmx_break,
                    universe,
                    address,
                })
            }
            None => {
                let absolute: u32 = text.parse().map_err(|_| {
                    Error::parse_error_with_context("Address", text, "DMX address")
                })?;
                Self::from_absolute(dmx_break, absolute)
            }
        }
    }

    /// Absolute channel number across universes
    ///
    /// Saturates at `u32::MAX` for hand-built addresses past [`MAX_UNIVERSE`].
    pub fn absolute(&self) -> u32 {
        self.universe
            .saturating_sub(1)
            .saturating_mul(UNIVERSE_SIZE)
            .saturating_add(self.address)
    }
}

/// A patched lighting fixture
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fixture {
    /// Identity and placement
    pub header: NodeHeader,
    /// GDTF profile file, `Manufacturer@Model.gdtf`
    pub gdtf_spec: String,
    /// DMX mode name, empty means the profile's first mode
    pub gdtf_mode: String,
    /// Uuid of the FocusPoint this fixture aims at
    pub focus: Option<String>,
    /// Uuid of an AUXData position
    pub position: Option<String>,
    /// Fixture id text
    pub fixture_id: Option<String>,
    /// Numeric fixture id
    pub fixture_id_numeric: Option<u32>,
    /// Unit number
    pub unit_number: Option<u32>,
    /// Custom id
    pub custom_id: Option<u32>,
    /// Patch records in document order
    pub addresses: Vec<Address>,
    /// Gel color
    pub color: Option<CieColor>,
    /// Whether the fixture casts shadows
    pub cast_shadow: Option<bool>,
    /// Child nodes in document order
    pub child_list: Vec<SceneNode>,
}

/// An aim target for fixtures
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FocusPoint {
    /// Identity and placement
    pub header: NodeHeader,
    /// Geometries of the focus point
    pub geometries: Vec<GeometryItem>,
}

/// Any node of a scene description
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    /// A layer
    Layer(Layer),
    /// A group
    GroupObject(GroupObject),
    /// A generic scene object
    SceneObject(ObjectNode),
    /// A truss
    Truss(ObjectNode),
    /// A support (hoist, rigging point)
    Support(ObjectNode),
    /// A projector
    Projector(ObjectNode),
    /// A video screen
    VideoScreen(ObjectNode),
    /// A fixture
    Fixture(Fixture),
    /// A focus point
    FocusPoint(FocusPoint),
    /// A symbol instance
    Symbol(Symbol),
    /// A symbol definition
    Symdef(Symdef),
    /// A mesh reference
    Geometry3D(Geometry3D),
}

impl SceneNode {
    /// Kind of this node
    pub fn kind(&self) -> NodeKind {
        match self {
            SceneNode::Layer(_) => NodeKind::Layer,
            SceneNode::GroupObject(_) => NodeKind::GroupObject,
            SceneNode::SceneObject(_) => NodeKind::SceneObject,
            SceneNode::Truss(_) => NodeKind::Truss,
            SceneNode::Support(_) => NodeKind::Support,
            SceneNode::Projector(_) => NodeKind::Projector,
            SceneNode::VideoScreen(_) => NodeKind::VideoScreen,
            SceneNode::Fixture(_) => NodeKind::Fixture,
            SceneNode::FocusPoint(_) => NodeKind::FocusPoint,
            SceneNode::Symbol(_) => NodeKind::Symbol,
            SceneNode::Symdef(_) => NodeKind::Symdef,
            SceneNode::Geometry3D(_) => NodeKind::Geometry3D,
        }
    }

    /// Header of this node; Geometry3D has none
    pub fn header(&self) -> Option<&NodeHeader> {
        match self {
            SceneNode::Layer(n) => Some(&n.header),
            SceneNode::GroupObject(n) => Some(&n.header),
            SceneNode::SceneObject(n)
            | SceneNode::Truss(n)
            | SceneNode::Support(n)
            | SceneNode::Projector(n)
            | SceneNode::VideoScreen(n) => Some(&n.header),
            SceneNode::Fixture(n) => Some(&n.header),
            SceneNode::FocusPoint(n) => Some(&n.header),
            SceneNode::Symbol(n) => Some(&n.header),
            SceneNode::Symdef(n) => Some(&n.header),
            SceneNode::Geometry3D(_) => None,
        }
    }

    /// Uuid of this node
    pub fn uuid(&self) -> Option<&str> {
        self.header().map(|h| h.uuid.as_str())
    }

    /// Display name of this node
    pub fn name(&self) -> &str {
        match self {
            SceneNode::Geometry3D(g) => &g.file_name,
            other => other.header().map(|h| h.name.as_str()).unwrap_or_default(),
        }
    }

    /// Local transform of this node
    pub fn matrix(&self) -> Option<&Transform> {
        match self {
            SceneNode::Geometry3D(g) => g.matrix.as_ref(),
            other => other.header().and_then(|h| h.matrix.as_ref()),
        }
    }

    /// Child nodes, empty for leaves
    pub fn children(&self) -> &[SceneNode] {
        match self {
            SceneNode::Layer(n) => &n.child_list,
            SceneNode::GroupObject(n) => &n.child_list,
            SceneNode::SceneObject(n)
            | SceneNode::Truss(n)
            | SceneNode::Support(n)
            | SceneNode::Projector(n)
            | SceneNode::VideoScreen(n) => &n.child_list,
            SceneNode::Fixture(n) => &n.child_list,
            _ => &[],
        }
    }

    /// Geometry entries, empty when the node has none
    pub fn geometries(&self) -> &[GeometryItem] {
        match self {
            SceneNode::SceneObject(n)
            | SceneNode::Truss(n)
            | SceneNode::Support(n)
            | SceneNode::Projector(n)
            | SceneNode::VideoScreen(n) => &n.geometries,
            SceneNode::FocusPoint(n) => &n.geometries,
            SceneNode::Symdef(n) => &n.geometries,
            _ => &[],
        }
    }

    /// Object node of SceneObject, Truss, Support, Projector and VideoScreen
    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            SceneNode::SceneObject(n)
            | SceneNode::Truss(n)
            | SceneNode::Support(n)
            | SceneNode::Projector(n)
            | SceneNode::VideoScreen(n) => Some(n),
            _ => None,
        }
    }

    /// Wrap an object node in the variant for `kind`
    ///
    /// Returns `None` when `kind` is not an object kind.
    pub fn object(kind: NodeKind, node: ObjectNode) -> Option<Self> {
        Some(match kind {
            NodeKind::SceneObject => SceneNode::SceneObject(node),
            NodeKind::Truss => SceneNode::Truss(node),
            NodeKind::Support => SceneNode::Support(node),
            NodeKind::Projector => SceneNode::Projector(node),
            NodeKind::VideoScreen => SceneNode::VideoScreen(node),
            _ => return None,
        })
    }
}

/// A `{uuid, name}` entry of AUXData (classes, positions)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamedRef {
    /// Uuid
    pub uuid: String,
    /// Name
    pub name: String,
}

/// Auxiliary scene data
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuxData {
    /// Symbol definitions
    pub symdefs: Vec<Symdef>,
    /// Classes referenced by `classing`
    pub classes: Vec<NamedRef>,
    /// Positions referenced by fixtures
    pub positions: Vec<NamedRef>,
}

impl AuxData {
    /// Whether there is nothing to write
    pub fn is_empty(&self) -> bool {
        self.symdefs.is_empty() && self.classes.is_empty() && self.positions.is_empty()
    }

    /// Find a symbol definition by uuid
    pub fn symdef(&self, uuid: &str) -> Option<&Symdef> {
        self.symdefs.iter().find(|s| s.header.uuid == uuid)
    }
}

/// Default major version written on export
pub const MVR_VERSION_MAJOR: u32 = 1;

/// Default minor version written on export
pub const MVR_VERSION_MINOR: u32 = 6;

/// A parsed `GeneralSceneDescription`
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDocument {
    /// `verMajor`
    pub ver_major: u32,
    /// `verMinor`
    pub ver_minor: u32,
    /// Producing application
    pub provider: Option<String>,
    /// Producing application version
    pub provider_version: Option<String>,
    /// Auxiliary data
    pub aux_data: AuxData,
    /// Layers in document order
    pub layers: Vec<Layer>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self {
            ver_major: MVR_VERSION_MAJOR,
            ver_minor: MVR_VERSION_MINOR,
            provider: None,
            provider_version: None,
            aux_data: AuxData::default(),
            layers: Vec::new(),
        }
    }
}

impl SceneDocument {
    /// Create an empty document with the default version
    pub fn new() -> Self {
        Self::default()
    }

    /// Visit every node below the layers depth-first in document order
    ///
    /// Layers themselves are not visited.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a SceneNode)) {
        fn walk<'a>(nodes: &'a [SceneNode], f: &mut impl FnMut(&'a SceneNode)) {
            for node in nodes {
                f(node);
                walk(node.children(), f);
            }
        }
        for layer in &self.layers {
            walk(&layer.child_list, f);
        }
    }

    /// All fixtures in document order
    pub fn fixtures(&self) -> Vec<&Fixture> {
        let mut fixtures = Vec::new();
        self.visit(&mut |node| {
            if let SceneNode::Fixture(f) = node {
                fixtures.push(f);
            }
        });
        fixtures
    }

    /// Find a node below the layers by uuid
    pub fn find(&self, uuid: &str) -> Option<&SceneNode> {
        let mut found = None;
        self.visit(&mut |node| {
            if found.is_none() && node.uuid() == Some(uuid) {
                found = Some(node);
            }
        });
        found
    }
}
