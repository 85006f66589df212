//! Kinematic model of a fixture
//!
//! Flattens a profile's geometry tree for one DMX mode into an indexed list
//! of nodes. Each node knows its parent, the model that renders it, its local
//! transform and, when a Pan or Tilt channel drives it, the rotation it may
//! perform.

use super::channels::{AxisKind, ChannelLayout, FixtureCapabilities, collect_channels};
use super::profile::Profile;
use crate::error::{Diagnostics, Error, Result, Warning, WarningKind};
use crate::model::{BeamParams, Geometry, GeometryKind, LaserParams, PrimitiveType};
use nalgebra::{Matrix4, Vector3};
use std::path::Path;

/// Edge length of the placeholder cube of geometries without a model
pub const PLACEHOLDER_SIZE: f64 = 0.0001;

/// Scale from 3DS file units (millimeters) to meters
pub const UNIT_SCALE_3DS: f64 = 0.001;

const MAX_REFERENCE_DEPTH: usize = 16;

/// What renders a kinematic node
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// A built-in primitive scaled to `size` (length, width, height)
    Primitive {
        /// Primitive shape
        primitive: PrimitiveType,
        /// Size in meters
        size: [f64; 3],
    },
    /// A mesh file inside the profile package
    File {
        /// Entry name in the profile archive
        entry: String,
        /// Declared model size in meters
        size: [f64; 3],
        /// Scale from file units to meters
        unit_scale: f64,
    },
}

impl ModelSource {
    fn placeholder() -> Self {
        ModelSource::Primitive {
            primitive: PrimitiveType::Cube,
            size: [PLACEHOLDER_SIZE; 3],
        }
    }
}

/// Part of a moving fixture's chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobileRole {
    /// Driven by the Pan channel
    Yoke,
    /// Driven by the Tilt channel
    Head,
}

/// Limits of a driven rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationConstraint {
    /// Which channel drives the rotation
    pub axis: AxisKind,
    /// Physical range in degrees
    pub range: (f64, f64),
}

impl RotationConstraint {
    /// Local rotation axis: Z for pan, X for tilt
    pub fn rotation_axis(&self) -> Vector3<f64> {
        match self.axis {
            AxisKind::Pan => Vector3::z(),
            AxisKind::Tilt => Vector3::x(),
        }
    }
}

/// One resolved geometry of a fixture
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicNode {
    /// Instance name (the reference name for referenced subtrees' roots)
    pub name: String,
    /// Name of the geometry the node was built from
    pub original_name: String,
    /// Geometry type label (`normal`, `axis`, `beam`, `laser`, `camera`, `gobo`)
    pub kind: &'static str,
    /// Model rendering the node
    pub model: ModelSource,
    /// Transform relative to the parent node
    pub local: Matrix4<f64>,
    /// Parent index, `None` for the root
    pub parent: Option<usize>,
    /// Beam parameters of beam geometries
    pub beam: Option<BeamParams>,
    /// Laser parameters of laser geometries
    pub laser: Option<LaserParams>,
    /// Role in the moving chain
    pub mobile: Option<MobileRole>,
    /// Driven rotation
    pub constraint: Option<RotationConstraint>,
    /// Whether the node was instantiated through a GeometryReference
    pub referenced: bool,
}

impl KinematicNode {
    /// Whether this is the root body
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Resolved fixture template for one DMX mode
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicModel {
    /// Resolved mode name
    pub mode: String,
    /// Nodes, parents before children; index 0 is the root
    pub nodes: Vec<KinematicNode>,
    /// Channel layout of the mode
    pub layout: ChannelLayout,
    /// Capability summary of the mode
    pub capabilities: FixtureCapabilities,
    /// Problems found while resolving channels and models
    pub warnings: Vec<Warning>,
}

impl KinematicModel {
    /// Root body
    pub fn root(&self) -> Option<&KinematicNode> {
        self.nodes.first()
    }

    /// Node by instance name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Indices of a node's direct children
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(index))
            .map(|(i, _)| i)
    }

    /// Node driven by Tilt
    pub fn head(&self) -> Option<usize> {
        self.nodes.iter().position(|n| n.mobile == Some(MobileRole::Head))
    }

    /// Node driven by Pan
    pub fn yoke(&self) -> Option<usize> {
        self.nodes.iter().position(|n| n.mobile == Some(MobileRole::Yoke))
    }

    /// Node a focus target aims: the head, else the root
    pub fn aim_node(&self) -> usize {
        self.head().unwrap_or(0)
    }

    /// Beam nodes in tree order
    pub fn beams(&self) -> impl Iterator<Item = &KinematicNode> {
        self.nodes.iter().filter(|n| n.beam.is_some())
    }

    /// Transform of a node relative to the fixture root's frame
    pub fn fixture_matrix(&self, index: usize) -> Matrix4<f64> {
        let mut matrix = Matrix4::identity();
        let mut current = Some(index);
        while let Some(i) = current {
            let Some(node) = self.nodes.get(i) else { break };
            matrix = node.local * matrix;
            current = node.parent;
        }
        matrix
    }
}

struct Builder<'a> {
    profile: &'a Profile,
    layout: &'a ChannelLayout,
    has_gobos: bool,
    nodes: Vec<KinematicNode>,
    diagnostics: Diagnostics,
    depth: usize,
}

impl<'a> Builder<'a> {
    fn push(&mut self, node: KinematicNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn node(
        &mut self,
        geometry: &Geometry,
        name: &str,
        parent: Option<usize>,
        referenced: bool,
        model_name: Option<&str>,
    ) -> usize {
        let model = self.resolve_model(model_name, &geometry.name);
        let (beam, laser) = match &geometry.kind {
            GeometryKind::Beam(params) => (Some(params.clone()), None),
            GeometryKind::Laser(params) => (None, Some(params.clone())),
            _ => (None, None),
        };
        let axis = self.layout.axes.get(name).copied();
        let index = self.push(KinematicNode {
            name: name.to_string(),
            original_name: geometry.name.clone(),
            kind: geometry.kind.label(),
            model,
            local: geometry.position,
            parent,
            beam: beam.clone(),
            laser,
            mobile: axis.map(|a| match a.kind {
                AxisKind::Pan => MobileRole::Yoke,
                AxisKind::Tilt => MobileRole::Head,
            }),
            constraint: axis.map(|a| RotationConstraint {
                axis: a.kind,
                range: a.range,
            }),
            referenced,
        });
        if let Some(beam) = beam
            && self.has_gobos
        {
            self.gobo_plane(index, name, &beam);
        }
        index
    }

    fn gobo_plane(&mut self, beam_index: usize, beam_name: &str, beam: &BeamParams) {
        let radius = 2.2 * 0.01 * (beam.beam_angle.to_radians() / 2.0).tan();
        self.push(KinematicNode {
            name: format!("{} Gobo", beam_name),
            original_name: beam_name.to_string(),
            kind: "gobo",
            model: ModelSource::Primitive {
                primitive: PrimitiveType::Plane,
                size: [radius * 2.0, radius * 2.0, 0.0],
            },
            local: Matrix4::new_translation(&Vector3::new(0.0, 0.0, -0.01)),
            parent: Some(beam_index),
            beam: None,
            laser: None,
            mobile: None,
            constraint: None,
            referenced: false,
        });
    }

    fn walk(&mut self, geometry: &'a Geometry, parent: Option<usize>, referenced: bool) {
        let profile = self.profile;
        match &geometry.kind {
            GeometryKind::Reference { geometry: target, .. } => {
                // Unresolved and too deep references are reported by the channel walk
                let Some(template) = profile.fixture_type.geometry(target) else {
                    self.push(KinematicNode {
                        name: geometry.name.clone(),
                        original_name: geometry.name.clone(),
                        kind: "normal",
                        model: ModelSource::placeholder(),
                        local: geometry.position,
                        parent,
                        beam: None,
                        laser: None,
                        mobile: None,
                        constraint: None,
                        referenced,
                    });
                    return;
                };
                if self.depth >= MAX_REFERENCE_DEPTH {
                    return;
                }
                // The reference supplies the placement, the template the content.
                let mut instance = template.clone();
                instance.position = geometry.position;
                let model_name = geometry.model.as_deref().or(template.model.as_deref());
                let index = self.node(&instance, &geometry.name, parent, referenced, model_name);
                self.depth += 1;
                for child in &template.children {
                    self.walk(child, Some(index), true);
                }
                self.depth -= 1;
            }
            _ => {
                let index = self.node(
                    geometry,
                    &geometry.name,
                    parent,
                    referenced,
                    geometry.model.as_deref(),
                );
                for child in &geometry.children {
                    self.walk(child, Some(index), referenced);
                }
            }
        }
    }

    fn resolve_model(&mut self, model_name: Option<&str>, geometry: &str) -> ModelSource {
        let Some(model_name) = model_name.filter(|m| !m.is_empty()) else {
            return ModelSource::placeholder();
        };
        let Some(model) = self.profile.fixture_type.model(model_name) else {
            self.diagnostics.warn(
                WarningKind::UnresolvedReference,
                format!("Geometry '{}' uses undeclared model '{}'", geometry, model_name),
            );
            return ModelSource::placeholder();
        };
        let size = [model.length, model.width, model.height];

        let file = model
            .file
            .as_deref()
            .filter(|f| !f.is_empty() && model.primitive_type != PrimitiveType::Pigtail);
        if let Some(file) = file {
            if let Some(entry) = self.profile.model_entry(file) {
                let is_3ds = Path::new(entry)
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("3ds"));
                return ModelSource::File {
                    entry: entry.to_string(),
                    size,
                    unit_scale: if is_3ds { UNIT_SCALE_3DS } else { 1.0 },
                };
            }
            self.diagnostics.warn(
                WarningKind::MissingAsset,
                format!(
                    "Model file '{}' of '{}' not found in {}",
                    file, model.name, self.profile.spec
                ),
            );
            return ModelSource::Primitive {
                primitive: PrimitiveType::Cube,
                size,
            };
        }

        let primitive = match model.primitive_type {
            PrimitiveType::Undefined => PrimitiveType::Cube,
            other => other,
        };
        ModelSource::Primitive { primitive, size }
    }
}

/// Build the kinematic model of a profile for a DMX mode
///
/// An unknown mode name falls back to the first declared mode.
pub fn build_kinematics(profile: &Profile, mode_name: &str) -> Result<KinematicModel> {
    let fixture_type = &profile.fixture_type;
    let layout = collect_channels(fixture_type, mode_name)?;
    let root_name = fixture_type
        .dmx_mode(&layout.mode)
        .map(|m| m.geometry.as_str())
        .unwrap_or_default();
    let root = fixture_type
        .geometry(root_name)
        .or_else(|| fixture_type.geometries.first())
        .ok_or_else(|| {
            Error::InvalidModel(format!("Fixture type '{}' has no geometry", fixture_type.name))
        })?;

    let mut builder = Builder {
        profile,
        layout: &layout,
        has_gobos: !profile.gobo_entries().is_empty(),
        nodes: Vec::new(),
        diagnostics: Diagnostics::new(),
        depth: 0,
    };
    builder.walk(root, None, false);
    let nodes = builder.nodes;
    let mut warnings = layout.warnings.clone();
    warnings.extend(builder.diagnostics.into_vec());

    tracing::debug!(
        profile = %profile.spec,
        mode = %layout.mode,
        nodes = nodes.len(),
        channels = layout.channel_count(),
        "Built fixture kinematics"
    );

    Ok(KinematicModel {
        mode: layout.mode.clone(),
        nodes,
        capabilities: FixtureCapabilities::from_layout(&layout),
        layout,
        warnings,
    })
}
