//! Typed GDTF fixture type description

use super::color::CieColor;
use nalgebra::Matrix4;

/// Primitive shape of a model
///
/// GDTF 1.1 added `1_1` variants of several primitives; they are folded into
/// the plain variant when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    /// No primitive, the model is loaded from a file
    #[default]
    Undefined,
    /// Cube
    Cube,
    /// Cylinder
    Cylinder,
    /// Sphere
    Sphere,
    /// Plane
    Plane,
    /// Fixture base
    Base,
    /// Fixture yoke
    Yoke,
    /// Fixture head
    Head,
    /// Scanner
    Scanner,
    /// Conventional fixture body
    Conventional,
    /// Cable pigtail
    Pigtail,
}

impl PrimitiveType {
    /// Parse a primitive name, dropping a `1_1` suffix
    pub fn parse(text: &str) -> Self {
        let base = text.strip_suffix("1_1").unwrap_or(text);
        match base {
            "Cube" => PrimitiveType::Cube,
            "Cylinder" => PrimitiveType::Cylinder,
            "Sphere" => PrimitiveType::Sphere,
            "Plane" => PrimitiveType::Plane,
            "Base" => PrimitiveType::Base,
            "Yoke" => PrimitiveType::Yoke,
            "Head" => PrimitiveType::Head,
            "Scanner" => PrimitiveType::Scanner,
            "Conventional" => PrimitiveType::Conventional,
            "Pigtail" => PrimitiveType::Pigtail,
            _ => PrimitiveType::Undefined,
        }
    }
}

/// A 3D model declaration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    /// Model name, referenced by geometries
    pub name: String,
    /// Size along x in meters
    pub length: f64,
    /// Size along y in meters
    pub width: f64,
    /// Size along z in meters
    pub height: f64,
    /// Primitive shape
    pub primitive_type: PrimitiveType,
    /// Mesh file name without extension
    pub file: Option<String>,
}

/// Beam parameters of a `Beam` geometry
#[derive(Debug, Clone, PartialEq)]
pub struct BeamParams {
    /// Lamp type (Discharge, Tungsten, LED, ...)
    pub lamp_type: String,
    /// Beam type (Wash, Spot, None, Glow, ...)
    pub beam_type: String,
    /// Power consumption in watts
    pub power_consumption: f64,
    /// Luminous flux in lumens
    pub luminous_flux: f64,
    /// Color temperature in kelvin
    pub color_temperature: f64,
    /// Beam angle in degrees
    pub beam_angle: f64,
    /// Field angle in degrees
    pub field_angle: f64,
    /// Beam radius in meters
    pub beam_radius: f64,
}

impl Default for BeamParams {
    fn default() -> Self {
        Self {
            lamp_type: "Discharge".to_string(),
            beam_type: "Wash".to_string(),
            power_consumption: 1000.0,
            luminous_flux: 10000.0,
            color_temperature: 6000.0,
            beam_angle: 25.0,
            field_angle: 25.0,
            beam_radius: 0.05,
        }
    }
}

impl BeamParams {
    /// Whether the beam emits visible light
    pub fn is_visible(&self) -> bool {
        self.beam_type != "None" && self.beam_type != "Glow"
    }

    /// Spot blend factor: soft for wash-like beams, hard otherwise
    pub fn spot_blend(&self) -> f64 {
        match self.beam_type.as_str() {
            "Wash" | "Fresnel" | "PC" => 1.0,
            _ => 0.0,
        }
    }
}

/// Laser parameters of a `Laser` geometry
#[derive(Debug, Clone, PartialEq)]
pub struct LaserParams {
    /// Color type (RGB or SingleWaveLength)
    pub color_type: String,
    /// Wavelength in nanometers
    pub color: f64,
    /// Output strength in watts
    pub output_strength: f64,
    /// Beam diameter in meters
    pub beam_diameter: f64,
    /// Minimum divergence in milliradians
    pub beam_divergence_min: f64,
    /// Maximum divergence in milliradians
    pub beam_divergence_max: f64,
}

impl Default for LaserParams {
    fn default() -> Self {
        Self {
            color_type: "RGB".to_string(),
            color: 0.0,
            output_strength: 1.0,
            beam_diameter: 0.005,
            beam_divergence_min: 0.0,
            beam_divergence_max: 0.0,
        }
    }
}

/// DMX break override of a geometry reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakOffset {
    /// Break number
    pub dmx_break: u32,
    /// Start address of the referenced geometry's channels in this break
    pub dmx_offset: u32,
}

/// Element type of a geometry
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GeometryKind {
    /// Plain `Geometry`
    #[default]
    Geometry,
    /// `Axis`
    Axis,
    /// `Beam`
    Beam(BeamParams),
    /// `Laser`
    Laser(LaserParams),
    /// `FilterBeam`, `FilterColor`, `FilterGobo` or `FilterShaper`
    Filter,
    /// `MediaServerCamera`
    Camera,
    /// `Display`
    Display,
    /// `GeometryReference` to a top-level geometry
    Reference {
        /// Name of the referenced geometry
        geometry: String,
        /// Break overrides in document order
        breaks: Vec<BreakOffset>,
    },
    /// Any other geometry element
    Other(String),
}

impl GeometryKind {
    /// Classify an element name; beam, laser and reference data are filled by the parser
    pub fn from_element_name(name: &str) -> Self {
        match name {
            "Geometry" => GeometryKind::Geometry,
            "Axis" => GeometryKind::Axis,
            "Beam" => GeometryKind::Beam(BeamParams::default()),
            "Laser" => GeometryKind::Laser(LaserParams::default()),
            "FilterBeam" | "FilterColor" | "FilterGobo" | "FilterShaper" => GeometryKind::Filter,
            "MediaServerCamera" => GeometryKind::Camera,
            "Display" => GeometryKind::Display,
            "GeometryReference" => GeometryKind::Reference {
                geometry: String::new(),
                breaks: Vec::new(),
            },
            other => GeometryKind::Other(other.to_string()),
        }
    }

    /// Short type label (`normal`, `axis`, `beam`, `laser`, `camera`)
    pub fn label(&self) -> &'static str {
        match self {
            GeometryKind::Axis => "axis",
            GeometryKind::Beam(_) => "beam",
            GeometryKind::Laser(_) => "laser",
            GeometryKind::Camera => "camera",
            GeometryKind::Reference { .. } => "reference",
            _ => "normal",
        }
    }
}

/// A node of the fixture's geometry tree
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Unique name within the profile
    pub name: String,
    /// Element type and type-specific data
    pub kind: GeometryKind,
    /// Referenced model name
    pub model: Option<String>,
    /// Local transform
    pub position: Matrix4<f64>,
    /// Child geometries in document order
    pub children: Vec<Geometry>,
}

impl Geometry {
    /// Create a plain geometry at the origin
    pub fn new(name: impl Into<String>, kind: GeometryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            model: None,
            position: Matrix4::identity(),
            children: Vec::new(),
        }
    }

    /// Depth-first search by name, this geometry included
    pub fn find(&self, name: &str) -> Option<&Geometry> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Referenced geometry name when this is a GeometryReference
    pub fn reference(&self) -> Option<&str> {
        match &self.kind {
            GeometryKind::Reference { geometry, .. } => Some(geometry.as_str()),
            _ => None,
        }
    }
}

/// One range of a logical channel's DMX values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelFunction {
    /// Function name
    pub name: String,
    /// Attribute this function drives
    pub attribute: String,
    /// DMX start value as written (`0/1`)
    pub dmx_from: String,
    /// Physical value at the start
    pub physical_from: f64,
    /// Physical value at the end
    pub physical_to: f64,
    /// Wheel used by this function
    pub wheel: Option<String>,
}

/// A logical channel of a DMX channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogicalChannel {
    /// Attribute name (Pan, Tilt, Dimmer, ...)
    pub attribute: String,
    /// Channel functions in document order
    pub functions: Vec<ChannelFunction>,
}

/// A channel declared in a DMX mode
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DmxChannel {
    /// Break number; `None` means `Overwrite`
    pub dmx_break: Option<u32>,
    /// One-based offsets, coarse first; empty for virtual channels
    pub offsets: Vec<u32>,
    /// Geometry the channel controls
    pub geometry: String,
    /// Initial function reference
    pub initial_function: Option<String>,
    /// Logical channels
    pub logical_channels: Vec<LogicalChannel>,
}

impl DmxChannel {
    /// Attribute of the first logical channel
    pub fn attribute(&self) -> &str {
        self.logical_channels
            .first()
            .map(|l| l.attribute.as_str())
            .unwrap_or_default()
    }

    /// Physical range of the first channel function
    pub fn physical_range(&self) -> (f64, f64) {
        self.logical_channels
            .first()
            .and_then(|l| l.functions.first())
            .map(|f| (f.physical_from, f.physical_to))
            .unwrap_or((0.0, 1.0))
    }

    /// Whether the channel occupies no DMX address
    pub fn is_virtual(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// A DMX mode
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DmxMode {
    /// Mode name
    pub name: String,
    /// Root geometry of the mode
    pub geometry: String,
    /// Channels in document order
    pub channels: Vec<DmxChannel>,
}

/// A slot of a wheel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WheelSlot {
    /// Slot name
    pub name: String,
    /// Slot color
    pub color: Option<CieColor>,
    /// Gobo image file name without the `wheels/` prefix
    pub media_file_name: Option<String>,
}

/// A color or gobo wheel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Wheel {
    /// Wheel name
    pub name: String,
    /// Slots in document order
    pub slots: Vec<WheelSlot>,
}

/// A revision entry
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Revision {
    /// Revision text
    pub text: String,
    /// Date
    pub date: Option<String>,
}

/// A parsed GDTF `FixtureType`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixtureType {
    /// Fixture type name
    pub name: String,
    /// Short name
    pub short_name: String,
    /// Long name
    pub long_name: String,
    /// Manufacturer
    pub manufacturer: String,
    /// Fixture type id (uuid)
    pub fixture_type_id: String,
    /// Thumbnail file name without extension
    pub thumbnail: Option<String>,
    /// Models
    pub models: Vec<Model>,
    /// Top-level geometries
    pub geometries: Vec<Geometry>,
    /// DMX modes
    pub dmx_modes: Vec<DmxMode>,
    /// Wheels
    pub wheels: Vec<Wheel>,
    /// Revisions in document order
    pub revisions: Vec<Revision>,
}

impl FixtureType {
    /// Find a geometry anywhere in the tree
    pub fn geometry(&self, name: &str) -> Option<&Geometry> {
        self.geometries.iter().find_map(|g| g.find(name))
    }

    /// Find a model by name
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Find a DMX mode by name
    pub fn dmx_mode(&self, name: &str) -> Option<&DmxMode> {
        self.dmx_modes.iter().find(|m| m.name == name)
    }

    /// The named mode, or the first declared mode when the name is unknown
    pub fn dmx_mode_or_first(&self, name: &str) -> Option<&DmxMode> {
        self.dmx_mode(name).or_else(|| self.dmx_modes.first())
    }

    /// Text of the last revision
    pub fn last_revision(&self) -> &str {
        self.revisions
            .last()
            .map(|r| r.text.as_str())
            .unwrap_or_default()
    }

    /// Distinct sRGB colors of all wheel slots, in wheel order
    pub fn wheel_slot_colors(&self) -> Vec<[u8; 3]> {
        let mut colors = Vec::new();
        for slot in self.wheels.iter().flat_map(|w| &w.slots) {
            if let Some(rgb) = slot.color.and_then(|c| c.to_srgb())
                && !colors.contains(&rgb)
            {
                colors.push(rgb);
            }
        }
        colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_suffix_normalized() {
        assert_eq!(PrimitiveType::parse("Head1_1"), PrimitiveType::Head);
        assert_eq!(PrimitiveType::parse("Base"), PrimitiveType::Base);
        assert_eq!(PrimitiveType::parse("Blob"), PrimitiveType::Undefined);
    }

    #[test]
    fn test_geometry_find_nested() {
        let mut base = Geometry::new("Base", GeometryKind::Geometry);
        let mut yoke = Geometry::new("Yoke", GeometryKind::Axis);
        yoke.children
            .push(Geometry::new("Beam", GeometryKind::from_element_name("Beam")));
        base.children.push(yoke);

        let ft = FixtureType {
            geometries: vec![base],
            ..FixtureType::default()
        };
        assert_eq!(ft.geometry("Beam").map(|g| g.kind.label()), Some("beam"));
        assert!(ft.geometry("Head").is_none());
    }

    #[test]
    fn test_mode_fallback_to_first() {
        let ft = FixtureType {
            dmx_modes: vec![
                DmxMode {
                    name: "Basic".to_string(),
                    ..DmxMode::default()
                },
                DmxMode {
                    name: "Extended".to_string(),
                    ..DmxMode::default()
                },
            ],
            ..FixtureType::default()
        };
        assert_eq!(ft.dmx_mode_or_first("Extended").map(|m| m.name.as_str()), Some("Extended"));
        assert_eq!(ft.dmx_mode_or_first("Missing").map(|m| m.name.as_str()), Some("Basic"));
    }

    #[test]
    fn test_wheel_slot_colors_are_distinct() {
        let red = CieColor::new(0.64, 0.33, 21.26);
        let wheel = Wheel {
            name: "Colors".to_string(),
            slots: vec![
                WheelSlot {
                    name: "Red".to_string(),
                    color: Some(red),
                    media_file_name: None,
                },
                WheelSlot {
                    name: "Red again".to_string(),
                    color: Some(red),
                    media_file_name: None,
                },
                WheelSlot::default(),
            ],
        };
        let ft = FixtureType {
            wheels: vec![wheel],
            ..FixtureType::default()
        };
        assert_eq!(ft.wheel_slot_colors().len(), 1);
    }

    #[test]
    fn test_beam_visibility() {
        let mut beam = BeamParams::default();
        assert!(beam.is_visible());
        assert_eq!(beam.spot_blend(), 1.0);
        beam.beam_type = "Glow".to_string();
        assert!(!beam.is_visible());
    }
}
