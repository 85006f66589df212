//! DMX channel layout of a fixture mode
//!
//! Channels are claimed by walking the mode's geometry tree in document
//! order. A `GeometryReference` instantiates the channels of the geometry it
//! references, shifted to the reference's break and start address.

use crate::error::{Diagnostics, Error, Result, Warning, WarningKind};
use crate::model::{
    BreakOffset, DmxChannel, DmxMode, FixtureType, Geometry, GeometryKind, UNIVERSE_SIZE,
};
use std::collections::BTreeMap;

/// Highest address a channel may occupy within one break
pub const MAX_BREAK_FOOTPRINT: u32 = 4 * UNIVERSE_SIZE;

/// One occupied DMX slot
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSlot {
    /// Attribute id; fine halves carry one `+` per byte below coarse
    pub attribute: String,
    /// Geometry the channel drives
    pub geometry: String,
    /// Physical range of the first channel function
    pub physical_range: (f64, f64),
}

impl ChannelSlot {
    /// Attribute without fine-byte prefixes
    pub fn base_attribute(&self) -> &str {
        self.attribute.trim_start_matches('+')
    }

    /// Whether this slot is a fine byte
    pub fn is_fine(&self) -> bool {
        self.attribute.starts_with('+')
    }

    /// Role of this slot's attribute
    pub fn role(&self) -> ChannelRole {
        ChannelRole::classify(self.base_attribute())
    }
}

/// Dense channel table of one DMX break
#[derive(Debug, Clone, PartialEq)]
pub struct DmxBreak {
    /// Break number
    pub number: u32,
    /// Slots indexed by `offset - 1`; gaps are `None`
    pub slots: Vec<Option<ChannelSlot>>,
}

impl DmxBreak {
    /// Slot at a one-based offset
    pub fn get(&self, offset: u32) -> Option<&ChannelSlot> {
        let index = usize::try_from(offset).ok()?.checked_sub(1)?;
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Number of addresses the break spans, gaps included
    pub fn footprint(&self) -> usize {
        self.slots.len()
    }

    fn set(&mut self, offset: u32, slot: ChannelSlot) {
        let Some(index) = (offset as usize).checked_sub(1) else {
            return;
        };
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(slot);
    }
}

/// A channel without a DMX address
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualChannel {
    /// Attribute id
    pub attribute: String,
    /// Geometry the channel drives
    pub geometry: String,
    /// Physical range
    pub physical_range: (f64, f64),
}

/// Rotation axis driven by a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    /// Horizontal rotation (yoke)
    Pan,
    /// Vertical rotation (head)
    Tilt,
}

/// Axis side-table entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisInfo {
    /// Which axis
    pub kind: AxisKind,
    /// Physical range in degrees
    pub range: (f64, f64),
}

/// Resolved channel layout of one DMX mode
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelLayout {
    /// Name of the resolved mode
    pub mode: String,
    /// Breaks in ascending break number
    pub breaks: Vec<DmxBreak>,
    /// Virtual channels in claim order
    pub virtual_channels: Vec<VirtualChannel>,
    /// Pan/Tilt axes by geometry name
    pub axes: BTreeMap<String, AxisInfo>,
    /// Problems found while walking the geometry tree
    pub warnings: Vec<Warning>,
}

impl ChannelLayout {
    /// Break by number
    pub fn dmx_break(&self, number: u32) -> Option<&DmxBreak> {
        self.breaks.iter().find(|b| b.number == number)
    }

    /// All occupied slots, breaks concatenated
    pub fn flattened(&self) -> impl Iterator<Item = &ChannelSlot> {
        self.breaks.iter().flat_map(|b| b.slots.iter().flatten())
    }

    /// Number of occupied slots
    pub fn channel_count(&self) -> usize {
        self.flattened().count()
    }

    /// Geometry driving an attribute, addressed or virtual
    pub fn geometry_for(&self, attribute: &str) -> Option<&str> {
        self.flattened()
            .find(|s| s.attribute == attribute)
            .map(|s| s.geometry.as_str())
            .or_else(|| {
                self.virtual_channels
                    .iter()
                    .find(|v| v.attribute == attribute)
                    .map(|v| v.geometry.as_str())
            })
    }
}

/// Break context of the subtree being walked
#[derive(Debug, Clone, Copy, PartialEq)]
struct BreakContext<'a> {
    /// Break overrides of the enclosing reference, `None` outside references
    reference: Option<&'a [BreakOffset]>,
}

impl BreakContext<'_> {
    /// Resolve a channel's break and address shift
    fn resolve(&self, declared: Option<u32>) -> (u32, u32) {
        match (self.reference, declared) {
            (None, Some(b)) => (b, 0),
            (None, None) => (1, 0),
            (Some(breaks), None) => breaks
                .first()
                .map(|b| (b.dmx_break, b.dmx_offset.saturating_sub(1)))
                .unwrap_or((1, 0)),
            (Some(breaks), Some(number)) => breaks
                .iter()
                .find(|b| b.dmx_break == number)
                .map(|b| (number, b.dmx_offset.saturating_sub(1)))
                .unwrap_or((number, 0)),
        }
    }
}

struct Collector<'a> {
    profile: &'a FixtureType,
    mode: &'a DmxMode,
    breaks: BTreeMap<u32, DmxBreak>,
    layout: ChannelLayout,
    diagnostics: Diagnostics,
    depth: usize,
}

/// Maximum nesting of geometry references
const MAX_REFERENCE_DEPTH: usize = 16;

impl<'a> Collector<'a> {
    fn walk(&mut self, geometry: &'a Geometry, context: BreakContext<'a>) {
        match &geometry.kind {
            GeometryKind::Reference { geometry: target, breaks } => {
                let Some(referenced) = self.profile.geometry(target) else {
                    self.diagnostics.warn(
                        WarningKind::UnresolvedReference,
                        format!(
                            "Geometry reference '{}' points to missing geometry '{}'",
                            geometry.name, target
                        ),
                    );
                    return;
                };
                if self.depth >= MAX_REFERENCE_DEPTH {
                    self.diagnostics.warn(
                        WarningKind::SchemaViolation,
                        format!(
                            "Geometry reference '{}' nests deeper than {} levels, skipped",
                            geometry.name, MAX_REFERENCE_DEPTH
                        ),
                    );
                    return;
                }
                self.depth += 1;
                let inner = BreakContext {
                    reference: Some(breaks.as_slice()),
                };
                self.claim(&referenced.name, &geometry.name, inner);
                for child in &referenced.children {
                    self.walk(child, inner);
                }
                self.depth -= 1;
            }
            _ => {
                self.claim(&geometry.name, &geometry.name, context);
            }
        }
        for child in &geometry.children {
            self.walk(child, context);
        }
    }

    /// Claim the mode's channels declared for `template`, recording them under `instance`
    fn claim(&mut self, template: &str, instance: &str, context: BreakContext<'a>) {
        let mode = self.mode;
        for channel in mode.channels.iter().filter(|c| c.geometry == template) {
            self.place(channel, instance, context);
        }
    }

    fn place(&mut self, channel: &DmxChannel, instance: &str, context: BreakContext<'a>) {
        let attribute = channel.attribute();
        let physical_range = channel.physical_range();

        let axis = match attribute {
            "Pan" => Some(AxisKind::Pan),
            "Tilt" => Some(AxisKind::Tilt),
            _ => None,
        };
        if let Some(kind) = axis {
            self.layout.axes.insert(
                instance.to_string(),
                AxisInfo {
                    kind,
                    range: physical_range,
                },
            );
        }

        if channel.is_virtual() {
            self.layout.virtual_channels.push(VirtualChannel {
                attribute: attribute.to_string(),
                geometry: instance.to_string(),
                physical_range,
            });
            return;
        }

        let (number, shift) = context.resolve(channel.dmx_break);
        for (byte, offset) in channel.offsets.iter().enumerate() {
            let Some(address) = offset
                .checked_add(shift)
                .filter(|a| *a <= MAX_BREAK_FOOTPRINT)
            else {
                self.diagnostics.warn(
                    WarningKind::SchemaViolation,
                    format!(
                        "Channel '{}' of '{}' at offset {} + {} lies past address {} of break {}, skipped",
                        attribute, instance, offset, shift, MAX_BREAK_FOOTPRINT, number
                    ),
                );
                continue;
            };
            let dmx_break = self.breaks.entry(number).or_insert_with(|| DmxBreak {
                number,
                slots: Vec::new(),
            });
            dmx_break.set(
                address,
                ChannelSlot {
                    attribute: format!("{}{}", "+".repeat(byte), attribute),
                    geometry: instance.to_string(),
                    physical_range,
                },
            );
        }
    }
}

/// Resolve the channel layout of a mode
///
/// An unknown mode name falls back to the profile's first mode. When two
/// channels land on the same break and offset, the later one in walk order
/// wins. Unresolved references and channels past [`MAX_BREAK_FOOTPRINT`]
/// are skipped and reported in [`ChannelLayout::warnings`].
pub fn collect_channels(profile: &FixtureType, mode_name: &str) -> Result<ChannelLayout> {
    let mode = profile.dmx_mode_or_first(mode_name).ok_or_else(|| {
        Error::InvalidModel(format!(
            "Fixture type '{}' declares no DMX modes",
            profile.name
        ))
    })?;
    if mode.name != mode_name {
        tracing::debug!(requested = mode_name, used = %mode.name, "DMX mode not found, using first mode");
    }

    let root = profile
        .geometry(&mode.geometry)
        .or_else(|| profile.geometries.first())
        .ok_or_else(|| {
            Error::InvalidModel(format!(
                "DMX mode '{}' has no root geometry '{}'",
                mode.name, mode.geometry
            ))
        })?;

    let mut collector = Collector {
        profile,
        mode,
        breaks: BTreeMap::new(),
        layout: ChannelLayout {
            mode: mode.name.clone(),
            ..ChannelLayout::default()
        },
        diagnostics: Diagnostics::new(),
        depth: 0,
    };
    collector.walk(root, BreakContext { reference: None });

    let mut layout = collector.layout;
    layout.breaks = collector.breaks.into_values().collect();
    layout.warnings = collector.diagnostics.into_vec();
    Ok(layout)
}

/// Channel role by attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Pan axis
    Pan,
    /// Tilt axis
    Tilt,
    /// Intensity
    Dimmer,
    /// Shutter or strobe
    Shutter,
    /// Gobo selection or rotation
    Gobo,
    /// Iris
    Iris,
    /// Zoom
    Zoom,
    /// Focus
    Focus,
    /// Additive color emitter (`ColorAdd_*`)
    ColorAdd,
    /// RGB color (`ColorRGB_*`)
    ColorRgb,
    /// Subtractive color flag (`ColorSub_*`)
    ColorSub,
    /// Color wheel (`Color1`, `Color2WheelIndex`, ...)
    ColorWheel,
    /// Anything else
    Other,
}

impl ChannelRole {
    /// Classify an attribute id (without fine prefix)
    pub fn classify(attribute: &str) -> Self {
        let attribute = attribute.trim_start_matches('+');
        match attribute {
            "Pan" => return ChannelRole::Pan,
            "Tilt" => return ChannelRole::Tilt,
            "Dimmer" => return ChannelRole::Dimmer,
            _ => {}
        }
        if attribute.starts_with("ColorAdd_") {
            ChannelRole::ColorAdd
        } else if attribute.starts_with("ColorRGB_") {
            ChannelRole::ColorRgb
        } else if attribute.starts_with("ColorSub_") {
            ChannelRole::ColorSub
        } else if attribute
            .strip_prefix("Color")
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_digit())
        {
            ChannelRole::ColorWheel
        } else if attribute.starts_with("Shutter") || attribute.starts_with("Strobe") {
            ChannelRole::Shutter
        } else if attribute.contains("Gobo") {
            ChannelRole::Gobo
        } else if attribute.starts_with("Iris") {
            ChannelRole::Iris
        } else if attribute.starts_with("Zoom") {
            ChannelRole::Zoom
        } else if attribute.starts_with("Focus") {
            ChannelRole::Focus
        } else {
            ChannelRole::Other
        }
    }
}

/// How a fixture mixes color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMixing {
    /// No mixing channels
    #[default]
    None,
    /// RGB or additive emitters
    Additive,
    /// CMY flags
    Subtractive,
}

/// Summary of what a mode can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixtureCapabilities {
    /// Has a pan channel
    pub pan: bool,
    /// Has a tilt channel
    pub tilt: bool,
    /// Has a dimmer channel
    pub dimmer: bool,
    /// Has a shutter or strobe channel
    pub shutter: bool,
    /// Has gobo channels
    pub gobos: bool,
    /// Has an iris channel
    pub iris: bool,
    /// Has a zoom channel
    pub zoom: bool,
    /// Has a color wheel
    pub color_wheel: bool,
    /// Color mixing kind
    pub color_mixing: ColorMixing,
}

impl FixtureCapabilities {
    /// Summarize a channel layout, virtual channels included
    pub fn from_layout(layout: &ChannelLayout) -> Self {
        let mut caps = Self::default();
        let attributes = layout
            .flattened()
            .map(|s| s.base_attribute())
            .chain(layout.virtual_channels.iter().map(|v| v.attribute.as_str()));
        for attribute in attributes {
            match ChannelRole::classify(attribute) {
                ChannelRole::Pan => caps.pan = true,
                ChannelRole::Tilt => caps.tilt = true,
                ChannelRole::Dimmer => caps.dimmer = true,
                ChannelRole::Shutter => caps.shutter = true,
                ChannelRole::Gobo => caps.gobos = true,
                ChannelRole::Iris => caps.iris = true,
                ChannelRole::Zoom => caps.zoom = true,
                ChannelRole::ColorWheel => caps.color_wheel = true,
                ChannelRole::ColorAdd | ChannelRole::ColorRgb => {
                    caps.color_mixing = ColorMixing::Additive
                }
                ChannelRole::ColorSub => {
                    if caps.color_mixing == ColorMixing::None {
                        caps.color_mixing = ColorMixing::Subtractive
                    }
                }
                ChannelRole::Focus | ChannelRole::Other => {}
            }
        }
        caps
    }

    /// Whether the fixture moves
    pub fn is_moving(&self) -> bool {
        self.pan || self.tilt
    }
}

impl FixtureType {
    /// Flattened channel count of every mode, in declaration order
    ///
    /// Modes whose layout cannot be resolved report zero channels.
    pub fn mode_channel_counts(&self) -> Vec<(String, usize)> {
        self.dmx_modes
            .iter()
            .map(|mode| {
                let count = collect_channels(self, &mode.name)
                    .map(|l| l.channel_count())
                    .unwrap_or(0);
                (mode.name.clone(), count)
            })
            .collect()
    }
}
