//! GDTF `description.xml` parsing

use crate::error::{Diagnostics, Error, Result, Warning, WarningKind};
use crate::model::*;
use crate::transform::parse_position;
use crate::xml::{XmlElement, parse_document};
use nalgebra::Matrix4;

/// Element names that form the geometry tree
const GEOMETRY_ELEMENTS: &[&str] = &[
    "Geometry",
    "Axis",
    "FilterBeam",
    "FilterColor",
    "FilterGobo",
    "FilterShaper",
    "Beam",
    "MediaServerLayer",
    "MediaServerCamera",
    "MediaServerMaster",
    "Display",
    "GeometryReference",
    "Laser",
    "WiringObject",
    "Inventory",
    "Structure",
    "Support",
    "Magnet",
];

/// Parse a GDTF description
///
/// Unreadable numbers and positions fall back to defaults and are logged.
pub fn parse_description(xml: &str) -> Result<FixtureType> {
    let mut diagnostics = Diagnostics::new();
    parse_description_with(xml, &mut diagnostics)
}

/// Parse a GDTF description, collecting recoverable problems
pub(crate) fn parse_description_with(xml: &str, diag: &mut Diagnostics) -> Result<FixtureType> {
    let root = parse_document(xml)?;
    let fixture_type = if root.name == "FixtureType" {
        &root
    } else if root.name == "GDTF" {
        root.child("FixtureType")
            .ok_or_else(|| Error::invalid_xml_element("GDTF", "missing <FixtureType>"))?
    } else {
        return Err(Error::invalid_xml_element(
            &root.name,
            "expected <GDTF> as document root",
        ));
    };

    let attr = |key: &str| fixture_type.attr(key).unwrap_or_default().to_string();
    let mut profile = FixtureType {
        name: attr("Name"),
        short_name: attr("ShortName"),
        long_name: attr("LongName"),
        manufacturer: attr("Manufacturer"),
        fixture_type_id: attr("FixtureTypeID"),
        thumbnail: fixture_type
            .attr("Thumbnail")
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        ..FixtureType::default()
    };

    if let Some(wheels) = fixture_type.child("Wheels") {
        profile.wheels = wheels
            .children_named("Wheel")
            .map(|w| parse_wheel(w, diag))
            .collect();
    }

    if let Some(models) = fixture_type.child("Models") {
        profile.models = models
            .children_named("Model")
            .map(|m| parse_model(m, diag))
            .collect();
    }

    if let Some(geometries) = fixture_type.child("Geometries") {
        profile.geometries = parse_geometry_children(geometries, diag);
    }

    if let Some(modes) = fixture_type.child("DMXModes") {
        profile.dmx_modes = modes
            .children_named("DMXMode")
            .map(|m| parse_dmx_mode(m, diag))
            .collect();
    }

    if let Some(revisions) = fixture_type.child("Revisions") {
        profile.revisions = revisions
            .children_named("Revision")
            .map(|r| Revision {
                text: r.attr("Text").unwrap_or_default().to_string(),
                date: r.attr("Date").map(str::to_string),
            })
            .collect();
    }

    Ok(profile)
}

fn parse_f64(element: &XmlElement, key: &str, default: f64, diag: &mut Diagnostics) -> f64 {
    match element.attr(key) {
        None => default,
        Some(text) => match text.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                diag.warn(
                    WarningKind::SchemaViolation,
                    format!(
                        "<{}> attribute '{}' is not a number ('{}'), using {}",
                        element.name, key, text, default
                    ),
                );
                default
            }
        },
    }
}

fn parse_wheel(element: &XmlElement, diag: &mut Diagnostics) -> Wheel {
    let slots = element
        .children_named("Slot")
        .map(|slot| WheelSlot {
            name: slot.attr("Name").unwrap_or_default().to_string(),
            color: slot.attr("Color").and_then(|c| match CieColor::parse(c) {
                Ok(color) => Some(color),
                Err(e) => {
                    diag.warn(WarningKind::SchemaViolation, e.to_string());
                    None
                }
            }),
            media_file_name: slot
                .attr("MediaFileName")
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        })
        .collect();
    Wheel {
        name: element.attr("Name").unwrap_or_default().to_string(),
        slots,
    }
}

fn parse_model(element: &XmlElement, diag: &mut Diagnostics) -> Model {
    Model {
        name: element.attr("Name").unwrap_or_default().to_string(),
        length: parse_f64(element, "Length", 0.0, diag),
        width: parse_f64(element, "Width", 0.0, diag),
        height: parse_f64(element, "Height", 0.0, diag),
        primitive_type: PrimitiveType::parse(element.attr("PrimitiveType").unwrap_or_default()),
        file: element
            .attr("File")
            .filter(|f| !f.is_empty())
            .map(str::to_string),
    }
}

fn parse_geometry_children(element: &XmlElement, diag: &mut Diagnostics) -> Vec<Geometry> {
    element
        .children
        .iter()
        .filter(|c| GEOMETRY_ELEMENTS.contains(&c.name.as_str()))
        .map(|c| parse_geometry(c, diag))
        .collect()
}

fn parse_geometry(element: &XmlElement, diag: &mut Diagnostics) -> Geometry {
    let name = element.attr("Name").unwrap_or_default().to_string();
    let position = match element.attr("Position") {
        None => Matrix4::identity(),
        Some(text) => parse_position(text).unwrap_or_else(|e| {
            diag.push(Warning::new(
                WarningKind::MalformedTransform,
                format!("Geometry '{}' has an unreadable position: {}", name, e),
            ));
            Matrix4::identity()
        }),
    };

    let kind = match GeometryKind::from_element_name(&element.name) {
        GeometryKind::Beam(_) => GeometryKind::Beam(parse_beam(element, diag)),
        GeometryKind::Laser(_) => GeometryKind::Laser(parse_laser(element, diag)),
        GeometryKind::Reference { .. } => GeometryKind::Reference {
            geometry: element.attr("Geometry").unwrap_or_default().to_string(),
            breaks: element
                .children_named("Break")
                .map(|b| BreakOffset {
                    dmx_break: b
                        .attr("DMXBreak")
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(1),
                    dmx_offset: b
                        .attr("DMXOffset")
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(1),
                })
                .collect(),
        },
        other => other,
    };

    Geometry {
        kind,
        model: element
            .attr("Model")
            .filter(|m| !m.is_empty())
            .map(str::to_string),
        position,
        children: parse_geometry_children(element, diag),
        name,
    }
}

fn parse_beam(element: &XmlElement, diag: &mut Diagnostics) -> BeamParams {
    let defaults = BeamParams::default();
    BeamParams {
        lamp_type: element
            .attr("LampType")
            .map(str::to_string)
            .unwrap_or(defaults.lamp_type),
        beam_type: element
            .attr("BeamType")
            .map(str::to_string)
            .unwrap_or(defaults.beam_type),
        power_consumption: parse_f64(element, "PowerConsumption", defaults.power_consumption, diag),
        luminous_flux: parse_f64(element, "LuminousFlux", defaults.luminous_flux, diag),
        color_temperature: parse_f64(element, "ColorTemperature", defaults.color_temperature, diag),
        beam_angle: parse_f64(element, "BeamAngle", defaults.beam_angle, diag),
        field_angle: parse_f64(element, "FieldAngle", defaults.field_angle, diag),
        beam_radius: parse_f64(element, "BeamRadius", defaults.beam_radius, diag),
    }
}

fn parse_laser(element: &XmlElement, diag: &mut Diagnostics) -> LaserParams {
    let defaults = LaserParams::default();
    LaserParams {
        color_type: element
            .attr("ColorType")
            .map(str::to_string)
            .unwrap_or(defaults.color_type),
        color: parse_f64(element, "Color", defaults.color, diag),
        output_strength: parse_f64(element, "OutputStrength", defaults.output_strength, diag),
        beam_diameter: parse_f64(element, "BeamDiameter", defaults.beam_diameter, diag),
        beam_divergence_min: parse_f64(
            element,
            "BeamDivergenceMin",
            defaults.beam_divergence_min,
            diag,
        ),
        beam_divergence_max: parse_f64(
            element,
            "BeamDivergenceMax",
            defaults.beam_divergence_max,
            diag,
        ),
    }
}

fn parse_dmx_mode(element: &XmlElement, diag: &mut Diagnostics) -> DmxMode {
    let channels = element
        .child("DMXChannels")
        .map(|list| {
            list.children_named("DMXChannel")
                .map(|c| parse_dmx_channel(c, diag))
                .collect()
        })
        .unwrap_or_default();
    DmxMode {
        name: element.attr("Name").unwrap_or_default().to_string(),
        geometry: element.attr("Geometry").unwrap_or_default().to_string(),
        channels,
    }
}

fn parse_dmx_channel(element: &XmlElement, diag: &mut Diagnostics) -> DmxChannel {
    let dmx_break = match element.attr("DMXBreak").map(str::trim) {
        Some("Overwrite") => None,
        Some(text) => Some(text.parse().unwrap_or_else(|_| {
            diag.warn(
                WarningKind::SchemaViolation,
                format!("DMXBreak '{}' is not a number, using 1", text),
            );
            1
        })),
        None => Some(1),
    };

    let offsets = match element.attr("Offset").map(str::trim) {
        None | Some("") | Some("None") => Vec::new(),
        Some(text) => {
            let parsed: std::result::Result<Vec<u32>, _> =
                text.split(',').map(|o| o.trim().parse::<u32>()).collect();
            match parsed {
                Ok(offsets) if offsets.iter().all(|&o| o > 0) => offsets,
                _ => {
                    diag.warn(
                        WarningKind::SchemaViolation,
                        format!("DMX channel offset '{}' is invalid, treating as virtual", text),
                    );
                    Vec::new()
                }
            }
        }
    };

    let logical_channels = element
        .children_named("LogicalChannel")
        .map(|l| LogicalChannel {
            attribute: l.attr("Attribute").unwrap_or_default().to_string(),
            functions: l
                .children_named("ChannelFunction")
                .map(|f| ChannelFunction {
                    name: f.attr("Name").unwrap_or_default().to_string(),
                    attribute: f.attr("Attribute").unwrap_or_default().to_string(),
                    dmx_from: f.attr("DMXFrom").unwrap_or("0/1").to_string(),
                    physical_from: parse_f64(f, "PhysicalFrom", 0.0, diag),
                    physical_to: parse_f64(f, "PhysicalTo", 1.0, diag),
                    wheel: f.attr("Wheel").filter(|w| !w.is_empty()).map(str::to_string),
                })
                .collect(),
        })
        .collect();

    DmxChannel {
        dmx_break,
        offsets,
        geometry: element.attr("Geometry").unwrap_or_default().to_string(),
        initial_function: element.attr("InitialFunction").map(str::to_string),
        logical_channels,
    }
}
