//! `GeneralSceneDescription.xml` parsing

use crate::error::{Diagnostics, Error, Result, Warning, WarningKind};
use crate::model::*;
use crate::transform::Transform;
use crate::xml::{XmlElement, parse_document};

/// Root element of an MVR scene description
pub const SCENE_ROOT: &str = "GeneralSceneDescription";

/// Parse the scene description XML
///
/// Returns the document and every recoverable problem found on the way.
/// A node without its required `uuid` fails the whole parse.
pub fn parse_scene_xml(xml: &str) -> Result<(SceneDocument, Vec<Warning>)> {
    let root = parse_document(xml)?;
    let mut diagnostics = Diagnostics::new();
    let document = parse_scene_element(&root, &mut diagnostics)?;
    Ok((document, diagnostics.into_vec()))
}

impl SceneDocument {
    /// Parse a scene description, see [`parse_scene_xml`]
    pub fn from_xml(xml: &str) -> Result<(Self, Vec<Warning>)> {
        parse_scene_xml(xml)
    }
}

fn parse_scene_element(root: &XmlElement, diag: &mut Diagnostics) -> Result<SceneDocument> {
    if root.name != SCENE_ROOT {
        return Err(Error::invalid_xml_element(
            &root.name,
            &format!("expected <{}> as document root", SCENE_ROOT),
        ));
    }

    let mut document = SceneDocument {
        ver_major: parse_version(root, "verMajor", MVR_VERSION_MAJOR, diag),
        ver_minor: parse_version(root, "verMinor", MVR_VERSION_MINOR, diag),
        provider: root.attr("provider").map(str::to_string),
        provider_version: root.attr("providerVersion").map(str::to_string),
        ..SceneDocument::default()
    };

    let Some(scene) = root.child("Scene") else {
        diag.warn(
            WarningKind::SchemaViolation,
            "Scene description has no <Scene> element",
        );
        return Ok(document);
    };

    if let Some(aux) = scene.child("AUXData") {
        document.aux_data = parse_aux_data(aux, diag)?;
    }

    if let Some(layers) = scene.child("Layers") {
        for element in layers.children_named("Layer") {
            let header = parse_header(element, diag)?;
            let child_list = match element.child("ChildList") {
                Some(list) => parse_child_list(list, diag)?,
                None => Vec::new(),
            };
            document.layers.push(Layer { header, child_list });
        }
    }

    Ok(document)
}

fn parse_version(root: &XmlElement, key: &str, default: u32, diag: &mut Diagnostics) -> u32 {
    match root.attr(key).map(|v| v.trim().parse::<u32>()) {
        Some(Ok(v)) => v,
        Some(Err(_)) | None => {
            diag.warn(
                WarningKind::SchemaViolation,
                format!("Missing or invalid '{}', using {}", key, default),
            );
            default
        }
    }
}

fn parse_aux_data(aux: &XmlElement, diag: &mut Diagnostics) -> Result<AuxData> {
    let mut data = AuxData::default();
    for child in &aux.children {
        match child.name.as_str() {
            "Symdef" => data.symdefs.push(parse_symdef(child, diag)?),
            "Class" => data.classes.push(parse_named_ref(child)?),
            "Position" => data.positions.push(parse_named_ref(child)?),
            other => tracing::debug!(element = other, "Ignoring AUXData element"),
        }
    }
    Ok(data)
}

fn parse_named_ref(element: &XmlElement) -> Result<NamedRef> {
    Ok(NamedRef {
        uuid: required_uuid(element)?,
        name: element.attr("name").unwrap_or_default().to_string(),
    })
}

fn required_uuid(element: &XmlElement) -> Result<String> {
    element
        .attr("uuid")
        .filter(|u| !u.trim().is_empty())
        .map(|u| u.trim().to_string())
        .ok_or_else(|| Error::missing_attribute(&element.name, "uuid"))
}

fn parse_matrix(element: &XmlElement, uuid: Option<&str>, diag: &mut Diagnostics) -> Option<Transform> {
    let text = element.child("Matrix").map(|m| m.text.as_str())?;
    match Transform::parse(text) {
        Ok(t) => Some(t),
        Err(e) => {
            let warning = Warning::new(
                WarningKind::MalformedTransform,
                format!("<{}> has an unreadable matrix, using identity: {}", element.name, e),
            );
            diag.push(match uuid {
                Some(uuid) => warning.with_uuid(uuid),
                None => warning,
            });
            None
        }
    }
}

fn parse_header(element: &XmlElement, diag: &mut Diagnostics) -> Result<NodeHeader> {
    let uuid = required_uuid(element)?;
    let matrix = parse_matrix(element, Some(&uuid), diag);
    Ok(NodeHeader {
        name: element.attr("name").unwrap_or_default().to_string(),
        matrix,
        classing: element.child_text("Classing").map(str::to_string),
        uuid,
    })
}

fn parse_child_list(list: &XmlElement, diag: &mut Diagnostics) -> Result<Vec<SceneNode>> {
    let mut nodes = Vec::with_capacity(list.children.len());
    for child in &list.children {
        if let Some(node) = parse_node(child, diag)? {
            nodes.push(node);
        }
    }
    Ok(nodes)
}

/// Parse one child-list element; unknown elements yield `None`
fn parse_node(element: &XmlElement, diag: &mut Diagnostics) -> Result<Option<SceneNode>> {
    let Some(kind) = NodeKind::from_element_name(&element.name) else {
        tracing::debug!(element = %element.name, "Ignoring unknown scene element");
        return Ok(None);
    };

    let node = match kind {
        NodeKind::Layer => {
            // Layers only belong under <Layers>; treat a nested one as a group
            diag.warn(
                WarningKind::SchemaViolation,
                "Nested <Layer> inside a child list, reading it as a group",
            );
            SceneNode::GroupObject(parse_group(element, diag)?)
        }
        NodeKind::GroupObject => SceneNode::GroupObject(parse_group(element, diag)?),
        NodeKind::Fixture => SceneNode::Fixture(parse_fixture(element, diag)?),
        NodeKind::FocusPoint => SceneNode::FocusPoint(FocusPoint {
            header: parse_header(element, diag)?,
            geometries: parse_geometries(element.child("Geometries"), diag)?,
        }),
        NodeKind::Symbol => SceneNode::Symbol(parse_symbol(element, diag)?),
        NodeKind::Symdef => SceneNode::Symdef(parse_symdef(element, diag)?),
        NodeKind::Geometry3D => match parse_geometry3d(element, diag) {
            Some(g) => SceneNode::Geometry3D(g),
            None => return Ok(None),
        },
        NodeKind::SceneObject
        | NodeKind::Truss
        | NodeKind::Support
        | NodeKind::Projector
        | NodeKind::VideoScreen => {
            let object = parse_object(element, diag)?;
            match SceneNode::object(kind, object) {
                Some(node) => node,
                None => return Ok(None),
            }
        }
    };
    Ok(Some(node))
}

fn parse_group(element: &XmlElement, diag: &mut Diagnostics) -> Result<GroupObject> {
    Ok(GroupObject {
        header: parse_header(element, diag)?,
        child_list: match element.child("ChildList") {
            Some(list) => parse_child_list(list, diag)?,
            None => Vec::new(),
        },
    })
}

fn parse_object(element: &XmlElement, diag: &mut Diagnostics) -> Result<ObjectNode> {
    Ok(ObjectNode {
        header: parse_header(element, diag)?,
        geometries: parse_geometries(element.child("Geometries"), diag)?,
        child_list: match element.child("ChildList") {
            Some(list) => parse_child_list(list, diag)?,
            None => Vec::new(),
        },
        gdtf_spec: element.child_text("GDTFSpec").map(str::to_string),
        gdtf_mode: element.child_text("GDTFMode").map(str::to_string),
        fixture_id: element.child_text("FixtureID").map(str::to_string),
    })
}

fn parse_geometries(
    element: Option<&XmlElement>,
    diag: &mut Diagnostics,
) -> Result<Vec<GeometryItem>> {
    let mut items = Vec::new();
    let Some(element) = element else {
        return Ok(items);
    };
    for child in &element.children {
        match child.name.as_str() {
            "Geometry3D" => {
                if let Some(g) = parse_geometry3d(child, diag) {
                    items.push(GeometryItem::Geometry3D(g));
                }
            }
            "Symbol" => items.push(GeometryItem::Symbol(parse_symbol(child, diag)?)),
            other => tracing::debug!(element = other, "Ignoring geometry element"),
        }
    }
    Ok(items)
}

fn parse_geometry3d(element: &XmlElement, diag: &mut Diagnostics) -> Option<Geometry3D> {
    let Some(file_name) = element.attr("fileName").filter(|f| !f.is_empty()) else {
        diag.warn(
            WarningKind::SchemaViolation,
            "<Geometry3D> without 'fileName' skipped",
        );
        return None;
    };
    Some(Geometry3D {
        file_name: file_name.to_string(),
        matrix: parse_matrix(element, None, diag),
    })
}

fn parse_symbol(element: &XmlElement, diag: &mut Diagnostics) -> Result<Symbol> {
    let header = parse_header(element, diag)?;
    let symdef = element.attr("symdef").unwrap_or_default().to_string();
    if symdef.is_empty() {
        diag.warn_node(
            WarningKind::SchemaViolation,
            &header.uuid,
            "<Symbol> without 'symdef'",
        );
    }
    Ok(Symbol { header, symdef })
}

fn parse_symdef(element: &XmlElement, diag: &mut Diagnostics) -> Result<Symdef> {
    let header = parse_header(element, diag)?;
    // Symdef content lives in ChildList; older producers used Geometries
    let list = element.child("ChildList").or_else(|| element.child("Geometries"));
    Ok(Symdef {
        geometries: parse_geometries(list, diag)?,
        header,
    })
}

fn parse_fixture(element: &XmlElement, diag: &mut Diagnostics) -> Result<Fixture> {
    let header = parse_header(element, diag)?;
    let uuid = header.uuid.clone();

    let gdtf_spec = match element.child_text("GDTFSpec") {
        Some(spec) => spec.to_string(),
        None => {
            diag.warn_node(
                WarningKind::SchemaViolation,
                &uuid,
                "<Fixture> without <GDTFSpec>, the generic profile will be used",
            );
            String::new()
        }
    };

    let mut fixture = Fixture {
        header,
        gdtf_spec,
        gdtf_mode: element.child_text("GDTFMode").unwrap_or_default().to_string(),
        focus: element.child_text("Focus").map(str::to_string),
        position: element.child_text("Position").map(str::to_string),
        fixture_id: element.child_text("FixtureID").map(str::to_string),
        fixture_id_numeric: parse_number(element, "FixtureIDNumeric", &uuid, diag),
        unit_number: parse_number(element, "UnitNumber", &uuid, diag),
        custom_id: parse_number(element, "CustomId", &uuid, diag),
        cast_shadow: element
            .child_text("CastShadow")
            .map(|v| v.eq_ignore_ascii_case("true")),
        ..Fixture::default()
    };

    if let Some(color) = element.child_text("Color") {
        match CieColor::parse(color) {
            Ok(c) => fixture.color = Some(c),
            Err(e) => diag.warn_node(WarningKind::SchemaViolation, &uuid, e.to_string()),
        }
    }

    if let Some(addresses) = element.child("Addresses") {
        for address in addresses.children_named("Address") {
            let dmx_break = address
                .attr("break")
                .and_then(|b| b.trim().parse().ok())
                .unwrap_or(0);
            match Address::parse(&address.text, dmx_break) {
                Ok(a) => fixture.addresses.push(a),
                Err(e) => diag.warn_node(WarningKind::SchemaViolation, &uuid, e.to_string()),
            }
        }
    }

    if let Some(list) = element.child("ChildList") {
        fixture.child_list = parse_child_list(list, diag)?;
    }

    Ok(fixture)
}

fn parse_number(
    element: &XmlElement,
    name: &str,
    uuid: &str,
    diag: &mut Diagnostics,
) -> Option<u32> {
    let text = element.child_text(name)?;
    match text.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            diag.warn_node(
                WarningKind::SchemaViolation,
                uuid,
                format!("<{}> is not a number: '{}'", name, text),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<GeneralSceneDescription verMajor="1" verMinor="6" provider="Test" providerVersion="1.0">
  <UserData/>
  <Scene>
    <AUXData>
      <Class uuid="C1" name="Lighting"/>
      <Symdef uuid="SD1" name="Chair">
        <ChildList>
          <Geometry3D fileName="chair.3ds"/>
        </ChildList>
      </Symdef>
    </AUXData>
    <Layers>
      <Layer uuid="L1" name="Main">
        <ChildList>
          <Fixture uuid="F1" name="Spot">
            <Matrix>{1,0,0}{0,1,0}{0,0,1}{1000,0,5000}</Matrix>
            <GDTFSpec>Acme@Par64.gdtf</GDTFSpec>
            <GDTFMode>Standard</GDTFMode>
            <Focus>FP1</Focus>
            <FixtureID>1</FixtureID>
            <FixtureIDNumeric>101</FixtureIDNumeric>
            <Addresses>
              <Address break="0">513</Address>
            </Addresses>
            <Color>0.3127,0.3290,100</Color>
          </Fixture>
          <FocusPoint uuid="FP1" name="Center"/>
          <Truss uuid="T1" name="Pipe">
            <Classing>C1</Classing>
            <Geometries>
              <Geometry3D fileName="truss.3ds">
                <Matrix>{1,0,0}{0,1,0}{0,0,1}{0,0,0}</Matrix>
              </Geometry3D>
              <Symbol uuid="S1" symdef="SD1"/>
            </Geometries>
          </Truss>
          <Mystery uuid="X"/>
        </ChildList>
      </Layer>
    </Layers>
  </Scene>
</GeneralSceneDescription>"#;

    #[test]
    fn test_parse_scene() {
        let (doc, warnings) = parse_scene_xml(SCENE).unwrap();
        assert!(warnings.is_empty(), "{:?}", warnings);
        assert_eq!(doc.ver_major, 1);
        assert_eq!(doc.provider.as_deref(), Some("Test"));
        assert_eq!(doc.aux_data.classes.len(), 1);
        assert_eq!(doc.aux_data.symdefs[0].geometries.len(), 1);

        let layer = &doc.layers[0];
        assert_eq!(layer.header.uuid, "L1");
        assert_eq!(layer.child_list.len(), 3);

        let fixture = &doc.fixtures()[0];
        assert_eq!(fixture.gdtf_spec, "Acme@Par64.gdtf");
        assert_eq!(fixture.focus.as_deref(), Some("FP1"));
        assert_eq!(fixture.fixture_id_numeric, Some(101));
        assert_eq!(fixture.addresses[0].universe, 2);
        assert_eq!(fixture.addresses[0].address, 1);
        assert_eq!(fixture.header.matrix.unwrap().values[11], 5000.0);

        let SceneNode::Truss(truss) = &layer.child_list[2] else {
            panic!("expected truss");
        };
        assert_eq!(truss.header.classing.as_deref(), Some("C1"));
        assert_eq!(truss.geometries.len(), 2);
    }

    #[test]
    fn test_missing_uuid_is_schema_error() {
        let xml = r#"<GeneralSceneDescription verMajor="1" verMinor="6"><Scene><Layers>
            <Layer uuid="L1"><ChildList><SceneObject name="NoId"/></ChildList></Layer>
        </Layers></Scene></GeneralSceneDescription>"#;
        let err = parse_scene_xml(xml).unwrap_err();
        assert!(err.to_string().contains("[E2003]"));
        assert!(err.to_string().contains("uuid"));
    }

    #[test]
    fn test_malformed_matrix_becomes_warning() {
        let xml = r#"<GeneralSceneDescription verMajor="1" verMinor="6"><Scene><Layers>
            <Layer uuid="L1"><ChildList>
              <SceneObject uuid="O1"><Matrix>{1,0,0}{broken}</Matrix></SceneObject>
            </ChildList></Layer>
        </Layers></Scene></GeneralSceneDescription>"#;
        let (doc, warnings) = parse_scene_xml(xml).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::MalformedTransform);
        assert_eq!(warnings[0].uuid.as_deref(), Some("O1"));
        assert!(doc.layers[0].child_list[0].matrix().is_none());
    }

    #[test]
    fn test_fixture_without_spec_warns() {
        let xml = r#"<GeneralSceneDescription verMajor="1" verMinor="6"><Scene><Layers>
            <Layer uuid="L1"><ChildList><Fixture uuid="F1" name="Par"/></ChildList></Layer>
        </Layers></Scene></GeneralSceneDescription>"#;
        let (doc, warnings) = parse_scene_xml(xml).unwrap();
        assert_eq!(doc.fixtures()[0].gdtf_spec, "");
        assert_eq!(warnings[0].kind, WarningKind::SchemaViolation);
    }

    #[test]
    fn test_out_of_range_universe_warns() {
        let xml = r#"<GeneralSceneDescription verMajor="1" verMinor="6"><Scene><Layers>
            <Layer uuid="L1"><ChildList><Fixture uuid="F1" name="Par">
              <GDTFSpec>Acme@Par.gdtf</GDTFSpec>
              <Addresses>
                <Address break="0">8388609.1</Address>
                <Address break="1">2.1</Address>
              </Addresses>
            </Fixture></ChildList></Layer>
        </Layers></Scene></GeneralSceneDescription>"#;
        let (doc, warnings) = parse_scene_xml(xml).unwrap();
        let fixture = doc.fixtures()[0];
        assert_eq!(fixture.addresses.len(), 1);
        assert_eq!(fixture.addresses[0].absolute(), 513);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::SchemaViolation);
        assert_eq!(warnings[0].uuid.as_deref(), Some("F1"));
    }

    #[test]
    fn test_wrong_root_is_error() {
        assert!(parse_scene_xml("<GDTF/>").is_err());
    }

    #[test]
    fn test_missing_version_defaults() {
        let (doc, warnings) =
            parse_scene_xml("<GeneralSceneDescription><Scene/></GeneralSceneDescription>").unwrap();
        assert_eq!(doc.ver_major, MVR_VERSION_MAJOR);
        assert_eq!(warnings.len(), 2);
    }
}
