//! XML writing for MVR scene descriptions
//!
//! Every node converts to an [`XmlElement`] with a fixed attribute and child
//! order. Absent values are left out entirely, never written as empty
//! attributes or elements.

use crate::error::Result;
use crate::model::*;
use crate::parser::SCENE_ROOT;
use crate::transform::Transform;
use crate::xml::{XmlElement, write_document};

/// Serialize a scene document to XML text
pub fn write_scene_xml(document: &SceneDocument) -> Result<String> {
    write_document(&document_to_xml(document))
}

impl SceneDocument {
    /// Serialize to XML text, see [`write_scene_xml`]
    pub fn to_xml_string(&self) -> Result<String> {
        write_scene_xml(self)
    }
}

/// Build the `GeneralSceneDescription` element of a document
pub fn document_to_xml(document: &SceneDocument) -> XmlElement {
    let mut root = XmlElement::new(SCENE_ROOT)
        .with_attr("verMajor", document.ver_major.to_string())
        .with_attr("verMinor", document.ver_minor.to_string())
        .with_opt_attr("provider", document.provider.as_deref())
        .with_opt_attr("providerVersion", document.provider_version.as_deref());
    root.push(XmlElement::new("UserData"));

    let mut scene = XmlElement::new("Scene");
    scene.push(aux_data_to_xml(&document.aux_data));

    let mut layers = XmlElement::new("Layers");
    for layer in &document.layers {
        layers.push(layer_to_xml(layer));
    }
    scene.push(layers);

    root.push(scene);
    root
}

fn aux_data_to_xml(aux: &AuxData) -> XmlElement {
    let mut element = XmlElement::new("AUXData");
    for class in &aux.classes {
        element.push(named_ref_to_xml("Class", class));
    }
    for position in &aux.positions {
        element.push(named_ref_to_xml("Position", position));
    }
    for symdef in &aux.symdefs {
        element.push(symdef_to_xml(symdef));
    }
    element
}

fn named_ref_to_xml(name: &str, named: &NamedRef) -> XmlElement {
    XmlElement::new(name)
        .with_attr("uuid", named.uuid.as_str())
        .with_opt_attr("name", non_empty(&named.name))
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() { None } else { Some(text) }
}

fn matrix_to_xml(element: &mut XmlElement, matrix: Option<&Transform>) {
    element.push_text_child("Matrix", matrix.map(|m| m.to_wire_string()));
}

fn header_element(name: &str, header: &NodeHeader) -> XmlElement {
    let mut element = XmlElement::new(name)
        .with_attr("uuid", header.uuid.as_str())
        .with_opt_attr("name", non_empty(&header.name));
    matrix_to_xml(&mut element, header.matrix.as_ref());
    element.push_text_child("Classing", header.classing.as_deref());
    element
}

fn child_list_to_xml(element: &mut XmlElement, children: &[SceneNode]) {
    if children.is_empty() {
        return;
    }
    let mut list = XmlElement::new("ChildList");
    for child in children {
        list.push(scene_to_xml(child));
    }
    element.push(list);
}

fn geometries_to_xml(container: &str, items: &[GeometryItem]) -> Option<XmlElement> {
    if items.is_empty() {
        return None;
    }
    let mut element = XmlElement::new(container);
    for item in items {
        element.push(match item {
            GeometryItem::Geometry3D(g) => geometry3d_to_xml(g),
            GeometryItem::Symbol(s) => symbol_to_xml(s),
        });
    }
    Some(element)
}

fn geometry3d_to_xml(geometry: &Geometry3D) -> XmlElement {
    let mut element = XmlElement::new("Geometry3D").with_attr("fileName", geometry.file_name.as_str());
    matrix_to_xml(&mut element, geometry.matrix.as_ref());
    element
}

fn symbol_to_xml(symbol: &Symbol) -> XmlElement {
    let mut element = header_element("Symbol", &symbol.header);
    element.set_attr("symdef", symbol.symdef.as_str());
    element
}

fn symdef_to_xml(symdef: &Symdef) -> XmlElement {
    let mut element = header_element("Symdef", &symdef.header);
    if let Some(list) = geometries_to_xml("ChildList", &symdef.geometries) {
        element.push(list);
    }
    element
}

fn layer_to_xml(layer: &Layer) -> XmlElement {
    let mut element = header_element("Layer", &layer.header);
    child_list_to_xml(&mut element, &layer.child_list);
    element
}

fn object_to_xml(kind: NodeKind, object: &ObjectNode) -> XmlElement {
    let mut element = header_element(kind.element_name(), &object.header);
    element.push_text_child("GDTFSpec", object.gdtf_spec.as_deref());
    element.push_text_child("GDTFMode", object.gdtf_mode.as_deref());
    if let Some(geometries) = geometries_to_xml("Geometries", &object.geometries) {
        element.push(geometries);
    }
    element.push_text_child("FixtureID", object.fixture_id.as_deref());
    child_list_to_xml(&mut element, &object.child_list);
    element
}

fn fixture_to_xml(fixture: &Fixture) -> XmlElement {
    let mut element = header_element("Fixture", &fixture.header);
    element.push_text_child("GDTFSpec", non_empty(&fixture.gdtf_spec));
    element.push_text_child("GDTFMode", non_empty(&fixture.gdtf_mode));
    element.push_text_child("Focus", fixture.focus.as_deref());
    element.push_text_child("CastShadow", fixture.cast_shadow.map(|c| c.to_string()));
    element.push_text_child("Position", fixture.position.as_deref());
    element.push_text_child("FixtureID", fixture.fixture_id.as_deref());
    element.push_text_child(
        "FixtureIDNumeric",
        fixture.fixture_id_numeric.map(|n| n.to_string()),
    );
    element.push_text_child("UnitNumber", fixture.unit_number.map(|n| n.to_string()));

    if !fixture.addresses.is_empty() {
        let mut addresses = XmlElement::new("Addresses");
        for address in &fixture.addresses {
            addresses.push(
                XmlElement::new("Address")
                    .with_attr("break", address.dmx_break.to_string())
                    .with_text(address.absolute().to_string()),
            );
        }
        element.push(addresses);
    }

    element.push_text_child("CustomId", fixture.custom_id.map(|n| n.to_string()));
    element.push_text_child("Color", fixture.color.map(|c| c.to_string()));
    child_list_to_xml(&mut element, &fixture.child_list);
    element
}

/// Convert any scene node to its XML element
pub fn scene_to_xml(node: &SceneNode) -> XmlElement {
    match node {
        SceneNode::Layer(layer) => layer_to_xml(layer),
        SceneNode::GroupObject(group) => {
            let mut element = header_element("GroupObject", &group.header);
            child_list_to_xml(&mut element, &group.child_list);
            element
        }
        SceneNode::SceneObject(o)
        | SceneNode::Truss(o)
        | SceneNode::Support(o)
        | SceneNode::Projector(o)
        | SceneNode::VideoScreen(o) => object_to_xml(node.kind(), o),
        SceneNode::Fixture(fixture) => fixture_to_xml(fixture),
        SceneNode::FocusPoint(focus) => {
            let mut element = header_element("FocusPoint", &focus.header);
            if let Some(geometries) = geometries_to_xml("Geometries", &focus.geometries) {
                element.push(geometries);
            }
            element
        }
        SceneNode::Symbol(symbol) => symbol_to_xml(symbol),
        SceneNode::Symdef(symdef) => symdef_to_xml(symdef),
        SceneNode::Geometry3D(geometry) => geometry3d_to_xml(geometry),
    }
}
