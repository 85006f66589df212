//! Shared definitions and asset deduplication

mod common;

use common::*;
use libmvr::{
    ExportConfig, ImportConfig, ObjectKind, SceneNode, export_mvr, import_mvr, serialize,
};

const AUX: &str = r#"
      <Symdef uuid="SD1" name="Chair">
        <ChildList>
          <Geometry3D fileName="chair.3ds"/>
        </ChildList>
      </Symdef>"#;

fn chairs(count: usize) -> String {
    let mut children = String::from(r#"<SceneObject uuid="O1" name="Seating"><Geometries>"#);
    for i in 0..count {
        children.push_str(&format!(
            r#"<Symbol uuid="S{i}" symdef="SD1"><Matrix>{{1,0,0}}{{0,1,0}}{{0,0,1}}{{{i},0,0}}</Matrix></Symbol>"#
        ));
    }
    children.push_str("</Geometries></SceneObject>");
    children
}

fn package(dir: &std::path::Path, count: usize) -> std::path::PathBuf {
    let scene = scene_xml(AUX, &chairs(count));
    let bytes = zip_bytes(&[
        ("GeneralSceneDescription.xml", scene.as_bytes()),
        ("chair.3ds", b"3ds chair"),
    ]);
    write_file(dir, "seating.mvr", &bytes)
}

#[test]
fn test_instances_share_one_definition() {
    let dir = tempfile::tempdir().unwrap();
    let output = import_mvr(package(dir.path(), 5), &ImportConfig::new()).unwrap();
    assert!(output.warnings.is_empty(), "{:?}", output.warnings);

    let graph = &output.graph;
    let definition = graph.find_uuid("SD1")[0];
    assert_eq!(graph.instances_of(definition).len(), 5);
    let meshes = graph
        .iter()
        .filter(|(_, o)| matches!(o.kind, ObjectKind::Mesh(_)))
        .count();
    assert_eq!(meshes, 1);
    assert_eq!(output.manifest.len(), 1);
}

#[test]
fn test_export_writes_definition_and_mesh_once() {
    let dir = tempfile::tempdir().unwrap();
    let output = import_mvr(package(dir.path(), 5), &ImportConfig::new()).unwrap();

    let serialized = serialize(&output.graph, &ExportConfig::new()).unwrap();
    let document = &serialized.document;
    assert_eq!(document.aux_data.symdefs.len(), 1);
    assert_eq!(document.aux_data.symdefs[0].header.uuid, "SD1");
    assert_eq!(document.aux_data.symdefs[0].geometries.len(), 1);

    let SceneNode::SceneObject(seating) = &document.layers[0].child_list[0] else {
        panic!("expected the seating object");
    };
    assert_eq!(seating.geometries.len(), 5);
    assert_eq!(serialized.manifest.len(), 1);

    let exported = dir.path().join("copy.mvr");
    export_mvr(&output.graph, &exported, &ExportConfig::new()).unwrap();
    assert_eq!(
        entry_names(&exported),
        vec!["GeneralSceneDescription.xml", "chair.3ds"]
    );
}

#[test]
fn test_dedup_is_idempotent_across_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let mut path = package(dir.path(), 3);
    for round in 0..3 {
        let output = import_mvr(&path, &ImportConfig::new()).unwrap();
        let definition = output.graph.find_uuid("SD1")[0];
        assert_eq!(output.graph.instances_of(definition).len(), 3);

        let next = dir.path().join(format!("round{}.mvr", round));
        export_mvr(&output.graph, &next, &ExportConfig::new()).unwrap();
        assert_eq!(entry_names(&next).len(), 2);
        path = next;
    }
}

#[test]
fn test_unused_definition_still_exported() {
    let dir = tempfile::tempdir().unwrap();
    let output = import_mvr(package(dir.path(), 0), &ImportConfig::new()).unwrap();
    let serialized = serialize(&output.graph, &ExportConfig::new()).unwrap();
    assert_eq!(serialized.document.aux_data.symdefs.len(), 1);
}
