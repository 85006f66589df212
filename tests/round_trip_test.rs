//! Import, export and re-import a complete package

mod common;

use common::*;
use libmvr::{
    Constraint, ExportConfig, ImportConfig, NodeKind, ObjectKind, SceneGraph, SceneNode,
    WarningKind, build_scene, export_mvr, import_mvr, parse_scene_xml, serialize, write_scene_xml,
};
use nalgebra::Matrix4;

const AUX: &str = r#"
      <Symdef uuid="SD1" name="Chair">
        <ChildList>
          <Geometry3D fileName="chair.3ds"/>
        </ChildList>
      </Symdef>"#;

const CHILDREN: &str = r#"
          <Fixture uuid="F1" name="Spot">
            <Matrix>{1,0,0}{0,1,0}{0,0,1}{1,0,5}</Matrix>
            <GDTFSpec>Acme@Spot.gdtf</GDTFSpec>
            <GDTFMode>Standard</GDTFMode>
            <Focus>FP1</Focus>
            <FixtureID>1</FixtureID>
            <Addresses>
              <Address break="0">513</Address>
            </Addresses>
          </Fixture>
          <FocusPoint uuid="FP1" name="Center">
            <Matrix>{1,0,0}{0,1,0}{0,0,1}{1,0,0}</Matrix>
          </FocusPoint>
          <Truss uuid="T1" name="Pipe">
            <Matrix>{0,1,0}{-1,0,0}{0,0,1}{0,4,6}</Matrix>
            <Geometries>
              <Geometry3D fileName="truss.glb">
                <Matrix>{1,0,0}{0,1,0}{0,0,1}{0.5,0,0}</Matrix>
              </Geometry3D>
              <Symbol uuid="S1" symdef="SD1">
                <Matrix>{1,0,0}{0,1,0}{0,0,1}{2,0,0}</Matrix>
              </Symbol>
            </Geometries>
          </Truss>"#;

fn package(dir: &std::path::Path) -> std::path::PathBuf {
    let scene = scene_xml(AUX, CHILDREN);
    let gdtf = gdtf_package(MOVING_HEAD);
    let bytes = zip_bytes(&[
        ("GeneralSceneDescription.xml", scene.as_bytes()),
        ("truss.glb", b"glTF truss"),
        ("chair.3ds", b"3ds chair"),
        ("Acme@Spot.gdtf", &gdtf),
    ]);
    write_file(dir, "stage.mvr", &bytes)
}

fn world(graph: &SceneGraph, uuid: &str) -> Matrix4<f64> {
    let id = graph.find_uuid(uuid)[0];
    graph.get(id).unwrap().world
}

#[test]
fn test_import_builds_fixture_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = package(dir.path());
    let output = import_mvr(&path, &ImportConfig::new().with_targets(true)).unwrap();
    assert!(output.warnings.is_empty(), "{:?}", output.warnings);

    let graph = &output.graph;
    let fixture = graph.find_uuid("F1")[0];
    let info = graph.get(fixture).unwrap().fixture.clone().unwrap();
    assert_eq!(info.gdtf_mode, "Standard");
    assert_eq!(info.addresses[0].absolute(), 513);
    assert_eq!(info.channel_count, 9);

    let parts: Vec<_> = graph
        .descendants(fixture)
        .into_iter()
        .filter_map(|id| graph.get(id))
        .filter(|o| matches!(o.kind, ObjectKind::FixturePart { .. }))
        .map(|o| o.name.clone())
        .collect();
    assert!(parts.contains(&"Yoke".to_string()));
    assert!(parts.contains(&"Head".to_string()));
    assert!(parts.contains(&"Pixel1".to_string()));

    // The head tracks the target, which sits on the focus point
    let head = graph
        .descendants(fixture)
        .into_iter()
        .find(|id| graph.get(*id).unwrap().name == "Head")
        .unwrap();
    let Some(Constraint::TrackTo(target)) = graph
        .get(head)
        .unwrap()
        .constraints
        .iter()
        .find(|c| matches!(c, Constraint::TrackTo(_)))
        .copied()
    else {
        panic!("head has no aim constraint");
    };
    assert!((graph.get(target).unwrap().world - world(graph, "FP1")).norm() < 1e-9);

    // Head sits 0.3 above the fixture origin
    let head_world = graph.get(head).unwrap().world;
    assert!((head_world[(2, 3)] - 5.3).abs() < 1e-9);

    assert!(output.manifest.contains("truss.glb"));
    assert!(output.manifest.contains("chair.3ds"));
    assert!(output.manifest.contains("Acme@Spot.gdtf"));
}

#[test]
fn test_round_trip_preserves_worlds() {
    let dir = tempfile::tempdir().unwrap();
    let path = package(dir.path());
    let config = ImportConfig::new().with_targets(true);
    let first = import_mvr(&path, &config).unwrap();

    let exported = dir.path().join("copy.mvr");
    let warnings = export_mvr(&first.graph, &exported, &ExportConfig::new()).unwrap();
    assert!(warnings.is_empty(), "{:?}", warnings);
    assert_eq!(
        entry_names(&exported),
        vec![
            "Acme@Spot.gdtf",
            "GeneralSceneDescription.xml",
            "chair.3ds",
            "truss.glb"
        ]
    );

    let second = import_mvr(&exported, &config).unwrap();
    assert!(second.warnings.is_empty(), "{:?}", second.warnings);
    for uuid in ["L1", "F1", "FP1", "T1", "S1"] {
        let difference = (world(&first.graph, uuid) - world(&second.graph, uuid)).norm();
        assert!(difference < 1e-6, "{} moved by {}", uuid, difference);
    }

    let truss = second.graph.find_uuid("T1")[0];
    assert_eq!(second.graph.get(truss).unwrap().class, Some(NodeKind::Truss));
    let mesh = second
        .graph
        .children(truss)
        .iter()
        .copied()
        .find(|id| matches!(second.graph.get(*id).unwrap().kind, ObjectKind::Mesh(_)))
        .unwrap();
    let first_mesh = first
        .graph
        .children(first.graph.find_uuid("T1")[0])
        .iter()
        .copied()
        .find(|id| matches!(first.graph.get(*id).unwrap().kind, ObjectKind::Mesh(_)))
        .unwrap();
    let difference =
        (first.graph.get(first_mesh).unwrap().world - second.graph.get(mesh).unwrap().world).norm();
    assert!(difference < 1e-6);
}

#[test]
fn test_missing_scene_description_is_archive_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "empty.mvr", &zip_bytes(&[("truss.glb", b"x")]));
    let err = import_mvr(&path, &ImportConfig::new()).unwrap_err();
    assert!(err.is_archive_corrupt());
}

#[test]
fn test_corrupt_archive_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "broken.mvr", b"not a zip file");
    assert!(import_mvr(&path, &ImportConfig::new()).is_err());
}

#[test]
fn test_images_attached_and_repacked() {
    let dir = tempfile::tempdir().unwrap();
    let scene = scene_xml("", "");
    let bytes = zip_bytes(&[
        ("GeneralSceneDescription.xml", scene.as_bytes()),
        ("plot.png", b"png"),
    ]);
    let path = write_file(dir.path(), "plot.mvr", &bytes);

    let output = import_mvr(&path, &ImportConfig::new()).unwrap();
    assert_eq!(output.graph.attachments().len(), 1);

    let exported = dir.path().join("copy.mvr");
    export_mvr(&output.graph, &exported, &ExportConfig::new()).unwrap();
    assert!(entry_names(&exported).contains(&"plot.png".to_string()));

    let output = import_mvr(&path, &ImportConfig::new().with_images(false)).unwrap();
    assert!(output.graph.attachments().is_empty());
    assert!(
        !output
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::MissingAsset)
    );
}

#[test]
fn test_extraction_writes_each_mesh_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = package(dir.path());
    let extract = dir.path().join("assets");
    let output = import_mvr(&path, &ImportConfig::new().with_extract_dir(&extract)).unwrap();
    assert!(extract.join("truss.glb").is_file());
    assert!(extract.join("chair.3ds").is_file());
    let entry = output.manifest.get("truss.glb").unwrap();
    assert_eq!(
        entry.source,
        libmvr::AssetSource::File(extract.join("truss.glb"))
    );
}

const NAMED_AUX: &str = r#"
      <Class uuid="C1" name="Lighting"/>
      <Position uuid="P1" name="FOH"/>"#;

const NAMED_CHILDREN: &str = r#"
          <Fixture uuid="F1" name="Spot">
            <Classing>C1</Classing>
            <GDTFSpec>Acme@Spot.gdtf</GDTFSpec>
            <GDTFMode>Standard</GDTFMode>
            <Position>P1</Position>
          </Fixture>
          <Truss uuid="T1" name="Pipe"/>
          <Truss uuid="T2" name="Pipe"/>
          <Projector uuid="PR1" name="Beamer">
            <GDTFSpec>Acme@Proj.gdtf</GDTFSpec>
            <GDTFMode>Video</GDTFMode>
            <FixtureID>7</FixtureID>
          </Projector>"#;

/// Parse, build and serialize a scene description once
fn cycle(xml: &str) -> String {
    let (document, _) = parse_scene_xml(xml).unwrap();
    let config = ImportConfig::new().with_targets(false);
    let output = build_scene(&document, &config).unwrap();
    let exported = serialize(&output.graph, &ExportConfig::new()).unwrap();
    write_scene_xml(&exported.document).unwrap()
}

#[test]
fn test_names_and_aux_data_survive_round_trips() {
    let first = cycle(&scene_xml(NAMED_AUX, NAMED_CHILDREN));
    let second = cycle(&first);
    assert_eq!(first, second);

    let (document, warnings) = parse_scene_xml(&second).unwrap();
    assert!(warnings.is_empty(), "{:?}", warnings);
    let names: Vec<&str> = document.layers[0]
        .child_list
        .iter()
        .map(|n| n.name())
        .collect();
    assert_eq!(names, vec!["Spot", "Pipe", "Pipe", "Beamer"]);
    assert_eq!(document.layers[0].header.name, "Main");

    assert_eq!(document.aux_data.classes.len(), 1);
    assert_eq!(document.aux_data.classes[0].name, "Lighting");
    assert_eq!(document.aux_data.positions.len(), 1);
    assert_eq!(document.aux_data.positions[0].uuid, "P1");

    let SceneNode::Fixture(fixture) = &document.layers[0].child_list[0] else {
        panic!("expected a fixture");
    };
    assert_eq!(fixture.header.classing.as_deref(), Some("C1"));
    assert_eq!(fixture.position.as_deref(), Some("P1"));

    let SceneNode::Projector(projector) = &document.layers[0].child_list[3] else {
        panic!("expected a projector");
    };
    assert_eq!(projector.gdtf_spec.as_deref(), Some("Acme@Proj.gdtf"));
    assert_eq!(projector.gdtf_mode.as_deref(), Some("Video"));
    assert_eq!(projector.fixture_id.as_deref(), Some("7"));
}
