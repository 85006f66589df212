use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use libmvr::gdtf::{Profile, ProfileSource, build_kinematics, collect_channels};
use libmvr::{ImportConfig, build_scene, import_mvr, parse_scene_xml};
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Generate a scene description with `trusses` trusses, each holding a mesh
/// and a symbol, and `fixtures` fixtures
fn generate_scene(trusses: usize, fixtures: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<GeneralSceneDescription verMajor="1" verMinor="6">
  <UserData/>
  <Scene>
    <AUXData>
      <Symdef uuid="SD1" name="Clamp"><ChildList><Geometry3D fileName="clamp.glb"/></ChildList></Symdef>
    </AUXData>
    <Layers>
      <Layer uuid="L1" name="Rig">
        <ChildList>
"#,
    );

    for i in 0..trusses {
        xml.push_str(&format!(
            r#"          <Truss uuid="T{i}" name="Truss {i}">
            <Matrix>{{1,0,0}}{{0,1,0}}{{0,0,1}}{{{x},0,6}}</Matrix>
            <Geometries>
              <Geometry3D fileName="truss.glb"/>
              <Symbol uuid="S{i}" symdef="SD1"/>
            </Geometries>
          </Truss>
"#,
            x = i as f64 * 0.5
        ));
    }
    for i in 0..fixtures {
        xml.push_str(&format!(
            r#"          <Fixture uuid="F{i}" name="Spot">
            <Matrix>{{1,0,0}}{{0,1,0}}{{0,0,1}}{{{x},0,5.8}}</Matrix>
            <GDTFSpec>Acme@Spot.gdtf</GDTFSpec>
            <GDTFMode>Standard</GDTFMode>
            <Addresses><Address break="0">{address}</Address></Addresses>
          </Fixture>
"#,
            x = i as f64 * 0.5,
            address = i * 16 + 1
        ));
    }

    xml.push_str(
        r#"        </ChildList>
      </Layer>
    </Layers>
  </Scene>
</GeneralSceneDescription>"#,
    );
    xml
}

/// A profile with a pan/tilt chain and `pixels` referenced pixel geometries
fn generate_description(pixels: usize) -> String {
    let mut references = String::new();
    for i in 0..pixels {
        references.push_str(&format!(
            r#"<GeometryReference Name="Pixel{n}" Geometry="Pixel"><Break DMXBreak="2" DMXOffset="{offset}"/></GeometryReference>"#,
            n = i + 1,
            offset = i * 3 + 1
        ));
    }
    format!(
        r#"<GDTF DataVersion="1.1">
  <FixtureType Name="Spot" Manufacturer="Acme" FixtureTypeID="F00D">
    <Models><Model Name="Body" Length="0.3" Width="0.3" Height="0.3" PrimitiveType="Cube"/></Models>
    <Geometries>
      <Geometry Name="Base" Model="Body">
        <Axis Name="Yoke" Model="Body"><Axis Name="Head" Model="Body"><Beam Name="Beam" BeamAngle="20"/></Axis></Axis>
        {references}
      </Geometry>
      <Geometry Name="Pixel" Model="Body"/>
    </Geometries>
    <DMXModes>
      <DMXMode Name="Standard" Geometry="Base">
        <DMXChannels>
          <DMXChannel DMXBreak="1" Offset="1,2" Geometry="Yoke"><LogicalChannel Attribute="Pan"/></DMXChannel>
          <DMXChannel DMXBreak="1" Offset="3,4" Geometry="Head"><LogicalChannel Attribute="Tilt"/></DMXChannel>
          <DMXChannel DMXBreak="1" Offset="5" Geometry="Beam"><LogicalChannel Attribute="Dimmer"/></DMXChannel>
          <DMXChannel DMXBreak="Overwrite" Offset="1" Geometry="Pixel"><LogicalChannel Attribute="ColorAdd_R"/></DMXChannel>
          <DMXChannel DMXBreak="Overwrite" Offset="2" Geometry="Pixel"><LogicalChannel Attribute="ColorAdd_G"/></DMXChannel>
          <DMXChannel DMXBreak="Overwrite" Offset="3" Geometry="Pixel"><LogicalChannel Attribute="ColorAdd_B"/></DMXChannel>
        </DMXChannels>
      </DMXMode>
    </DMXModes>
  </FixtureType>
</GDTF>"#
    )
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn generate_mvr(trusses: usize, fixtures: usize) -> NamedTempFile {
    let scene = generate_scene(trusses, fixtures);
    let gdtf = zip_bytes(&[("description.xml", generate_description(16).as_bytes())]);
    let bytes = zip_bytes(&[
        ("GeneralSceneDescription.xml", scene.as_bytes()),
        ("truss.glb", b"glTF"),
        ("clamp.glb", b"glTF"),
        ("Acme@Spot.gdtf", &gdtf),
    ]);
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(&bytes).unwrap();
    temp_file
}

fn bench_parse_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_scene");

    for &(trusses, fixtures) in &[(100, 50), (1000, 500), (5000, 2000)] {
        let xml = generate_scene(trusses, fixtures);
        group.bench_with_input(
            BenchmarkId::new("trusses_fixtures", format!("{}t_{}f", trusses, fixtures)),
            &xml,
            |b, xml| {
                b.iter(|| black_box(parse_scene_xml(xml).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_build_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_scene");

    for &trusses in &[100, 1000] {
        let (document, _) = parse_scene_xml(&generate_scene(trusses, 0)).unwrap();
        group.bench_with_input(BenchmarkId::new("trusses", trusses), &document, |b, document| {
            b.iter(|| black_box(build_scene(document, &ImportConfig::new()).unwrap()));
        });
    }

    group.finish();
}

fn bench_import_package(c: &mut Criterion) {
    let mut group = c.benchmark_group("import_package");
    group.sample_size(10);

    for &(trusses, fixtures) in &[(100, 50), (1000, 200)] {
        let temp_file = generate_mvr(trusses, fixtures);
        let path = temp_file.path();
        group.bench_with_input(
            BenchmarkId::new("trusses_fixtures", format!("{}t_{}f", trusses, fixtures)),
            &path,
            |b, &path| {
                b.iter(|| black_box(import_mvr(path, &ImportConfig::new()).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_collect_channels(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect_channels");

    for &pixels in &[16, 128, 512] {
        let gdtf = zip_bytes(&[("description.xml", generate_description(pixels).as_bytes())]);
        let profile = Profile::from_bytes("Acme@Spot.gdtf", gdtf, ProfileSource::Generic).unwrap();
        group.bench_with_input(BenchmarkId::new("pixels", pixels), &profile, |b, profile| {
            b.iter(|| black_box(collect_channels(&profile.fixture_type, "Standard").unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("kinematics", pixels), &profile, |b, profile| {
            b.iter(|| black_box(build_kinematics(profile, "Standard").unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_scene,
    bench_build_scene,
    bench_import_package,
    bench_collect_channels
);
criterion_main!(benches);
