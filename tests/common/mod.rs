//! Shared builders for integration tests
//!
//! Packages are assembled in memory with `zip::ZipWriter` and written to a
//! temporary directory when a test needs a path.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A moving head: base, yoke (pan), head (tilt) with a beam, plus a pixel
/// referenced on break 2
pub const MOVING_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GDTF DataVersion="1.1">
  <FixtureType Name="Spot" ShortName="SP" Manufacturer="Acme" FixtureTypeID="F00D">
    <Models>
      <Model Name="Base" Length="0.3" Width="0.3" Height="0.1" PrimitiveType="Base"/>
      <Model Name="Yoke" Length="0.3" Width="0.1" Height="0.3" PrimitiveType="Yoke"/>
      <Model Name="Head" Length="0.2" Width="0.2" Height="0.3" File="head"/>
    </Models>
    <Geometries>
      <Geometry Name="Base" Model="Base">
        <Axis Name="Yoke" Model="Yoke" Position="{1,0,0,0}{0,1,0,0}{0,0,1,0.2}{0,0,0,1}">
          <Axis Name="Head" Model="Head" Position="{1,0,0,0}{0,1,0,0}{0,0,1,0.1}{0,0,0,1}">
            <Beam Name="Beam" BeamType="Spot" BeamAngle="15" BeamRadius="0.08"/>
          </Axis>
        </Axis>
        <GeometryReference Name="Pixel1" Geometry="Pixel">
          <Break DMXBreak="2" DMXOffset="1"/>
        </GeometryReference>
        <GeometryReference Name="Pixel2" Geometry="Pixel">
          <Break DMXBreak="2" DMXOffset="4"/>
        </GeometryReference>
      </Geometry>
      <Geometry Name="Pixel"/>
    </Geometries>
    <DMXModes>
      <DMXMode Name="Standard" Geometry="Base">
        <DMXChannels>
          <DMXChannel DMXBreak="1" Offset="1,2" Geometry="Yoke">
            <LogicalChannel Attribute="Pan">
              <ChannelFunction Name="Pan" Attribute="Pan" PhysicalFrom="-270" PhysicalTo="270"/>
            </LogicalChannel>
          </DMXChannel>
          <DMXChannel DMXBreak="1" Offset="3,4" Geometry="Head">
            <LogicalChannel Attribute="Tilt">
              <ChannelFunction Name="Tilt" Attribute="Tilt" PhysicalFrom="-135" PhysicalTo="135"/>
            </LogicalChannel>
          </DMXChannel>
          <DMXChannel DMXBreak="1" Offset="5" Geometry="Beam">
            <LogicalChannel Attribute="Dimmer"/>
          </DMXChannel>
          <DMXChannel DMXBreak="1" Offset="5" Geometry="Beam">
            <LogicalChannel Attribute="Shutter1"/>
          </DMXChannel>
          <DMXChannel DMXBreak="Overwrite" Offset="1" Geometry="Pixel">
            <LogicalChannel Attribute="Dimmer"/>
          </DMXChannel>
          <DMXChannel DMXBreak="Overwrite" Offset="2" Geometry="Pixel">
            <LogicalChannel Attribute="ColorAdd_R"/>
          </DMXChannel>
          <DMXChannel Offset="None" Geometry="Base">
            <LogicalChannel Attribute="Control"/>
          </DMXChannel>
        </DMXChannels>
      </DMXMode>
    </DMXModes>
    <Revisions>
      <Revision Text="initial"/>
    </Revisions>
  </FixtureType>
</GDTF>"#;

/// Build a ZIP archive from `(name, bytes)` pairs
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A GDTF package holding `description` and a glTF head model
pub fn gdtf_package(description: &str) -> Vec<u8> {
    zip_bytes(&[
        ("description.xml", description.as_bytes()),
        ("models/gltf/head.glb", b"glTF"),
    ])
}

/// Write `bytes` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Wrap a layer child list into a complete scene description
pub fn scene_xml(aux: &str, children: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<GeneralSceneDescription verMajor="1" verMinor="6" provider="Tests" providerVersion="1">
  <UserData/>
  <Scene>
    <AUXData>{aux}</AUXData>
    <Layers>
      <Layer uuid="L1" name="Main">
        <ChildList>{children}</ChildList>
      </Layer>
    </Layers>
  </Scene>
</GeneralSceneDescription>"#
    )
}

/// Sorted entry names of a ZIP file on disk
pub fn entry_names(path: &Path) -> Vec<String> {
    let archive = libmvr::Archive::open(path).unwrap();
    let mut names = archive.entry_names().to_vec();
    names.sort();
    names
}
