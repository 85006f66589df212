//! Loaded GDTF profiles

use crate::archive::{Archive, AssetSource, FIXTURE_DESCRIPTION_PATH};
use crate::error::{Diagnostics, Result, Warning};
use crate::ident::sha256_hex;
use crate::model::*;
use crate::parser::parse_description_with;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Maximum number of gobo images, one DMX channel's worth of values
pub const MAX_GOBO_ENTRIES: usize = 255;

/// Name of the built-in generic profile
pub const GENERIC_PROFILE_SPEC: &str = "Generic@Generic.gdtf";

/// Where a profile was loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    /// Embedded in the scene archive
    Embedded {
        /// Scene archive path, when the archive came from disk
        archive: Option<PathBuf>,
        /// Entry name inside the scene archive
        entry: String,
    },
    /// A file in an external profile directory
    External(PathBuf),
    /// The built-in generic profile
    Generic,
}

impl ProfileSource {
    /// Source to pack the profile from on export
    pub fn asset_source(&self) -> Option<AssetSource> {
        match self {
            ProfileSource::Embedded {
                archive: Some(archive),
                entry,
            } => Some(AssetSource::ArchiveEntry {
                archive: archive.clone(),
                entry: entry.clone(),
            }),
            ProfileSource::External(path) => Some(AssetSource::File(path.clone())),
            ProfileSource::Embedded { archive: None, .. } | ProfileSource::Generic => None,
        }
    }
}

/// A parsed fixture profile with its package contents
#[derive(Debug, Clone)]
pub struct Profile {
    /// File name the profile is known by (`Manufacturer@Model.gdtf`)
    pub spec: String,
    /// Parsed description
    pub fixture_type: FixtureType,
    /// Origin of the profile
    pub source: ProfileSource,
    entries: Vec<String>,
    warnings: Vec<Warning>,
}

impl Profile {
    /// Load a profile from the bytes of a GDTF archive
    pub fn from_bytes(spec: &str, bytes: Vec<u8>, source: ProfileSource) -> Result<Self> {
        let mut archive = Archive::from_reader(Cursor::new(bytes))?;
        let xml = archive.read_entry_string(FIXTURE_DESCRIPTION_PATH)?;
        let mut diagnostics = Diagnostics::new();
        let fixture_type = parse_description_with(&xml, &mut diagnostics)?;
        Ok(Self {
            spec: spec.to_string(),
            fixture_type,
            source,
            entries: archive.entry_names().to_vec(),
            warnings: diagnostics.into_vec(),
        })
    }

    /// Load a profile file from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let spec = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&spec, bytes, ProfileSource::External(path.to_path_buf()))
    }

    /// The built-in generic profile: a small body with one dimmed beam
    pub fn generic() -> Self {
        let mut body = Geometry::new("Body", GeometryKind::Geometry);
        body.model = Some("Body".to_string());
        let mut beam = Geometry::new("Beam", GeometryKind::Beam(BeamParams::default()));
        beam.model = Some("Beam".to_string());
        body.children.push(beam);

        let dimmer = DmxChannel {
            dmx_break: Some(1),
            offsets: vec![1],
            geometry: "Beam".to_string(),
            initial_function: None,
            logical_channels: vec![LogicalChannel {
                attribute: "Dimmer".to_string(),
                functions: vec![ChannelFunction {
                    name: "Dimmer".to_string(),
                    attribute: "Dimmer".to_string(),
                    dmx_from: "0/1".to_string(),
                    physical_from: 0.0,
                    physical_to: 1.0,
                    wheel: None,
                }],
            }],
        };

        let fixture_type = FixtureType {
            name: "Generic".to_string(),
            short_name: "Generic".to_string(),
            long_name: "Generic fixture".to_string(),
            manufacturer: "Generic".to_string(),
            models: vec![
                Model {
                    name: "Body".to_string(),
                    length: 0.2,
                    width: 0.2,
                    height: 0.2,
                    primitive_type: PrimitiveType::Cube,
                    file: None,
                },
                Model {
                    name: "Beam".to_string(),
                    length: 0.1,
                    width: 0.1,
                    height: 0.05,
                    primitive_type: PrimitiveType::Cylinder,
                    file: None,
                },
            ],
            geometries: vec![body],
            dmx_modes: vec![DmxMode {
                name: "Default".to_string(),
                geometry: "Body".to_string(),
                channels: vec![dimmer],
            }],
            ..FixtureType::default()
        };

        Self {
            spec: GENERIC_PROFILE_SPEC.to_string(),
            fixture_type,
            source: ProfileSource::Generic,
            entries: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Whether this is the built-in generic profile
    pub fn is_generic(&self) -> bool {
        self.source == ProfileSource::Generic
    }

    /// Entry names of the profile package
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Recoverable problems found while parsing the description
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    #[cfg(test)]
    pub(crate) fn with_entries(mut self, entries: Vec<String>) -> Self {
        self.entries = entries;
        self
    }

    /// Wheel image entries in package order, capped at [`MAX_GOBO_ENTRIES`]
    pub fn gobo_entries(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.starts_with("wheels/") && !e.ends_with('/'))
            .take(MAX_GOBO_ENTRIES)
            .map(String::as_str)
            .collect()
    }

    /// Package entry of a model file
    ///
    /// Looks for `models/gltf/<file>.glb`, then `.gltf`, then
    /// `models/3ds/<file>.3ds`. A file name that already carries an
    /// extension is looked up in both folders as is.
    pub fn model_entry(&self, file: &str) -> Option<&str> {
        let has_extension = Path::new(file).extension().is_some();
        let candidates: Vec<String> = if has_extension {
            vec![format!("models/gltf/{}", file), format!("models/3ds/{}", file)]
        } else {
            vec![
                format!("models/gltf/{}.glb", file),
                format!("models/gltf/{}.gltf", file),
                format!("models/3ds/{}.3ds", file),
            ]
        };
        candidates.iter().find_map(|candidate| {
            self.entries
                .iter()
                .find(|e| e.eq_ignore_ascii_case(candidate))
                .map(String::as_str)
        })
    }

    /// Cache key of the fixture template built for a mode
    pub fn template_key(&self, mode: &str, with_target: bool) -> String {
        let ft = &self.fixture_type;
        let identity = format!(
            "{}, {}, {}, {}, {}, {}",
            self.spec,
            ft.manufacturer,
            ft.name,
            mode,
            ft.last_revision(),
            if with_target { "with_target" } else { "without_target" }
        );
        sha256_hex(identity.as_bytes())[..16].to_string()
    }
}
