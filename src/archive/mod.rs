//! ZIP container handling for MVR and GDTF files
//!
//! Both formats are plain ZIP archives: an MVR holds
//! `GeneralSceneDescription.xml` next to its meshes, images and embedded
//! profiles; a GDTF holds `description.xml` next to its models and wheel
//! images.

mod manifest;
mod reader;
mod writer;

pub use manifest::{AssetManifest, AssetSource, ManifestEntry};
pub use reader::{Archive, ExtractionCache};
pub use writer::{write_package, write_package_to_file};

/// Scene description file inside an MVR archive
pub const SCENE_DESCRIPTION_PATH: &str = "GeneralSceneDescription.xml";

/// Fixture description file inside a GDTF archive
pub const FIXTURE_DESCRIPTION_PATH: &str = "description.xml";
