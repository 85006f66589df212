//! # libmvr
//!
//! A pure Rust implementation for importing and exporting MVR (My Virtual
//! Rig) scenes and the GDTF fixture profiles they reference.
//!
//! An MVR package is a ZIP archive holding `GeneralSceneDescription.xml`,
//! mesh files and embedded GDTF profiles. This library reads the package
//! into a typed [`SceneDocument`], builds an in-memory [`SceneGraph`] with
//! world matrices, fixture kinematics and resolved DMX channel layouts, and
//! writes a graph back out as a package.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Symbol definitions shared between instances, each mesh packed once
//! - GDTF geometry trees resolved into kinematic chains with pan/tilt axes
//! - DMX channel layouts split by break, with virtual channels kept apart
//! - Recoverable problems reported as [`Warning`]s instead of aborting
//!
//! ## Example
//!
//! ```no_run
//! use libmvr::{ExportConfig, ImportConfig, export_mvr, import_mvr};
//!
//! # fn main() -> Result<(), libmvr::Error> {
//! let output = import_mvr("stage.mvr", &ImportConfig::new())?;
//! for warning in &output.warnings {
//!     eprintln!("{}", warning);
//! }
//! export_mvr(&output.graph, "stage-copy.mvr", &ExportConfig::new())?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod error;
pub mod export;
pub mod gdtf;
pub mod graph;
pub mod ident;
pub mod import;
pub mod model;
pub mod parser;
pub mod transform;
pub mod writer;
pub mod xml;

pub use archive::{Archive, AssetManifest, AssetSource};
pub use error::{Error, Result, Warning, WarningKind};
pub use export::{ExportOutput, export_mvr, serialize};
pub use gdtf::{ChannelLayout, KinematicModel, Profile, build_kinematics, collect_channels};
pub use graph::{
    Constraint, FixtureInfo, GdtfLink, GraphObject, ObjectId, ObjectKind, SceneGraph,
};
pub use import::{BuildOutput, build_into, build_scene, import_mvr};
pub use model::{
    CancellationToken, ExportConfig, Fixture, FixtureType, ImportConfig, Layer, NodeHeader,
    NodeKind, SceneDocument, SceneNode,
};
pub use parser::parse_scene_xml;
pub use transform::{Axis, GlobalTransform, ShearPolicy, Transform};
pub use writer::write_scene_xml;

