//! Scene graph construction from MVR documents
//!
//! [`import_mvr`] reads a package and builds a fresh [`SceneGraph`].
//! [`build_into`] merges a document into an existing graph: nodes whose uuid
//! is already present are moved to the document's placement instead of being
//! created again.

mod context;
mod profiles;

pub use context::AUX_DATA_ROOT;

use crate::archive::{Archive, AssetManifest, SCENE_DESCRIPTION_PATH};
use crate::error::{Error, Result, Warning};
use crate::graph::SceneGraph;
use crate::model::{ImportConfig, SceneDocument};
use crate::parser::parse_scene_xml;
use context::ImportContext;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::time::Instant;

/// Result of building a scene graph
#[derive(Debug)]
pub struct BuildOutput {
    /// The built or updated graph
    pub graph: SceneGraph,
    /// Assets referenced by the imported nodes, keyed by archive name
    pub manifest: AssetManifest,
    /// Recoverable problems, in the order they were found
    pub warnings: Vec<Warning>,
}

/// Build a graph from a document without a package
///
/// Meshes are kept by name only and profiles come from the configured
/// directories.
pub fn build_scene(document: &SceneDocument, config: &ImportConfig) -> Result<BuildOutput> {
    build_into::<File>(SceneGraph::new(), document, None, None, config)
}

/// Build a graph from a document whose assets live in `archive`
///
/// `archive_path` is recorded in asset sources so exports can re-read entries
/// that were not extracted.
pub fn build_scene_from_archive<R: Read + Seek>(
    document: &SceneDocument,
    archive: &mut Archive<R>,
    archive_path: Option<&Path>,
    config: &ImportConfig,
) -> Result<BuildOutput> {
    build_into(SceneGraph::new(), document, Some(archive), archive_path, config)
}

/// Merge a document into `graph`
///
/// Only cancellation and I/O failures of the package itself are errors.
/// Everything else becomes a warning and the affected node is skipped.
pub fn build_into<R: Read + Seek>(
    graph: SceneGraph,
    document: &SceneDocument,
    archive: Option<&mut Archive<R>>,
    archive_path: Option<&Path>,
    config: &ImportConfig,
) -> Result<BuildOutput> {
    let start = Instant::now();
    let mut context = ImportContext::new(graph, archive, archive_path, config);
    context.run(document)?;
    let (graph, manifest, warnings) = context.finish();
    tracing::info!(
        layers = document.layers.len(),
        objects = graph.len(),
        assets = manifest.len(),
        warnings = warnings.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Built scene graph"
    );
    Ok(BuildOutput {
        graph,
        manifest,
        warnings,
    })
}

/// Import an MVR package
///
/// Warnings from parsing the scene description come first, followed by the
/// warnings of the graph build.
///
/// # Example
///
/// ```no_run
/// use libmvr::{ImportConfig, import_mvr};
///
/// # fn main() -> Result<(), libmvr::Error> {
/// let output = import_mvr("stage.mvr", &ImportConfig::new())?;
/// println!("{} objects, {} warnings", output.graph.len(), output.warnings.len());
/// # Ok(())
/// # }
/// ```
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn import_mvr(path: impl AsRef<Path>, config: &ImportConfig) -> Result<BuildOutput> {
    let path = path.as_ref();
    let mut archive = Archive::open(path)?;
    let xml = archive
        .read_entry_string(SCENE_DESCRIPTION_PATH)
        .map_err(|e| match e {
            Error::MissingFile(_) => Error::invalid_format_context(
                "MVR package",
                &format!("missing {}", SCENE_DESCRIPTION_PATH),
            ),
            other => other,
        })?;
    let (document, mut warnings) = parse_scene_xml(&xml)?;
    let output = build_scene_from_archive(&document, &mut archive, Some(path), config)?;
    warnings.extend(output.warnings);
    Ok(BuildOutput {
        warnings,
        ..output
    })
}
