//! Per-pass profile and fixture template cache

use crate::archive::{Archive, AssetManifest, AssetSource};
use crate::error::{Diagnostics, Error, Result, WarningKind};
use crate::gdtf::{KinematicModel, Profile, ProfileSource, build_kinematics};
use crate::model::ImportConfig;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use std::rc::Rc;
use walkdir::WalkDir;

/// Where profiles are looked up during one import
pub(crate) struct ProfileLookup<'a, R: Read + Seek> {
    pub(crate) archive: Option<&'a mut Archive<R>>,
    pub(crate) archive_path: Option<&'a Path>,
    pub(crate) config: &'a ImportConfig,
}

#[derive(Default)]
pub(crate) struct ProfileCache {
    profiles: HashMap<String, Option<Rc<Profile>>>,
    templates: HashMap<String, Option<Rc<KinematicModel>>>,
    generic: Option<Rc<Profile>>,
}

impl ProfileCache {
    /// Resolve a profile by its file name, loading it on first use
    ///
    /// Lookup order is the scene archive, the configured profile directories,
    /// then the generic profile when enabled. Only cancellation is an error.
    pub(crate) fn resolve<R: Read + Seek>(
        &mut self,
        spec: &str,
        lookup: &mut ProfileLookup<'_, R>,
        manifest: &mut AssetManifest,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Rc<Profile>>> {
        if let Some(cached) = self.profiles.get(spec) {
            return Ok(cached.clone());
        }

        let loaded = match load_profile(spec, lookup, diagnostics)? {
            Some(profile) => {
                diagnostics.extend(profile.warnings().iter().cloned());
                if let Some(source) = profile.source.asset_source()
                    && let Some(warning) = manifest.insert(source, spec)
                {
                    diagnostics.push(warning);
                }
                Some(Rc::new(profile))
            }
            None if lookup.config.use_fallback_profile() => {
                diagnostics.warn(
                    WarningKind::MissingAsset,
                    format!("Profile '{}' not found, using the generic profile", spec),
                );
                Some(self.generic.get_or_insert_with(|| Rc::new(Profile::generic())).clone())
            }
            None => {
                diagnostics.warn(
                    WarningKind::MissingAsset,
                    format!("Profile '{}' not found", spec),
                );
                None
            }
        };
        self.profiles.insert(spec.to_string(), loaded.clone());
        Ok(loaded)
    }

    /// Kinematic template of a profile mode, built once per pass
    pub(crate) fn template(
        &mut self,
        profile: &Profile,
        mode: &str,
        add_targets: bool,
        diagnostics: &mut Diagnostics,
    ) -> Option<Rc<KinematicModel>> {
        let key = profile.template_key(mode, add_targets);
        if let Some(cached) = self.templates.get(&key) {
            return cached.clone();
        }
        let template = match build_kinematics(profile, mode) {
            Ok(model) => {
                diagnostics.extend(model.warnings.iter().cloned());
                Some(Rc::new(model))
            }
            Err(e) => {
                diagnostics.warn(
                    WarningKind::NodeSkipped,
                    format!("Cannot build fixture '{}' mode '{}': {}", profile.spec, mode, e),
                );
                None
            }
        };
        self.templates.insert(key, template.clone());
        template
    }

    /// Number of distinct templates built
    pub(crate) fn template_count(&self) -> usize {
        self.templates.values().filter(|t| t.is_some()).count()
    }
}

fn load_profile<R: Read + Seek>(
    spec: &str,
    lookup: &mut ProfileLookup<'_, R>,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Profile>> {
    if spec.is_empty() {
        return Ok(None);
    }

    if let Some(archive) = lookup.archive.as_deref_mut()
        && let Some(entry) = archive.find_entry(spec).map(str::to_string)
    {
        let bytes = archive.read_entry(&entry)?;
        let source = ProfileSource::Embedded {
            archive: lookup.archive_path.map(Path::to_path_buf),
            entry: entry.clone(),
        };
        match Profile::from_bytes(spec, bytes, source) {
            Ok(profile) => {
                tracing::debug!(spec, entry = %entry, "Loaded embedded profile");
                return Ok(Some(profile));
            }
            Err(e) => diagnostics.warn(
                WarningKind::MissingAsset,
                format!("Embedded profile '{}' is unreadable: {}", spec, e),
            ),
        }
    }

    let token = lookup.config.cancellation();
    for dir in lookup.config.profile_dirs() {
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if !entry.file_type().is_file()
                || !entry.file_name().to_string_lossy().eq_ignore_ascii_case(spec)
            {
                continue;
            }
            match Profile::from_file(entry.path()) {
                Ok(mut profile) => {
                    profile.spec = spec.to_string();
                    tracing::debug!(spec, path = %entry.path().display(), "Loaded external profile");
                    return Ok(Some(profile));
                }
                Err(e) => diagnostics.warn(
                    WarningKind::MissingAsset,
                    format!(
                        "Profile file '{}' is unreadable: {}",
                        entry.path().display(),
                        e
                    ),
                ),
            }
        }
    }
    Ok(None)
}

/// Source an imported asset can be re-read from
pub(crate) fn entry_source(archive_path: Option<&Path>, entry: &str) -> Option<AssetSource> {
    archive_path.map(|archive| AssetSource::ArchiveEntry {
        archive: archive.to_path_buf(),
        entry: entry.to_string(),
    })
}
