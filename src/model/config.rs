//! Import and export configuration

use crate::transform::{GlobalTransform, ShearPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared with the caller
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration of an MVR import
///
/// # Example
///
/// ```
/// use libmvr::{Axis, GlobalTransform, ImportConfig};
///
/// let config = ImportConfig::new()
///     .with_global(GlobalTransform::new(Axis::Y, Axis::Z, 0.001).unwrap())
///     .with_profile_dir("/usr/share/gdtf")
///     .with_targets(true);
/// assert!(config.add_targets());
/// ```
#[derive(Debug, Clone)]
pub struct ImportConfig {
    global: GlobalTransform,
    shear_policy: ShearPolicy,
    profile_dirs: Vec<PathBuf>,
    extract_dir: Option<PathBuf>,
    add_targets: bool,
    include_images: bool,
    use_fallback_profile: bool,
    prune_empty_layers: bool,
    cancellation: CancellationToken,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            global: GlobalTransform::identity(),
            shear_policy: ShearPolicy::default(),
            profile_dirs: Vec::new(),
            extract_dir: None,
            add_targets: false,
            include_images: true,
            use_fallback_profile: true,
            prune_empty_layers: false,
            cancellation: CancellationToken::new(),
        }
    }
}

impl ImportConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global coordinate conversion
    pub fn with_global(mut self, global: GlobalTransform) -> Self {
        self.global = global;
        self
    }

    /// Set the shear policy used when decoding matrices
    pub fn with_shear_policy(mut self, policy: ShearPolicy) -> Self {
        self.shear_policy = policy;
        self
    }

    /// Add an external directory searched for GDTF profiles
    pub fn with_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dirs.push(dir.into());
        self
    }

    /// Extract referenced assets into this directory
    ///
    /// Without an extraction directory assets are referenced by archive
    /// entry only.
    pub fn with_extract_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extract_dir = Some(dir.into());
        self
    }

    /// Create aim targets for fixtures
    pub fn with_targets(mut self, add_targets: bool) -> Self {
        self.add_targets = add_targets;
        self
    }

    /// Record image entries of the archive as graph attachments
    pub fn with_images(mut self, include_images: bool) -> Self {
        self.include_images = include_images;
        self
    }

    /// Use the built-in generic profile for fixtures whose profile is missing
    pub fn with_fallback_profile(mut self, enabled: bool) -> Self {
        self.use_fallback_profile = enabled;
        self
    }

    /// Remove layers that end up without any object
    pub fn with_prune_empty_layers(mut self, prune: bool) -> Self {
        self.prune_empty_layers = prune;
        self
    }

    /// Share a cancellation token with the import
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Global coordinate conversion
    pub fn global(&self) -> &GlobalTransform {
        &self.global
    }

    /// Shear policy
    pub fn shear_policy(&self) -> ShearPolicy {
        self.shear_policy
    }

    /// External profile directories
    pub fn profile_dirs(&self) -> &[PathBuf] {
        &self.profile_dirs
    }

    /// Asset extraction directory
    pub fn extract_dir(&self) -> Option<&PathBuf> {
        self.extract_dir.as_ref()
    }

    /// Whether aim targets are created
    pub fn add_targets(&self) -> bool {
        self.add_targets
    }

    /// Whether images are attached
    pub fn include_images(&self) -> bool {
        self.include_images
    }

    /// Whether the generic profile is used for missing profiles
    pub fn use_fallback_profile(&self) -> bool {
        self.use_fallback_profile
    }

    /// Whether empty layers are removed
    pub fn prune_empty_layers(&self) -> bool {
        self.prune_empty_layers
    }

    /// Cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Default provider written on export
pub const DEFAULT_PROVIDER: &str = "libmvr";

/// Configuration of an MVR export
#[derive(Debug, Clone)]
pub struct ExportConfig {
    global: GlobalTransform,
    shear_policy: ShearPolicy,
    asset_dirs: Vec<PathBuf>,
    provider: String,
    provider_version: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            global: GlobalTransform::identity(),
            shear_policy: ShearPolicy::default(),
            asset_dirs: Vec::new(),
            provider: DEFAULT_PROVIDER.to_string(),
            provider_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ExportConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global coordinate conversion the graph was imported with
    pub fn with_global(mut self, global: GlobalTransform) -> Self {
        self.global = global;
        self
    }

    /// Set the shear policy used when encoding matrices
    pub fn with_shear_policy(mut self, policy: ShearPolicy) -> Self {
        self.shear_policy = policy;
        self
    }

    /// Add a directory searched for assets whose source file is gone
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dirs.push(dir.into());
        self
    }

    /// Set the provider name and version written into the document
    pub fn with_provider(mut self, provider: impl Into<String>, version: impl Into<String>) -> Self {
        self.provider = provider.into();
        self.provider_version = version.into();
        self
    }

    /// Global coordinate conversion
    pub fn global(&self) -> &GlobalTransform {
        &self.global
    }

    /// Shear policy
    pub fn shear_policy(&self) -> ShearPolicy {
        self.shear_policy
    }

    /// Asset search directories
    pub fn asset_dirs(&self) -> &[PathBuf] {
        &self.asset_dirs
    }

    /// Provider name
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Provider version
    pub fn provider_version(&self) -> &str {
        &self.provider_version
    }
}
