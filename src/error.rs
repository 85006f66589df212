//! Error and warning types for MVR/GDTF conversion
//!
//! Fatal problems are reported through [`Error`]. Everything a conversion can
//! recover from is collected as a [`Warning`] and returned next to the result.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML parsing and structure errors
//! - **E3xxx**: Model errors
//! - **E4xxx**: Unsupported features
//! - **E5xxx**: Conversion control
//!
//! Warnings use `W<category><number>` with the same categories.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for MVR/GDTF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when reading or writing MVR and GDTF files
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading or writing a file
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - Insufficient permissions
    /// - Disk full while exporting
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted ZIP file
    /// - Truncated archive
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Missing entry in an archive
    ///
    /// **Error Code**: E1003
    ///
    /// **Suggestions**:
    /// - Check that the referenced file name matches an entry of the archive
    #[error("[E1003] Missing archive entry: {0}")]
    MissingFile(String),

    /// The archive or profile file does not exist on disk
    ///
    /// **Error Code**: E1004
    #[error("[E1004] File not found: {0}")]
    NotFound(String),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Malformed XML syntax
    /// - Unclosed tags
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Invalid XML structure, including missing required attributes
    ///
    /// **Error Code**: E2003
    ///
    /// **Suggestions**:
    /// - Every scene node except `Geometry3D` needs a `uuid` attribute
    #[error("[E2003] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Invalid archive layout (the archive is readable but not an MVR/GDTF package)
    ///
    /// **Error Code**: E2004
    ///
    /// **Common Causes**:
    /// - Missing `GeneralSceneDescription.xml` or `description.xml`
    #[error("[E2004] Invalid archive format: {0}")]
    InvalidFormat(String),

    /// XML writing error
    ///
    /// **Error Code**: E2005
    #[error("[E2005] XML writing error: {0}")]
    XmlWrite(String),

    /// Invalid model content
    ///
    /// **Error Code**: E3001
    #[error("[E3001] Invalid model: {0}")]
    InvalidModel(String),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E3002
    #[error("[E3002] Parse error: {0}")]
    ParseError(String),

    /// Unsupported feature or configuration
    ///
    /// **Error Code**: E4001
    #[error("[E4001] Unsupported feature: {0}")]
    Unsupported(String),

    /// The conversion was cancelled through its cancellation token
    ///
    /// **Error Code**: E5001
    #[error("[E5001] Conversion cancelled")]
    Cancelled,
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create an InvalidXml error with element context
    pub fn invalid_xml_element(element: &str, message: &str) -> Self {
        Error::InvalidXml(format!("Element '<{}>': {}", element, message))
    }

    /// Create an InvalidXml error for a missing required attribute
    ///
    /// # Example
    /// ```ignore
    /// Error::missing_attribute("Fixture", "uuid")
    /// ```
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        Error::InvalidXml(format!(
            "Element '<{}>' is missing required attribute '{}'",
            element, attribute
        ))
    }

    /// Create an InvalidFormat error with context about what is invalid
    pub fn invalid_format_context(context: &str, message: &str) -> Self {
        Error::InvalidFormat(format!("{}: {}", context, message))
    }

    /// Create a ParseError with context about what was being parsed
    pub fn parse_error_with_context(field_name: &str, value: &str, expected_type: &str) -> Self {
        Error::ParseError(format!(
            "Failed to parse '{}': expected {}, got '{}'",
            field_name, expected_type, value
        ))
    }

    /// Create an XmlWrite error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }

    /// Whether this error means the archive itself is unusable
    pub fn is_archive_corrupt(&self) -> bool {
        matches!(self, Error::Zip(_) | Error::InvalidFormat(_))
    }
}

/// Category of a recoverable problem found during a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A required attribute was missing and a fallback default was used
    SchemaViolation,
    /// A referenced mesh, image or profile could not be found
    MissingAsset,
    /// A matrix could not be parsed and identity was substituted
    MalformedTransform,
    /// A uuid reference (symdef, focus point, geometry) did not resolve
    UnresolvedReference,
    /// A node failed to build and was left out of the graph
    NodeSkipped,
}

impl WarningKind {
    /// Warning code used in messages
    pub fn code(&self) -> &'static str {
        match self {
            WarningKind::SchemaViolation => "W2001",
            WarningKind::MissingAsset => "W1001",
            WarningKind::MalformedTransform => "W3001",
            WarningKind::UnresolvedReference => "W3002",
            WarningKind::NodeSkipped => "W3003",
        }
    }
}

/// A recoverable problem collected during import or export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// What kind of problem this is
    pub kind: WarningKind,
    /// Uuid of the node the problem belongs to, when known
    pub uuid: Option<String>,
    /// Human readable description
    pub message: String,
}

impl Warning {
    /// Create a warning without node context
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            uuid: None,
            message: message.into(),
        }
    }

    /// Attach the uuid of the node the warning belongs to
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.code(), self.message)?;
        if let Some(ref uuid) = self.uuid {
            write!(f, " (node {})", uuid)?;
        }
        Ok(())
    }
}

/// Collected warnings of one conversion pass
///
/// Every warning is mirrored to `tracing` when it is recorded.
#[derive(Debug, Default, Clone)]
pub(crate) struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, warning: Warning) {
        tracing::warn!(code = warning.kind.code(), uuid = ?warning.uuid, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub(crate) fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        self.push(Warning::new(kind, message));
    }

    pub(crate) fn warn_node(&mut self, kind: WarningKind, uuid: &str, message: impl Into<String>) {
        self.push(Warning::new(kind, message).with_uuid(uuid));
    }

    pub(crate) fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for warning in warnings {
            self.push(warning);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.warnings.len()
    }

    pub(crate) fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }
}
