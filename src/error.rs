use thiserror::Error;

/// Why an external decryption attempt failed, classified from the tool's diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptFailure {
    WrongPassword,
    NotEncrypted,
    ToolFailure(String),
}

impl std::fmt::Display for DecryptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecryptFailure::WrongPassword => write!(f, "invalid password"),
            DecryptFailure::NotEncrypted => write!(f, "file is not encrypted"),
            DecryptFailure::ToolFailure(detail) => write!(f, "tool failure: {detail}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperationError(String),

    #[error("Range error: {0}")]
    RangeError(String),

    #[error("External tool error: {0}")]
    ExternalToolError(String),

    #[error("Decryption failed: {0}")]
    DecryptionError(DecryptFailure),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("PDF write error: {0}")]
    PdfWriteError(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("Word conversion error: {0}")]
    WordError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`TransformError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl TransformError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a validation error (malformed or missing rule fields).
    validation => ValidationError,
    /// Create a not-found error (unknown document id, missing backing bytes).
    not_found => NotFoundError,
    /// Create an unsupported-operation error.
    unsupported => UnsupportedOperationError,
    /// Create a page range error.
    range => RangeError,
    /// Create an external tool error.
    external_tool => ExternalToolError,
    /// Create a configuration error.
    config => ConfigError,
    /// Create a PDF read error.
    pdf_read => PdfReadError,
    /// Create a PDF write error.
    pdf_write => PdfWriteError,
    /// Create an image error.
    image => ImageError,
    /// Create an archive error.
    archive => ArchiveError,
    /// Create a word conversion error.
    word => WordError,
}

impl TransformError {
    /// Message suitable for showing to the person who submitted the rules.
    ///
    /// Decryption failures are translated into plain guidance; every other
    /// error is surfaced verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::DecryptionError(DecryptFailure::WrongPassword) => {
                "The password you entered is incorrect. Please check it and try again.".to_string()
            }
            Self::DecryptionError(DecryptFailure::NotEncrypted) => {
                "This PDF is not password protected, so there is no password to remove."
                    .to_string()
            }
            Self::DecryptionError(DecryptFailure::ToolFailure(_)) => {
                "The password could not be removed from this PDF. The file may be damaged or use an unsupported encryption method."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<lopdf::Error> for TransformError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfReadError(e.to_string())
    }
}

impl From<serde_json::Error> for TransformError {
    fn from(e: serde_json::Error) -> Self {
        Self::ValidationError(e.to_string())
    }
}

impl From<serde_yml::Error> for TransformError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<image::ImageError> for TransformError {
    fn from(e: image::ImageError) -> Self {
        Self::ImageError(e.to_string())
    }
}

impl From<base64::DecodeError> for TransformError {
    fn from(e: base64::DecodeError) -> Self {
        Self::ValidationError(format!("invalid base64 image data: {e}"))
    }
}

impl From<zip::result::ZipError> for TransformError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::ArchiveError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
