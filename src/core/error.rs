use thiserror::Error;

/// Errors that can occur while unpacking, parsing or reporting invoices.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FaturaError {
    /// The XML document is not well-formed.
    #[error("XML error: {0}")]
    Xml(String),

    /// A required element is absent from the document.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// An element is present but its text cannot be interpreted.
    #[error("invalid value for {field}: '{value}'")]
    InvalidValue { field: String, value: String },

    /// An archive could not be opened or is corrupt.
    #[error("archive error: {0}")]
    Archive(String),

    /// A workbook could not be assembled or written.
    #[error("report error: {0}")]
    Report(String),

    /// The scratch workspace could not be prepared.
    #[error("workspace error: {0}")]
    Workspace(String),

    /// Input enumeration pattern was rejected.
    #[error("pattern error: {0}")]
    Pattern(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl FaturaError {
    pub(crate) fn invalid(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, FaturaError>;
