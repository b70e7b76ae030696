use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttlibError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Persist: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("truncated page {page}: need {needed} bytes at offset {offset:#x}, file has {available}")]
    TruncatedPage { page: u32, offset: u64, needed: usize, available: u64 },

    #[error("page {page} out of bounds ({page_count} pages)")]
    PageOutOfBounds { page: u32, page_count: u32 },

    #[error("{0} segment not found")]
    SegmentNotFound(&'static str),

    #[error("no binding for attribute {attr:#x} on noun {noun}")]
    MissingBinding { noun: String, attr: u32 },

    #[error("no definition for attribute {0:#x}")]
    MissingDefinition(u32),

    #[error("unsupported data type code {0}")]
    UnsupportedType(u32),

    #[error("byte offset {offset} (+{width}) out of range for {len}-byte buffer")]
    OffsetOutOfRange { offset: usize, width: usize, len: usize },

    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl AttlibError {
    /// Lookup misses: expected in a partially understood format, so callers
    /// usually fold them into `None`.
    pub fn is_absent(&self) -> bool {
        matches!(self, AttlibError::MissingBinding { .. } | AttlibError::MissingDefinition(_))
    }
}

pub type Result<T> = std::result::Result<T, AttlibError>;
