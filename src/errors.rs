use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Filter value at '{path}' mixes operator keys and field keys")]
    MixedFilterObject { path: String },

    #[error("Invalid sort direction for '{field}': {token}")]
    InvalidSortDirection { field: String, token: String },

    #[error("Invalid delta: {0}")]
    InvalidDelta(String),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Duplicate key on index '{index}': {key}")]
    DuplicateKey { index: String, key: String },

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("feature not implemented: {0}")]
    FeatureNotImplemented(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Extended JSON: {0}")]
    ExtJson(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl DbError {
    /// True for errors raised before any driver call is issued.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::MixedFilterObject { .. }
                | Self::InvalidSortDirection { .. }
                | Self::InvalidDelta(_)
                | Self::NoSuchCollection(_)
                | Self::Json(_)
                | Self::ExtJson(_)
        )
    }
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
