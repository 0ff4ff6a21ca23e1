use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoxError {
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Not of the form `sha256:<64 lowercase hex>`.
    #[error("invalid content digest ref {0:?}")]
    InvalidDigest(String),
}

/// A value could not be rendered as canonical JSON.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    #[error("value has no canonical JSON form: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
