use thiserror::Error;

/// Failures at the catalog / image download boundary.
///
/// None of these are fatal to a matching attempt: the matcher logs them and
/// treats the step as having produced nothing.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is not an image (content-type: {content_type:?})")]
    NotImage { url: String, content_type: String },

    #[error("candidate has no artwork URL")]
    MissingArtwork,
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;
