use thiserror::Error;

use crate::error::BoxedError;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Http(#[from] http::Error),
    #[cfg(feature = "tokio-http")]
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Other(#[from] BoxedError),
}
