use http::StatusCode;
use thiserror::Error;

use crate::{aws::credential::AuthorizeError, http::HttpError, registry::RegistryError};

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure while assembling a request, before anything is sent.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to digest payload: {0}")]
    Digest(#[from] std::io::Error),
    #[error("invalid byte range {start}-{end} for a payload of {len} bytes")]
    InvalidRange { start: u64, end: u64, len: u64 },
    #[error(transparent)]
    Http(#[from] http::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),
    #[error("xml serialize error: {0}")]
    XmlSerialize(#[from] quick_xml::SeError),
    #[error("authorize error: {0}")]
    Authorize(#[from] AuthorizeError),
}

/// A response that does not honour the contract of the probed operation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("unexpected status: wanted {expected}, got {actual} (body: {body})")]
    Status {
        expected: StatusCode,
        actual: StatusCode,
        body: String,
    },
    #[error("missing response header: {0}")]
    MissingHeader(&'static str),
    #[error("unexpected {name} header: wanted {expected}, got {actual}")]
    Header {
        name: &'static str,
        expected: String,
        actual: String,
    },
    #[error("unexpected body: wanted {expected_len} bytes ({expected}), got {actual_len} bytes ({actual})")]
    Body {
        expected: String,
        expected_len: usize,
        actual: String,
        actual_len: usize,
    },
    #[error("response body has no {0} element")]
    MissingElement(&'static str),
    #[error("unexpected error code: wanted {expected}, got {actual}")]
    ErrorCode { expected: String, actual: String },
    #[error("xml deserialize error: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// Outcome of a single probe task.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("request construction failed: {0}")]
    Build(#[from] BuildError),
    #[error("transport failed: {0}")]
    Transport(#[from] HttpError),
    #[error("verification failed: {0}")]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("missing fixture: {0}")]
    Fixture(String),
    #[error("probe cancelled")]
    Cancelled,
    #[error("probe task exited without reporting a result")]
    Lost,
}

impl From<AuthorizeError> for Error {
    fn from(err: AuthorizeError) -> Self {
        Error::Build(BuildError::Authorize(err))
    }
}

/// First error observed while running a test case.
#[derive(Debug, Error)]
#[error("{case} failed{}: {source}", fixture_suffix(.index))]
pub struct CaseFailure {
    pub case: &'static str,
    pub index: Option<usize>,
    #[source]
    pub source: Error,
}

fn fixture_suffix(index: &Option<usize>) -> String {
    index
        .map(|index| format!(" on fixture #{index}"))
        .unwrap_or_default()
}

/// Lossy, truncated rendering of a body for diagnostics.
pub(crate) fn preview(body: &[u8]) -> String {
    const LIMIT: usize = 64;

    if body.len() <= LIMIT {
        String::from_utf8_lossy(body).into_owned()
    } else {
        format!("{}...", String::from_utf8_lossy(&body[..LIMIT]))
    }
}
