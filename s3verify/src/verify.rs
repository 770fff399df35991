//! Operation-specific response rules.
//!
//! Checks run status, then headers, then body, and stop at the first
//! mismatch. The body is always released, whether it was read or not.

use bytes::Bytes;
use http::{
    header::{DATE, ETAG},
    HeaderMap, StatusCode,
};

use crate::{
    aws::{strip_etag_quotes, S3ResponseError, REQUEST_ID_HEADER},
    error::{preview, Error, VerifyError},
    executor::ResponseDescriptor,
};

/// Validates response headers shared by every operation.
pub trait HeaderValidator: Send + Sync {
    fn validate(&self, headers: &HeaderMap) -> Result<(), VerifyError>;
}

/// Requires `Date` and `x-amz-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardHeaders;

impl HeaderValidator for StandardHeaders {
    fn validate(&self, headers: &HeaderMap) -> Result<(), VerifyError> {
        if !headers.contains_key(DATE) {
            return Err(VerifyError::MissingHeader("Date"));
        }
        if !headers.contains_key(REQUEST_ID_HEADER) {
            return Err(VerifyError::MissingHeader(REQUEST_ID_HEADER));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyRule {
    Empty,
    Exact(Bytes),
    /// An XML `Error` document carrying this code.
    ErrorCode(&'static str),
    /// Any body that is not an XML `Error` document, handed back to the
    /// caller.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub status: StatusCode,
    pub body: BodyRule,
}

impl Expectation {
    pub fn new(status: StatusCode, body: BodyRule) -> Self {
        Self { status, body }
    }

    /// PUT object, upload part, make bucket.
    pub fn put() -> Self {
        Self::new(StatusCode::OK, BodyRule::Empty)
    }

    /// Remove object, remove bucket, abort multipart.
    pub fn delete() -> Self {
        Self::new(StatusCode::NO_CONTENT, BodyRule::Empty)
    }

    pub fn head() -> Self {
        Self::new(StatusCode::OK, BodyRule::Empty)
    }

    pub fn full_body(payload: Bytes) -> Self {
        Self::new(StatusCode::OK, BodyRule::Exact(payload))
    }

    pub fn range(slice: Bytes) -> Self {
        Self::new(StatusCode::PARTIAL_CONTENT, BodyRule::Exact(slice))
    }

    pub fn not_modified() -> Self {
        Self::new(StatusCode::NOT_MODIFIED, BodyRule::Empty)
    }

    pub fn precondition_failed() -> Self {
        Self::new(
            StatusCode::PRECONDITION_FAILED,
            BodyRule::ErrorCode("PreconditionFailed"),
        )
    }

    /// Initiate and complete multipart.
    pub fn xml() -> Self {
        Self::new(StatusCode::OK, BodyRule::Any)
    }
}

/// Headers and body of a response that passed verification.
#[derive(Debug)]
pub struct Verified {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Verified {
    pub fn etag(&self) -> Option<&str> {
        self.headers
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(strip_etag_quotes)
    }
}

pub async fn verify(
    response: ResponseDescriptor,
    expectation: &Expectation,
    headers: &dyn HeaderValidator,
) -> Result<Verified, Error> {
    let status = response.status();
    if status != expectation.status {
        // A broken body still reports the status mismatch.
        let body = response.bytes().await.unwrap_or_default();
        let detail = embedded_error(&body)
            .map(|error| format!("{}: {}", error.code, error.message))
            .unwrap_or_else(|| preview(&body));
        return Err(VerifyError::Status {
            expected: expectation.status,
            actual: status,
            body: detail,
        }
        .into());
    }

    if let Err(err) = headers.validate(response.headers()) {
        response.discard().await?;
        return Err(err.into());
    }

    let headers = response.headers().clone();
    let body = response.bytes().await?;
    check_body(&expectation.body, &body)?;
    Ok(Verified { headers, body })
}

fn check_body(rule: &BodyRule, body: &Bytes) -> Result<(), VerifyError> {
    match rule {
        BodyRule::Empty if body.is_empty() => Ok(()),
        BodyRule::Empty => Err(VerifyError::Body {
            expected: String::new(),
            expected_len: 0,
            actual: preview(body),
            actual_len: body.len(),
        }),
        BodyRule::Exact(expected) if expected == body => Ok(()),
        BodyRule::Exact(expected) => Err(VerifyError::Body {
            expected: preview(expected),
            expected_len: expected.len(),
            actual: preview(body),
            actual_len: body.len(),
        }),
        BodyRule::ErrorCode(code) => {
            let error: S3ResponseError = quick_xml::de::from_reader(body.as_ref())?;
            if error.code == *code {
                Ok(())
            } else {
                Err(VerifyError::ErrorCode {
                    expected: code.to_string(),
                    actual: error.code,
                })
            }
        }
        BodyRule::Any => match embedded_error(body) {
            Some(error) => Err(VerifyError::ErrorCode {
                expected: "no error document".to_string(),
                actual: error.code,
            }),
            None => Ok(()),
        },
    }
}

/// An `Error` document returned with a success status.
fn embedded_error(body: &[u8]) -> Option<S3ResponseError> {
    let text = std::str::from_utf8(body).ok()?;
    let root = text
        .trim_start()
        .strip_prefix("<?xml")
        .and_then(|rest| rest.split_once("?>"))
        .map_or(text, |(_, rest)| rest)
        .trim_start();
    if !root.starts_with("<Error>") {
        return None;
    }
    quick_xml::de::from_str(text).ok()
}
