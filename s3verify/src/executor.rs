use bytes::Bytes;
use http::{header::ETAG, HeaderMap, StatusCode};
use http_body_util::BodyExt;

use crate::{
    aws::strip_etag_quotes,
    config::ServerConfig,
    error::Error,
    http::{BoxBody, HttpClient, HttpError},
    request::RequestDescription,
};

/// Status, headers and the still-unread body of a response.
///
/// The body is read at most once through [`ResponseDescriptor::bytes`] or
/// released through [`ResponseDescriptor::discard`]; dropping the descriptor
/// releases it as well.
pub struct ResponseDescriptor {
    status: StatusCode,
    headers: HeaderMap,
    body: BoxBody,
}

impl std::fmt::Debug for ResponseDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseDescriptor")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl ResponseDescriptor {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The `ETag` header without surrounding quotes.
    pub fn etag(&self) -> Option<&str> {
        self.headers
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(strip_etag_quotes)
    }

    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        Ok(self.body.collect().await?.to_bytes())
    }

    pub async fn discard(self) -> Result<(), HttpError> {
        self.bytes().await.map(|_| ())
    }

    #[cfg(test)]
    pub(crate) fn from_parts(status: StatusCode, headers: HeaderMap, body: BoxBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }
}

/// Builds, signs and sends one request over the configured client.
///
/// Any status is a successful execution; interpreting it is the verifier's job.
pub async fn execute(
    config: &ServerConfig,
    description: RequestDescription,
) -> Result<ResponseDescriptor, Error> {
    let mut request = description.into_request(config)?;
    config.signer.sign(&mut request)?;
    let response = config.client.send_request(request).await?;
    let (parts, body) = response.into_parts();
    Ok(ResponseDescriptor {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}
