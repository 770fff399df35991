//! Protocol-neutral descriptions of the probed S3 operations.
//!
//! Constructors never touch shared state: they only read the user agent and
//! region from the config, digest the payload and lay out the headers. The
//! executor turns the description into an HTTP request and signs it.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{
    header::{CONTENT_LENGTH, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, RANGE, USER_AGENT},
    HeaderMap, HeaderName, HeaderValue, Method, Request,
};
use percent_encoding::utf8_percent_encode;
use url::Url;

use crate::{
    aws::{
        quote_etag,
        serde::{
            CompleteMultipartUploadRequest, CompleteMultipartUploadRequestPart,
            CreateBucketConfiguration,
        },
        CONTENT_SHA256_HEADER, STRICT_ENCODE_SET, STRICT_PATH_ENCODE_SET,
    },
    config::{ServerConfig, DEFAULT_REGION},
    digest::Digest,
    error::BuildError,
    http::{full_body, BoxBody},
    registry::CompletedPart,
};

const CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");

/// `If-Modified-Since` wire format, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Inclusive byte range within an object of known length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64, len: u64) -> Result<Self, BuildError> {
        if start > end || end >= len {
            return Err(BuildError::InvalidRange { start, end, len });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Bytes of `payload` covered by the range.
    pub fn slice(&self, payload: &Bytes) -> Bytes {
        payload.slice(self.start as usize..=self.end as usize)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes={}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone)]
pub struct RequestDescription {
    pub method: Method,
    pub bucket: String,
    pub key: Option<String>,
    /// Query pairs in send order. A `None` value renders as a bare key.
    pub query: Vec<(String, Option<String>)>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub content_length: u64,
}

impl RequestDescription {
    fn new(
        config: &ServerConfig,
        method: Method,
        bucket: &str,
        key: Option<&str>,
        body: Bytes,
    ) -> Result<Self, BuildError> {
        let digest = Digest::compute(&body);
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(config.user_agent())?);
        headers.insert(
            CONTENT_SHA256_HEADER,
            HeaderValue::from_str(&digest.payload_sha256)?,
        );
        if !body.is_empty() {
            headers.insert(CONTENT_MD5, HeaderValue::from_str(&digest.content_md5)?);
            headers.insert(CONTENT_LENGTH, HeaderValue::from(digest.content_length));
        }

        Ok(Self {
            method,
            bucket: bucket.to_string(),
            key: key.map(str::to_string),
            query: Vec::new(),
            headers,
            body,
            content_length: digest.content_length,
        })
    }

    fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, BuildError> {
        self.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(self)
    }

    fn with_query(mut self, key: &str, value: Option<String>) -> Self {
        self.query.push((key.to_string(), value));
        self
    }

    pub fn get_object(config: &ServerConfig, bucket: &str, key: &str) -> Result<Self, BuildError> {
        Self::new(config, Method::GET, bucket, Some(key), Bytes::new())
    }

    pub fn head_object(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
    ) -> Result<Self, BuildError> {
        Self::new(config, Method::HEAD, bucket, Some(key), Bytes::new())
    }

    pub fn get_object_if_match(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
        etag: &str,
    ) -> Result<Self, BuildError> {
        Self::get_object(config, bucket, key)?.with_header(IF_MATCH, &quote_etag(etag))
    }

    pub fn get_object_if_none_match(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
        etag: &str,
    ) -> Result<Self, BuildError> {
        Self::get_object(config, bucket, key)?.with_header(IF_NONE_MATCH, &quote_etag(etag))
    }

    pub fn get_object_if_modified_since(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
        since: DateTime<Utc>,
    ) -> Result<Self, BuildError> {
        Self::get_object(config, bucket, key)?
            .with_header(IF_MODIFIED_SINCE, &since.format(IMF_FIXDATE).to_string())
    }

    pub fn get_object_range(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
        range: ByteRange,
    ) -> Result<Self, BuildError> {
        Self::get_object(config, bucket, key)?.with_header(RANGE, &range.to_string())
    }

    pub fn put_object(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
        payload: Bytes,
    ) -> Result<Self, BuildError> {
        Self::new(config, Method::PUT, bucket, Some(key), payload)
    }

    pub fn remove_object(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
    ) -> Result<Self, BuildError> {
        Self::new(config, Method::DELETE, bucket, Some(key), Bytes::new())
    }

    pub fn make_bucket(config: &ServerConfig, bucket: &str) -> Result<Self, BuildError> {
        let body = if config.region() == DEFAULT_REGION {
            Bytes::new()
        } else {
            let configuration = CreateBucketConfiguration {
                location_constraint: config.region().to_string(),
            };
            Bytes::from(quick_xml::se::to_string(&configuration)?)
        };
        Self::new(config, Method::PUT, bucket, None, body)
    }

    pub fn remove_bucket(config: &ServerConfig, bucket: &str) -> Result<Self, BuildError> {
        Self::new(config, Method::DELETE, bucket, None, Bytes::new())
    }

    pub fn initiate_multipart(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
    ) -> Result<Self, BuildError> {
        Ok(Self::new(config, Method::POST, bucket, Some(key), Bytes::new())?
            .with_query("uploads", None))
    }

    /// `part_number` is 1-based.
    pub fn upload_part(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        payload: Bytes,
    ) -> Result<Self, BuildError> {
        Ok(Self::new(config, Method::PUT, bucket, Some(key), payload)?
            .with_query("partNumber", Some(part_number.to_string()))
            .with_query("uploadId", Some(upload_id.to_string())))
    }

    pub fn complete_multipart(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<Self, BuildError> {
        let request = CompleteMultipartUploadRequest {
            part: parts
                .iter()
                .map(|part| CompleteMultipartUploadRequestPart {
                    part_number: part.part_number,
                    etag: quote_etag(&part.etag),
                })
                .collect(),
        };
        let body = Bytes::from(quick_xml::se::to_string(&request)?);
        Ok(Self::new(config, Method::POST, bucket, Some(key), body)?
            .with_query("uploadId", Some(upload_id.to_string())))
    }

    pub fn abort_multipart(
        config: &ServerConfig,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<Self, BuildError> {
        Ok(Self::new(config, Method::DELETE, bucket, Some(key), Bytes::new())?
            .with_query("uploadId", Some(upload_id.to_string())))
    }

    /// Open multipart uploads whose key starts with `prefix`.
    pub fn list_multipart_uploads(
        config: &ServerConfig,
        bucket: &str,
        prefix: &str,
    ) -> Result<Self, BuildError> {
        Ok(Self::new(config, Method::GET, bucket, None, Bytes::new())?
            .with_query("uploads", None)
            .with_query("prefix", Some(prefix.to_string())))
    }

    /// Path-style URL: `{endpoint}/{bucket}[/{key}][?query]`.
    pub fn url(&self, config: &ServerConfig) -> Result<Url, BuildError> {
        let mut url = format!(
            "{}/{}",
            config.endpoint(),
            utf8_percent_encode(&self.bucket, &STRICT_ENCODE_SET)
        );
        if let Some(key) = &self.key {
            url.push('/');
            url.extend(utf8_percent_encode(key, &STRICT_PATH_ENCODE_SET));
        }
        for (position, (key, value)) in self.query.iter().enumerate() {
            url.push(if position == 0 { '?' } else { '&' });
            url.extend(utf8_percent_encode(key, &STRICT_ENCODE_SET));
            if let Some(value) = value {
                url.push('=');
                url.extend(utf8_percent_encode(value, &STRICT_ENCODE_SET));
            }
        }
        Ok(Url::parse(&url)?)
    }

    /// Assembles the unsigned HTTP request.
    pub fn into_request(self, config: &ServerConfig) -> Result<Request<BoxBody>, BuildError> {
        let url = self.url(config)?;
        let mut request = Request::builder()
            .method(self.method)
            .uri(url.as_str())
            .body(full_body(self.body))?;
        request.headers_mut().extend(self.headers);
        Ok(request)
    }
}
