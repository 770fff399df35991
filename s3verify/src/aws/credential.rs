use std::fmt;

use chrono::{DateTime, Utc};
use http::{
    header::{AUTHORIZATION, HOST},
    HeaderMap, HeaderValue, Request,
};
use itertools::Itertools;
use percent_encoding::utf8_percent_encode;
use ring::{digest, hmac};
use thiserror::Error;
use url::form_urlencoded;

use super::{
    CONTENT_SHA256_HEADER, DATE_HEADER, STRICT_ENCODE_SET, TOKEN_HEADER, UNSIGNED_PAYLOAD,
};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Debug, Error)]
pub enum AuthorizeError {
    #[error("request uri has no host")]
    MissingHost,
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
    #[error("header {0} is not valid utf-8")]
    NonUtf8Header(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredential {
    pub key_id: String,
    pub secret_key: String,
    pub token: Option<String>,
}

impl fmt::Debug for AwsCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredential")
            .field("key_id", &self.key_id)
            .field("secret_key", &"*****")
            .field("token", &self.token.as_ref().map(|_| "*****"))
            .finish()
    }
}

impl AwsCredential {
    fn signing_key(&self, date: DateTime<Utc>, region: &str, service: &str) -> hmac::Key {
        let date = date.format("%Y%m%d").to_string();
        let date_key = hmac_sha256(format!("AWS4{}", self.secret_key).as_bytes(), date.as_bytes());
        let region_key = hmac_sha256(date_key.as_ref(), region.as_bytes());
        let service_key = hmac_sha256(region_key.as_ref(), service.as_bytes());
        let signing_key = hmac_sha256(service_key.as_ref(), b"aws4_request");
        hmac::Key::new(hmac::HMAC_SHA256, signing_key.as_ref())
    }
}

/// Signature Version 4 header authorizer.
#[derive(Debug)]
pub struct AwsAuthorizer<'a> {
    date: Option<DateTime<Utc>>,
    credential: &'a AwsCredential,
    service: &'a str,
    region: &'a str,
}

impl<'a> AwsAuthorizer<'a> {
    pub fn new(credential: &'a AwsCredential, service: &'a str, region: &'a str) -> Self {
        Self {
            date: None,
            credential,
            service,
            region,
        }
    }

    /// Pins the signing time instead of reading the clock.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Adds `host`, `x-amz-date`, the optional session token and the
    /// `authorization` header. Every header present on the request is signed.
    ///
    /// The payload hash is read from `x-amz-content-sha256`; when absent the
    /// request is signed as `UNSIGNED-PAYLOAD`.
    pub fn authorize<B>(&self, request: &mut Request<B>) -> Result<(), AuthorizeError> {
        let date = self.date.unwrap_or_else(Utc::now);
        let host = request
            .uri()
            .authority()
            .ok_or(AuthorizeError::MissingHost)?
            .as_str()
            .to_string();
        let headers = request.headers_mut();
        headers.insert(HOST, HeaderValue::from_str(&host)?);
        headers.insert(
            DATE_HEADER,
            HeaderValue::from_str(&date.format("%Y%m%dT%H%M%SZ").to_string())?,
        );
        if let Some(token) = &self.credential.token {
            let mut token = HeaderValue::from_str(token)?;
            token.set_sensitive(true);
            headers.insert(TOKEN_HEADER, token);
        }
        if !headers.contains_key(CONTENT_SHA256_HEADER) {
            headers.insert(
                CONTENT_SHA256_HEADER,
                HeaderValue::from_static(UNSIGNED_PAYLOAD),
            );
        }
        let payload_sha256 = headers
            .get(CONTENT_SHA256_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(UNSIGNED_PAYLOAD)
            .to_string();

        let (signed_headers, canonical_headers) = canonicalize_headers(request.headers())?;
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method().as_str(),
            canonical_uri(request.uri().path()),
            canonical_query(request.uri().query()),
            canonical_headers,
            signed_headers,
            payload_sha256,
        );
        let hashed_request = hex::encode(digest::digest(
            &digest::SHA256,
            canonical_request.as_bytes(),
        ));

        let scope = format!(
            "{}/{}/{}/aws4_request",
            date.format("%Y%m%d"),
            self.region,
            self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            date.format("%Y%m%dT%H%M%SZ"),
            scope,
            hashed_request
        );
        let signing_key = self.credential.signing_key(date, self.region, self.service);
        let signature = hex::encode(hmac::sign(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.credential.key_id, scope, signed_headers, signature
        );
        let mut authorization = HeaderValue::from_str(&authorization)?;
        authorization.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, authorization);

        Ok(())
    }
}

fn hmac_sha256(secret: &[u8], bytes: &[u8]) -> hmac::Tag {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hmac::sign(&key, bytes)
}

fn canonical_uri(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Query pairs re-encoded with the strict set and sorted by key then value;
/// valueless keys such as `uploads` sign as `uploads=`.
fn canonical_query(query: Option<&str>) -> String {
    let Some(query) = query else {
        return String::new();
    };
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| {
            (
                utf8_percent_encode(&key, &STRICT_ENCODE_SET).to_string(),
                utf8_percent_encode(&value, &STRICT_ENCODE_SET).to_string(),
            )
        })
        .sorted()
        .map(|(key, value)| format!("{key}={value}"))
        .join("&")
}

fn canonicalize_headers(headers: &HeaderMap) -> Result<(String, String), AuthorizeError> {
    let mut names = Vec::new();
    let mut canonical = String::new();
    for name in headers
        .keys()
        .filter(|name| **name != AUTHORIZATION)
        .sorted_by(|a, b| a.as_str().cmp(b.as_str()))
    {
        let values = headers
            .get_all(name)
            .iter()
            .map(|value| {
                value
                    .to_str()
                    .map(|value| value.split_whitespace().join(" "))
                    .map_err(|_| AuthorizeError::NonUtf8Header(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        canonical.push_str(name.as_str());
        canonical.push(':');
        canonical.push_str(&values.join(","));
        canonical.push('\n');
        names.push(name.as_str());
    }
    Ok((names.join(";"), canonical))
}
