pub mod credential;
pub(crate) mod serde;
pub mod sign;

pub use credential::{AuthorizeError, AwsAuthorizer, AwsCredential};
use ::serde::Deserialize;
pub use sign::{Signer, SigV4, Unsigned};

pub(crate) const STRICT_ENCODE_SET: percent_encoding::AsciiSet = percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
pub(crate) const STRICT_PATH_ENCODE_SET: percent_encoding::AsciiSet =
    STRICT_ENCODE_SET.remove(b'/');

pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

pub(crate) const CONTENT_SHA256_HEADER: &str = "x-amz-content-sha256";
pub(crate) const DATE_HEADER: &str = "x-amz-date";
pub(crate) const TOKEN_HEADER: &str = "x-amz-security-token";
pub(crate) const REQUEST_ID_HEADER: &str = "x-amz-request-id";

/// The XML error document S3 returns alongside non-2xx statuses, and
/// occasionally alongside a 200 for multipart completion.
#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "PascalCase")]
pub struct S3ResponseError {
    pub code: String,
    pub message: String,
    pub resource: String,
    pub request_id: String,
}

/// ETags travel quoted on the wire; fixtures keep the bare token.
pub fn strip_etag_quotes(etag: &str) -> &str {
    let etag = etag.strip_prefix('"').unwrap_or(etag);
    etag.strip_suffix('"').unwrap_or(etag)
}

pub fn quote_etag(etag: &str) -> String {
    format!("\"{}\"", strip_etag_quotes(etag))
}
