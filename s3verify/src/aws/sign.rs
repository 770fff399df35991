use http::Request;

use super::credential::{AuthorizeError, AwsAuthorizer, AwsCredential};
use crate::http::BoxBody;

/// Turns an assembled request into an authenticated one.
///
/// The executor calls this after every header of the request description has
/// been applied, so implementations may sign all of them.
pub trait Signer: Send + Sync {
    fn sign(&self, request: &mut Request<BoxBody>) -> Result<(), AuthorizeError>;
}

/// Header-based Signature Version 4 for the `s3` service.
#[derive(Debug, Clone)]
pub struct SigV4 {
    credential: AwsCredential,
    region: String,
}

impl SigV4 {
    pub fn new(credential: AwsCredential, region: impl Into<String>) -> Self {
        Self {
            credential,
            region: region.into(),
        }
    }
}

impl Signer for SigV4 {
    fn sign(&self, request: &mut Request<BoxBody>) -> Result<(), AuthorizeError> {
        AwsAuthorizer::new(&self.credential, "s3", &self.region).authorize(request)
    }
}

/// Sends requests anonymously.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsigned;

impl Signer for Unsigned {
    fn sign(&self, _: &mut Request<BoxBody>) -> Result<(), AuthorizeError> {
        Ok(())
    }
}
