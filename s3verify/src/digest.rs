//! Integrity digests attached to every request.
//!
//! S3 checks `Content-MD5` against the received body and signs over the
//! hex SHA-256 carried in `x-amz-content-sha256`, so both are computed from
//! the exact bytes that will be sent.

use std::io::{self, Read};

use base64::{prelude::BASE64_STANDARD, Engine};
use ring::digest::{Context, SHA256};

const CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Base64 of the MD5 digest, the `Content-MD5` header value.
    pub content_md5: String,
    /// Lower-case hex SHA-256, the `x-amz-content-sha256` header value.
    pub payload_sha256: String,
    pub content_length: u64,
}

impl Digest {
    pub fn compute(payload: &[u8]) -> Self {
        let mut md5 = md5::Context::new();
        let mut sha256 = Context::new(&SHA256);
        md5.consume(payload);
        sha256.update(payload);
        Self::finish(md5, sha256, payload.len() as u64)
    }

    /// Streams `reader` to its end. Fails only if reading fails.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut md5 = md5::Context::new();
        let mut sha256 = Context::new(&SHA256);
        let mut buf = vec![0; CHUNK];
        let mut len = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            md5.consume(&buf[..n]);
            sha256.update(&buf[..n]);
            len += n as u64;
        }
        Ok(Self::finish(md5, sha256, len))
    }

    fn finish(md5: md5::Context, sha256: Context, content_length: u64) -> Self {
        Self {
            content_md5: BASE64_STANDARD.encode(md5.compute().0),
            payload_sha256: hex::encode(sha256.finish()),
            content_length,
        }
    }
}
