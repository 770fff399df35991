//! The probe catalogue.
//!
//! Each case declares the fixture kinds it produces, consumes and retires;
//! the suite derives the run order from those declarations alone.

mod bucket;
mod conditional;
mod get;
mod multipart;
mod put;
mod remove;

use std::{ops::Range, sync::Arc};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use http::{
    header::{DATE, LAST_MODIFIED},
    HeaderMap,
};
use rand::{distributions::Alphanumeric, Rng};
use tokio_util::sync::CancellationToken;

pub use self::{
    bucket::MakeBucket,
    conditional::{GetIfMatch, GetIfModifiedSince, GetIfNoneMatch},
    get::{GetObject, GetRange, HeadObject},
    multipart::{CompleteMultipart, InitiateMultipart, UploadPart},
    put::PutObject,
    remove::{RemoveBucket, RemoveObject},
};
use crate::{
    config::{ServerConfig, SuiteOptions},
    error::{CaseFailure, Error, VerifyError},
    executor::execute,
    orchestrator::{CaseReport, Orchestrator},
    registry::{FixtureKind, FixtureRegistry},
    request::RequestDescription,
    verify::{verify, Expectation, HeaderValidator, StandardHeaders, Verified},
};

/// One catalogue entry.
pub trait TestCase: Send + Sync {
    fn name(&self) -> &'static str;

    fn produces(&self) -> &'static [FixtureKind] {
        &[]
    }

    fn consumes(&self) -> &'static [FixtureKind] {
        &[]
    }

    /// Kinds whose fixtures this case releases on the server.
    fn retires(&self) -> &'static [FixtureKind] {
        &[]
    }

    fn run<'a>(
        &'a self,
        cx: &'a CaseContext,
        registry: &'a mut FixtureRegistry,
    ) -> BoxFuture<'a, Result<CaseReport, CaseFailure>>;
}

/// Every case, in catalogue order.
pub fn catalogue() -> Vec<Box<dyn TestCase>> {
    vec![
        Box::new(MakeBucket),
        Box::new(PutObject),
        Box::new(HeadObject),
        Box::new(GetObject),
        Box::new(GetRange),
        Box::new(GetIfMatch),
        Box::new(GetIfNoneMatch),
        Box::new(GetIfModifiedSince),
        Box::new(InitiateMultipart),
        Box::new(UploadPart),
        Box::new(CompleteMultipart),
        Box::new(RemoveObject),
        Box::new(RemoveBucket),
    ]
}

/// Shared, read-only state every case runs against.
pub struct CaseContext {
    pub config: Arc<ServerConfig>,
    pub options: SuiteOptions,
    pub orchestrator: Orchestrator,
    pub headers: Arc<dyn HeaderValidator>,
}

impl CaseContext {
    pub fn new(
        config: Arc<ServerConfig>,
        options: SuiteOptions,
        cancel: CancellationToken,
    ) -> Self {
        let orchestrator = Orchestrator::new(options.concurrency, cancel);
        Self {
            config,
            options,
            orchestrator,
            headers: Arc::new(StandardHeaders),
        }
    }

    pub(crate) fn probe(&self) -> Probe {
        Probe {
            config: self.config.clone(),
            headers: self.headers.clone(),
        }
    }
}

/// What a probe task carries: the config and header rules, nothing else.
#[derive(Clone)]
pub(crate) struct Probe {
    config: Arc<ServerConfig>,
    headers: Arc<dyn HeaderValidator>,
}

impl Probe {
    pub(crate) fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Executes `request` and verifies the response against `expectation`.
    pub(crate) async fn call(
        &self,
        request: RequestDescription,
        expectation: &Expectation,
    ) -> Result<Verified, Error> {
        let response = execute(&self.config, request).await?;
        verify(response, expectation, self.headers.as_ref()).await
    }
}

/// The bucket object-level cases work in.
pub(crate) fn primary_bucket(
    case: &'static str,
    registry: &FixtureRegistry,
) -> Result<String, CaseFailure> {
    registry
        .primary_bucket()
        .map(|bucket| bucket.name.clone())
        .ok_or_else(|| missing(case, FixtureKind::Bucket))
}

pub(crate) fn missing(case: &'static str, kind: FixtureKind) -> CaseFailure {
    CaseFailure {
        case,
        index: None,
        source: Error::Fixture(format!("no live {kind} in the registry")),
    }
}

pub(crate) fn required_etag(verified: &Verified) -> Result<String, Error> {
    verified
        .etag()
        .map(str::to_string)
        .ok_or(Error::Verify(VerifyError::MissingHeader("ETag")))
}

/// `Last-Modified`, falling back to `Date` for servers that omit it on writes.
pub(crate) fn last_modified(headers: &HeaderMap) -> Result<DateTime<Utc>, Error> {
    [LAST_MODIFIED, DATE]
        .iter()
        .filter_map(|name| headers.get(name)?.to_str().ok())
        .find_map(|value| DateTime::parse_from_rfc2822(value).ok())
        .map(|time| time.with_timezone(&Utc))
        .ok_or(Error::Verify(VerifyError::MissingHeader("Last-Modified")))
}

/// Lower-case alphanumeric name with the given prefix, valid as a bucket name.
pub(crate) fn random_name(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{prefix}-{suffix}")
}

/// Random bytes with a length drawn from `size`; never empty.
pub(crate) fn random_payload(size: &Range<usize>) -> Bytes {
    let mut rng = rand::thread_rng();
    let len = if size.is_empty() {
        size.start
    } else {
        rng.gen_range(size.clone())
    };
    let mut payload = vec![0u8; len.max(1)];
    rng.fill(&mut payload[..]);
    Bytes::from(payload)
}
