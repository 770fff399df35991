//! Sequencing of the catalogue and the lifetime of its fixtures.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::{Duration, Instant},
};

use http::StatusCode;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    aws::serde::{ListMultipartUploadsResult, ListedUpload},
    cases::{catalogue, CaseContext, TestCase},
    config::{ServerConfig, SuiteOptions, TeardownPolicy},
    error::{BuildError, CaseFailure, Error, VerifyError},
    executor::execute,
    orchestrator::CaseReport,
    registry::{FixtureKind, FixtureRegistry, Slots},
    request::RequestDescription,
    verify::HeaderValidator,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("{case} needs {kind} fixtures but no case produces them")]
    Unproduced {
        case: &'static str,
        kind: FixtureKind,
    },
    #[error("fixture dependencies form a cycle through: {}", .cases.join(", "))]
    Cycle { cases: Vec<&'static str> },
}

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("{failure}")]
    Case {
        /// Cases that passed before the failure, in run order.
        passed: Vec<CaseReport>,
        #[source]
        failure: CaseFailure,
    },
}

#[derive(Debug)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
    pub teardown: TeardownReport,
    pub elapsed: Duration,
}

/// Fixtures released by teardown after the catalogue ran.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub released: usize,
    pub failed: usize,
}

pub struct Suite {
    cases: Vec<Box<dyn TestCase>>,
    headers: Option<Arc<dyn HeaderValidator>>,
}

impl Suite {
    pub fn new(cases: Vec<Box<dyn TestCase>>) -> Self {
        Self {
            cases,
            headers: None,
        }
    }

    pub fn catalogue() -> Self {
        Self::new(catalogue())
    }

    /// Replaces the default `Date` / `x-amz-request-id` header rules.
    pub fn with_header_validator(mut self, headers: impl HeaderValidator + 'static) -> Self {
        self.headers = Some(Arc::new(headers));
        self
    }

    pub fn cases(&self) -> impl Iterator<Item = &dyn TestCase> {
        self.cases.iter().map(|case| case.as_ref())
    }

    /// Catalogue indices in run order.
    ///
    /// Producers of a kind run before its consumers, and both run before the
    /// cases retiring it. Ties keep catalogue order.
    pub fn schedule(&self) -> Result<Vec<usize>, ScheduleError> {
        let mut producers: BTreeMap<FixtureKind, Vec<usize>> = BTreeMap::new();
        let mut consumers: BTreeMap<FixtureKind, Vec<usize>> = BTreeMap::new();
        for (index, case) in self.cases.iter().enumerate() {
            for kind in case.produces() {
                producers.entry(*kind).or_default().push(index);
            }
            for kind in case.consumes() {
                consumers.entry(*kind).or_default().push(index);
            }
        }

        let n = self.cases.len();
        let mut edges = vec![BTreeSet::new(); n];
        for (index, case) in self.cases.iter().enumerate() {
            for kind in case.consumes().iter().chain(case.retires()) {
                let Some(sources) = producers.get(kind) else {
                    return Err(ScheduleError::Unproduced {
                        case: case.name(),
                        kind: *kind,
                    });
                };
                for &source in sources {
                    if source != index {
                        edges[source].insert(index);
                    }
                }
            }
            for kind in case.retires() {
                for &reader in consumers.get(kind).into_iter().flatten() {
                    if reader != index {
                        edges[reader].insert(index);
                    }
                }
            }
        }

        let mut incoming = vec![0usize; n];
        for targets in &edges {
            for &target in targets {
                incoming[target] += 1;
            }
        }
        let mut ready = (0..n)
            .filter(|index| incoming[*index] == 0)
            .collect::<BTreeSet<_>>();
        let mut order = Vec::with_capacity(n);
        while let Some(index) = ready.pop_first() {
            order.push(index);
            for &target in &edges[index] {
                incoming[target] -= 1;
                if incoming[target] == 0 {
                    ready.insert(target);
                }
            }
        }

        if order.len() < n {
            let cases = (0..n)
                .filter(|index| incoming[*index] > 0)
                .map(|index| self.cases[index].name())
                .collect();
            return Err(ScheduleError::Cycle { cases });
        }
        Ok(order)
    }

    pub async fn run(
        &self,
        config: ServerConfig,
        options: SuiteOptions,
    ) -> Result<SuiteReport, SuiteError> {
        self.run_with_cancel(config, options, CancellationToken::new())
            .await
    }

    /// Runs every case once, stopping at the first failure.
    ///
    /// Cancelling `cancel` aborts the probes in flight and fails the running
    /// case; teardown still runs according to the options.
    pub async fn run_with_cancel(
        &self,
        config: ServerConfig,
        options: SuiteOptions,
        cancel: CancellationToken,
    ) -> Result<SuiteReport, SuiteError> {
        let started = Instant::now();
        let order = self.schedule()?;
        let teardown = options.teardown;
        let mut cx = CaseContext::new(Arc::new(config), options, cancel);
        if let Some(headers) = &self.headers {
            cx.headers = headers.clone();
        }

        let mut scope = FixtureScope::new(cx.config.clone(), teardown);
        let mut passed = Vec::with_capacity(order.len());
        let mut failure = None;
        for index in order {
            let case = &self.cases[index];
            tracing::debug!(case = case.name(), "running case");
            match case.run(&cx, scope.registry_mut()).await {
                Ok(report) => passed.push(report),
                Err(err) => {
                    tracing::error!(case = case.name(), error = %err, "case failed");
                    failure = Some(err);
                    break;
                }
            }
        }

        let teardown = scope.release(failure.is_some()).await;
        match failure {
            Some(failure) => Err(SuiteError::Case { passed, failure }),
            None => {
                let elapsed = started.elapsed();
                tracing::info!(cases = passed.len(), ?elapsed, "suite passed");
                Ok(SuiteReport {
                    cases: passed,
                    teardown,
                    elapsed,
                })
            }
        }
    }
}

/// Owns the registry for one run and releases whatever is still alive at
/// the end of it.
pub(crate) struct FixtureScope {
    config: Arc<ServerConfig>,
    policy: TeardownPolicy,
    registry: FixtureRegistry,
}

impl FixtureScope {
    pub(crate) fn new(config: Arc<ServerConfig>, policy: TeardownPolicy) -> Self {
        Self {
            config,
            policy,
            registry: FixtureRegistry::new(),
        }
    }

    pub(crate) fn registry_mut(&mut self) -> &mut FixtureRegistry {
        &mut self.registry
    }

    /// Aborts open uploads, then deletes objects, then buckets. Errors are
    /// logged and counted, never returned.
    ///
    /// Slots that were reserved but never published are released too: the
    /// server may have created them even though the case rejected the
    /// response. Objects are deleted by key and uploads are found by listing
    /// their key.
    pub(crate) async fn release(mut self, failed: bool) -> TeardownReport {
        let mut report = TeardownReport::default();
        if !self.policy.should_release(failed) {
            let live = self.registry.buckets.live().count()
                + self.registry.objects.live().count()
                + self.registry.uploads.live().count()
                + self.registry.multipart_objects.live().count();
            if live > 0 {
                tracing::warn!(policy = ?self.policy, live, "leaving fixtures in place");
            }
            return report;
        }

        if let Some(bucket) = self.registry.primary_bucket().map(|bucket| bucket.name.clone()) {
            self.release_uploads(&bucket, &mut report).await;
            self.release_objects(&bucket, &mut report).await;
        }

        let buckets = self
            .registry
            .buckets
            .live()
            .map(|(slot, bucket)| (Some(slot), bucket.name.clone()))
            .chain(pending(&self.registry.buckets))
            .collect::<Vec<_>>();
        for (slot, name) in buckets {
            let request = RequestDescription::remove_bucket(&self.config, &name);
            if self.release_one(request, &name).await {
                if let Some(slot) = slot {
                    let _ = self.registry.buckets.retire(slot);
                }
                report.released += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            released = report.released,
            failed = report.failed,
            "teardown finished"
        );
        report
    }

    async fn release_uploads(&mut self, bucket: &str, report: &mut TeardownReport) {
        let mut uploads = self
            .registry
            .uploads
            .live()
            .map(|(slot, upload)| (Some(slot), upload.key.clone(), upload.upload_id.clone()))
            .collect::<Vec<_>>();
        for (_, key) in pending(&self.registry.uploads) {
            match self.list_uploads(bucket, &key).await {
                Ok(listed) => uploads.extend(
                    listed
                        .into_iter()
                        .filter(|upload| upload.key == key)
                        .map(|upload| (None, upload.key, upload.upload_id)),
                ),
                Err(err) => {
                    tracing::warn!(fixture = key.as_str(), error = %err, "cannot list uploads");
                    report.failed += 1;
                }
            }
        }

        for (slot, key, upload_id) in uploads {
            let request =
                RequestDescription::abort_multipart(&self.config, bucket, &key, &upload_id);
            if self.release_one(request, &key).await {
                if let Some(slot) = slot {
                    let _ = self.registry.uploads.retire(slot);
                }
                report.released += 1;
            } else {
                report.failed += 1;
            }
        }
    }

    async fn release_objects(&mut self, bucket: &str, report: &mut TeardownReport) {
        for kind in [FixtureKind::Object, FixtureKind::MultipartObject] {
            let slots = match kind {
                FixtureKind::Object => &self.registry.objects,
                _ => &self.registry.multipart_objects,
            };
            let objects = slots
                .live()
                .map(|(slot, object)| (Some(slot), object.key.clone()))
                .chain(pending(slots))
                .collect::<Vec<_>>();
            for (slot, key) in objects {
                let request = RequestDescription::remove_object(&self.config, bucket, &key);
                if self.release_one(request, &key).await {
                    let slots = match kind {
                        FixtureKind::Object => &mut self.registry.objects,
                        _ => &mut self.registry.multipart_objects,
                    };
                    if let Some(slot) = slot {
                        let _ = slots.retire(slot);
                    }
                    report.released += 1;
                } else {
                    report.failed += 1;
                }
            }
        }
    }

    async fn list_uploads(&self, bucket: &str, key: &str) -> Result<Vec<ListedUpload>, Error> {
        let request = RequestDescription::list_multipart_uploads(&self.config, bucket, key)?;
        let response = execute(&self.config, request).await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(VerifyError::Status {
                expected: StatusCode::OK,
                actual: status,
                body: String::from_utf8_lossy(&body).into_owned(),
            }
            .into());
        }
        let listing: ListMultipartUploadsResult =
            quick_xml::de::from_reader(body.as_ref()).map_err(VerifyError::from)?;
        Ok(listing.upload)
    }

    async fn release_one(
        &self,
        request: Result<RequestDescription, BuildError>,
        fixture: &str,
    ) -> bool {
        let result = async {
            let response = execute(&self.config, request?).await?;
            let status = response.status();
            response.discard().await?;
            Ok::<_, Error>(status)
        }
        .await;
        match result {
            Ok(status) if status.is_success() || status == StatusCode::NOT_FOUND => true,
            Ok(status) => {
                tracing::warn!(fixture, %status, "teardown request rejected");
                false
            }
            Err(err) => {
                tracing::warn!(fixture, error = %err, "teardown request failed");
                false
            }
        }
    }
}

/// Reserved slots that never got a value, keyed by the name they reserved.
fn pending<T>(slots: &Slots<T>) -> impl Iterator<Item = (Option<usize>, String)> + '_ {
    slots.pending().map(|(_, name)| (None, name.to_string()))
}
