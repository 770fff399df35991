//! Conditional reads. Every probe sends the passing and the failing variant
//! of its condition against the same object.

use chrono::{DateTime, Utc};
use futures_util::{future::BoxFuture, FutureExt};

use super::{get::live_objects, CaseContext, TestCase};
use crate::{
    error::CaseFailure,
    orchestrator::CaseReport,
    registry::{FixtureKind, FixtureRegistry},
    request::RequestDescription,
    verify::Expectation,
};

/// An entity tag no server hands out for a freshly uploaded object.
const INVALID_ETAG: &str = "1234567890";

/// `If-Match`: the uploaded tag reads the object, a foreign tag is refused
/// with `412 PreconditionFailed`.
pub struct GetIfMatch;

impl TestCase for GetIfMatch {
    fn name(&self) -> &'static str {
        "GetObject (If-Match)"
    }

    fn consumes(&self) -> &'static [FixtureKind] {
        &[FixtureKind::Object]
    }

    fn run<'a>(
        &'a self,
        cx: &'a CaseContext,
        registry: &'a mut FixtureRegistry,
    ) -> BoxFuture<'a, Result<CaseReport, CaseFailure>> {
        async move {
            let inputs = live_objects(self.name(), registry)?;
            let probe = cx.probe();
            cx.orchestrator
                .run(
                    self.name(),
                    inputs,
                    |(bucket, object)| {
                        let probe = probe.clone();
                        async move {
                            let config = probe.config();
                            let request = RequestDescription::get_object_if_match(
                                config,
                                &bucket,
                                &object.key,
                                &object.etag,
                            )?;
                            probe
                                .call(request, &Expectation::full_body(object.body.clone()))
                                .await?;

                            let request = RequestDescription::get_object_if_match(
                                config,
                                &bucket,
                                &object.key,
                                INVALID_ETAG,
                            )?;
                            probe
                                .call(request, &Expectation::precondition_failed())
                                .await?;
                            Ok(())
                        }
                    },
                    |_, ()| Ok(()),
                )
                .await
        }
        .boxed()
    }
}

/// `If-None-Match`: the uploaded tag yields `304` with no body, a foreign tag
/// reads the object.
pub struct GetIfNoneMatch;

impl TestCase for GetIfNoneMatch {
    fn name(&self) -> &'static str {
        "GetObject (If-None-Match)"
    }

    fn consumes(&self) -> &'static [FixtureKind] {
        &[FixtureKind::Object]
    }

    fn run<'a>(
        &'a self,
        cx: &'a CaseContext,
        registry: &'a mut FixtureRegistry,
    ) -> BoxFuture<'a, Result<CaseReport, CaseFailure>> {
        async move {
            let inputs = live_objects(self.name(), registry)?;
            let probe = cx.probe();
            cx.orchestrator
                .run(
                    self.name(),
                    inputs,
                    |(bucket, object)| {
                        let probe = probe.clone();
                        async move {
                            let config = probe.config();
                            let request = RequestDescription::get_object_if_none_match(
                                config,
                                &bucket,
                                &object.key,
                                &object.etag,
                            )?;
                            probe.call(request, &Expectation::not_modified()).await?;

                            let request = RequestDescription::get_object_if_none_match(
                                config,
                                &bucket,
                                &object.key,
                                INVALID_ETAG,
                            )?;
                            probe
                                .call(request, &Expectation::full_body(object.body))
                                .await?;
                            Ok(())
                        }
                    },
                    |_, ()| Ok(()),
                )
                .await
        }
        .boxed()
    }
}

/// `If-Modified-Since`: the upload time yields `304`, the epoch reads the
/// object.
pub struct GetIfModifiedSince;

impl TestCase for GetIfModifiedSince {
    fn name(&self) -> &'static str {
        "GetObject (If-Modified-Since)"
    }

    fn consumes(&self) -> &'static [FixtureKind] {
        &[FixtureKind::Object]
    }

    fn run<'a>(
        &'a self,
        cx: &'a CaseContext,
        registry: &'a mut FixtureRegistry,
    ) -> BoxFuture<'a, Result<CaseReport, CaseFailure>> {
        async move {
            let inputs = live_objects(self.name(), registry)?;
            let probe = cx.probe();
            cx.orchestrator
                .run(
                    self.name(),
                    inputs,
                    |(bucket, object)| {
                        let probe = probe.clone();
                        async move {
                            let config = probe.config();
                            let request = RequestDescription::get_object_if_modified_since(
                                config,
                                &bucket,
                                &object.key,
                                object.last_modified,
                            )?;
                            probe.call(request, &Expectation::not_modified()).await?;

                            let request = RequestDescription::get_object_if_modified_since(
                                config,
                                &bucket,
                                &object.key,
                                DateTime::<Utc>::UNIX_EPOCH,
                            )?;
                            probe
                                .call(request, &Expectation::full_body(object.body))
                                .await?;
                            Ok(())
                        }
                    },
                    |_, ()| Ok(()),
                )
                .await
        }
        .boxed()
    }
}
