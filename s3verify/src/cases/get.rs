use futures_util::{future::BoxFuture, FutureExt};
use http::header::CONTENT_LENGTH;
use rand::Rng;

use super::{primary_bucket, CaseContext, TestCase};
use crate::{
    error::{CaseFailure, Error, VerifyError},
    orchestrator::CaseReport,
    registry::{FixtureKind, FixtureRegistry, ObjectInfo},
    request::{ByteRange, RequestDescription},
    verify::Expectation,
};

/// `(bucket, object)` pairs for every live object, in slot order.
pub(super) fn live_objects(
    case: &'static str,
    registry: &FixtureRegistry,
) -> Result<Vec<(String, ObjectInfo)>, CaseFailure> {
    let bucket = primary_bucket(case, registry)?;
    Ok(registry
        .objects
        .live()
        .map(|(_, object)| (bucket.clone(), object.clone()))
        .collect())
}

/// One random inclusive range per live object.
fn random_ranges(
    case: &'static str,
    registry: &FixtureRegistry,
) -> Result<Vec<(String, ObjectInfo, ByteRange)>, CaseFailure> {
    let mut rng = rand::thread_rng();
    live_objects(case, registry)?
        .into_iter()
        .enumerate()
        .map(|(index, (bucket, object))| {
            let len = object.body.len() as u64;
            let start = rng.gen_range(0..len.max(1));
            let end = rng.gen_range(start..len.max(start + 1));
            let range = ByteRange::new(start, end, len).map_err(|err| CaseFailure {
                case,
                index: Some(index),
                source: err.into(),
            })?;
            Ok((bucket, object, range))
        })
        .collect()
}

/// Reads every object back in full.
pub struct GetObject;

impl TestCase for GetObject {
    fn name(&self) -> &'static str {
        "GetObject"
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
                            let request = RequestDescription::get_object(
                                probe.config(),
                                &bucket,
                                &object.key,
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

/// Metadata-only reads: empty body, size and entity tag as uploaded.
pub struct HeadObject;

impl TestCase for HeadObject {
    fn name(&self) -> &'static str {
        "HeadObject"
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
                            let request = RequestDescription::head_object(
                                probe.config(),
                                &bucket,
                                &object.key,
                            )?;
                            let verified = probe.call(request, &Expectation::head()).await?;

                            let length = verified
                                .headers
                                .get(CONTENT_LENGTH)
                                .and_then(|value| value.to_str().ok())
                                .ok_or(VerifyError::MissingHeader("Content-Length"))?;
                            if length != object.size.to_string() {
                                return Err(Error::from(VerifyError::Header {
                                    name: "Content-Length",
                                    expected: object.size.to_string(),
                                    actual: length.to_string(),
                                }));
                            }
                            match verified.etag() {
                                Some(etag) if etag == object.etag => Ok(()),
                                Some(etag) => Err(VerifyError::Header {
                                    name: "ETag",
                                    expected: object.etag.clone(),
                                    actual: etag.to_string(),
                                }
                                .into()),
                                None => Err(VerifyError::MissingHeader("ETag").into()),
                            }
                        }
                    },
                    |_, ()| Ok(()),
                )
                .await
        }
        .boxed()
    }
}

/// Reads a random inclusive byte range of every object.
pub struct GetRange;

impl TestCase for GetRange {
    fn name(&self) -> &'static str {
        "GetObject (Range)"
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
            let case = self.name();
            let inputs = random_ranges(case, registry)?;
            let probe = cx.probe();
            cx.orchestrator
                .run(
                    case,
                    inputs,
                    |(bucket, object, range)| {
                        let probe = probe.clone();
                        async move {
                            let request = RequestDescription::get_object_range(
                                probe.config(),
                                &bucket,
                                &object.key,
                                range,
                            )?;
                            let expectation = Expectation::range(range.slice(&object.body));
                            probe.call(request, &expectation).await?;
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
