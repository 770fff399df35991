use futures_util::{future::BoxFuture, FutureExt};

use super::{
    last_modified, primary_bucket, random_name, random_payload, required_etag, CaseContext,
    TestCase,
};
use crate::{
    error::CaseFailure,
    orchestrator::CaseReport,
    registry::{FixtureKind, FixtureRegistry, ObjectInfo},
    request::RequestDescription,
    verify::Expectation,
};

/// Uploads the objects every read case probes.
pub struct PutObject;

impl TestCase for PutObject {
    fn name(&self) -> &'static str {
        "PutObject"
    }

    fn produces(&self) -> &'static [FixtureKind] {
        &[FixtureKind::Object]
    }

    fn consumes(&self) -> &'static [FixtureKind] {
        &[FixtureKind::Bucket]
    }

    fn run<'a>(
        &'a self,
        cx: &'a CaseContext,
        registry: &'a mut FixtureRegistry,
    ) -> BoxFuture<'a, Result<CaseReport, CaseFailure>> {
        async move {
            let bucket = primary_bucket(self.name(), registry)?;
            let inputs = (0..cx.options.objects)
                .map(|_| (random_name("object"), random_payload(&cx.options.object_size)))
                .collect::<Vec<_>>();
            let base = registry.objects.reserve(inputs.iter().map(|(key, _)| key.clone()));
            let probe = cx.probe();
            cx.orchestrator
                .run(
                    self.name(),
                    inputs,
                    |(key, body)| {
                        let probe = probe.clone();
                        let bucket = bucket.clone();
                        async move {
                            let request = RequestDescription::put_object(
                                probe.config(),
                                &bucket,
                                &key,
                                body.clone(),
                            )?;
                            let verified = probe.call(request, &Expectation::put()).await?;
                            Ok(ObjectInfo {
                                etag: required_etag(&verified)?,
                                last_modified: last_modified(&verified.headers)?,
                                size: body.len() as u64,
                                key,
                                body,
                            })
                        }
                    },
                    |index, object| Ok(registry.objects.publish(base + index, object)?),
                )
                .await
        }
        .boxed()
    }
}
