use futures_util::{future::BoxFuture, FutureExt};

use super::{primary_bucket, CaseContext, TestCase};
use crate::{
    error::CaseFailure,
    orchestrator::CaseReport,
    registry::{FixtureKind, FixtureRegistry},
    request::RequestDescription,
    verify::Expectation,
};

/// Deletes every plain and multipart object still alive.
pub struct RemoveObject;

impl TestCase for RemoveObject {
    fn name(&self) -> &'static str {
        "RemoveObject"
    }

    fn consumes(&self) -> &'static [FixtureKind] {
        &[
            FixtureKind::Bucket,
            FixtureKind::Object,
            FixtureKind::MultipartObject,
        ]
    }

    fn retires(&self) -> &'static [FixtureKind] {
        &[FixtureKind::Object, FixtureKind::MultipartObject]
    }

    fn run<'a>(
        &'a self,
        cx: &'a CaseContext,
        registry: &'a mut FixtureRegistry,
    ) -> BoxFuture<'a, Result<CaseReport, CaseFailure>> {
        async move {
            let bucket = primary_bucket(self.name(), registry)?;
            let targets = registry
                .objects
                .live()
                .map(|(slot, object)| (FixtureKind::Object, slot, object.key.clone()))
                .chain(
                    registry
                        .multipart_objects
                        .live()
                        .map(|(slot, object)| {
                            (FixtureKind::MultipartObject, slot, object.key.clone())
                        }),
                )
                .collect::<Vec<_>>();
            let slots = targets
                .iter()
                .map(|(kind, slot, _)| (*kind, *slot))
                .collect::<Vec<_>>();

            let probe = cx.probe();
            cx.orchestrator
                .run(
                    self.name(),
                    targets,
                    |(_, _, key)| {
                        let probe = probe.clone();
                        let bucket = bucket.clone();
                        async move {
                            let request =
                                RequestDescription::remove_object(probe.config(), &bucket, &key)?;
                            probe.call(request, &Expectation::delete()).await?;
                            Ok(())
                        }
                    },
                    |index, ()| {
                        match slots[index] {
                            (FixtureKind::MultipartObject, slot) => {
                                registry.multipart_objects.retire(slot)?
                            }
                            (_, slot) => registry.objects.retire(slot)?,
                        }
                        Ok(())
                    },
                )
                .await
        }
        .boxed()
    }
}

/// Deletes the buckets once everything inside them is gone.
pub struct RemoveBucket;

impl TestCase for RemoveBucket {
    fn name(&self) -> &'static str {
        "RemoveBucket"
    }

    fn consumes(&self) -> &'static [FixtureKind] {
        &[FixtureKind::Bucket]
    }

    fn retires(&self) -> &'static [FixtureKind] {
        &[FixtureKind::Bucket]
    }

    fn run<'a>(
        &'a self,
        cx: &'a CaseContext,
        registry: &'a mut FixtureRegistry,
    ) -> BoxFuture<'a, Result<CaseReport, CaseFailure>> {
        async move {
            let buckets = registry
                .buckets
                .live()
                .map(|(slot, bucket)| (slot, bucket.name.clone()))
                .collect::<Vec<_>>();
            let slots = buckets.iter().map(|(slot, _)| *slot).collect::<Vec<_>>();

            let probe = cx.probe();
            cx.orchestrator
                .run(
                    self.name(),
                    buckets,
                    |(_, name)| {
                        let probe = probe.clone();
                        async move {
                            let request = RequestDescription::remove_bucket(probe.config(), &name)?;
                            probe.call(request, &Expectation::delete()).await?;
                            Ok(())
                        }
                    },
                    |index, ()| Ok(registry.buckets.retire(slots[index])?),
                )
                .await
        }
        .boxed()
    }
}
