use futures_util::{future::BoxFuture, FutureExt};

use super::{random_name, CaseContext, TestCase};
use crate::{
    error::CaseFailure,
    orchestrator::CaseReport,
    registry::{BucketInfo, FixtureKind, FixtureRegistry},
    request::RequestDescription,
    verify::Expectation,
};

/// Creates the bucket every later case works in.
pub struct MakeBucket;

impl TestCase for MakeBucket {
    fn name(&self) -> &'static str {
        "MakeBucket"
    }

    fn produces(&self) -> &'static [FixtureKind] {
        &[FixtureKind::Bucket]
    }

    fn run<'a>(
        &'a self,
        cx: &'a CaseContext,
        registry: &'a mut FixtureRegistry,
    ) -> BoxFuture<'a, Result<CaseReport, CaseFailure>> {
        async move {
            let names = vec![random_name("s3verify")];
            let base = registry.buckets.reserve(names.iter().cloned());
            let probe = cx.probe();
            cx.orchestrator
                .run(
                    self.name(),
                    names,
                    |name| {
                        let probe = probe.clone();
                        async move {
                            let request = RequestDescription::make_bucket(probe.config(), &name)?;
                            probe.call(request, &Expectation::put()).await?;
                            Ok(BucketInfo { name })
                        }
                    },
                    |index, bucket| Ok(registry.buckets.publish(base + index, bucket)?),
                )
                .await
        }
        .boxed()
    }
}
