use bytes::Bytes;
use futures_util::{future::BoxFuture, FutureExt};

use super::{
    last_modified, missing, primary_bucket, random_name, random_payload, required_etag,
    CaseContext, TestCase,
};
use crate::{
    aws::{
        serde::{CompleteMultipartUploadResult, InitiateMultipartUploadResult},
        strip_etag_quotes,
    },
    error::{CaseFailure, Error, VerifyError},
    orchestrator::CaseReport,
    registry::{FixtureKind, FixtureRegistry, MultipartUploadInfo, ObjectInfo, PartInfo},
    request::RequestDescription,
    verify::Expectation,
};

/// Every upload gets exactly this part.
const PART_NUMBER: u32 = 1;

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    Ok(quick_xml::de::from_reader(body).map_err(VerifyError::from)?)
}

/// `(bucket, upload slot, upload)` for every upload that is still open.
fn live_uploads(
    case: &'static str,
    registry: &FixtureRegistry,
) -> Result<Vec<(String, usize, MultipartUploadInfo)>, CaseFailure> {
    let bucket = primary_bucket(case, registry)?;
    let uploads = registry
        .uploads
        .live()
        .map(|(slot, upload)| (bucket.clone(), slot, upload.clone()))
        .collect::<Vec<_>>();
    if uploads.is_empty() {
        return Err(missing(case, FixtureKind::MultipartUpload));
    }
    Ok(uploads)
}

/// Opens the multipart uploads the part and complete cases work on.
pub struct InitiateMultipart;

impl TestCase for InitiateMultipart {
    fn name(&self) -> &'static str {
        "Multipart (Initiate)"
    }

    fn produces(&self) -> &'static [FixtureKind] {
        &[FixtureKind::MultipartUpload]
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
            let keys = (0..cx.options.uploads)
                .map(|_| random_name("multipart"))
                .collect::<Vec<_>>();
            let base = registry.uploads.reserve(keys.iter().cloned());
            let probe = cx.probe();
            cx.orchestrator
                .run(
                    self.name(),
                    keys,
                    |key| {
                        let probe = probe.clone();
                        let bucket = bucket.clone();
                        async move {
                            let request = RequestDescription::initiate_multipart(
                                probe.config(),
                                &bucket,
                                &key,
                            )?;
                            let verified = probe.call(request, &Expectation::xml()).await?;
                            let result: InitiateMultipartUploadResult = decode(&verified.body)?;
                            if result.upload_id.is_empty() {
                                return Err(VerifyError::MissingElement("UploadId").into());
                            }
                            Ok(MultipartUploadInfo {
                                key,
                                upload_id: result.upload_id,
                            })
                        }
                    },
                    |index, upload| Ok(registry.uploads.publish(base + index, upload)?),
                )
                .await
        }
        .boxed()
    }
}

/// Uploads one part per open upload, all concurrently.
pub struct UploadPart;

impl TestCase for UploadPart {
    fn name(&self) -> &'static str {
        "Multipart (Upload-Part)"
    }

    fn produces(&self) -> &'static [FixtureKind] {
        &[FixtureKind::Part]
    }

    fn consumes(&self) -> &'static [FixtureKind] {
        &[FixtureKind::MultipartUpload]
    }

    fn run<'a>(
        &'a self,
        cx: &'a CaseContext,
        registry: &'a mut FixtureRegistry,
    ) -> BoxFuture<'a, Result<CaseReport, CaseFailure>> {
        async move {
            let uploads = live_uploads(self.name(), registry)?;
            let slots = uploads.iter().map(|(_, slot, _)| *slot).collect::<Vec<_>>();
            let inputs = uploads
                .into_iter()
                .map(|(bucket, _, upload)| (bucket, upload, random_payload(&cx.options.part_size)))
                .collect::<Vec<_>>();
            let probe = cx.probe();
            cx.orchestrator
                .run(
                    self.name(),
                    inputs,
                    |(bucket, upload, payload)| {
                        let probe = probe.clone();
                        async move {
                            let size = payload.len() as u64;
                            let request = RequestDescription::upload_part(
                                probe.config(),
                                &bucket,
                                &upload.key,
                                &upload.upload_id,
                                PART_NUMBER,
                                payload,
                            )?;
                            let verified = probe.call(request, &Expectation::put()).await?;
                            Ok(PartInfo {
                                part_number: PART_NUMBER,
                                etag: required_etag(&verified)?,
                                size,
                            })
                        }
                    },
                    |index, part| Ok(registry.append_part(slots[index], part)?),
                )
                .await
        }
        .boxed()
    }
}

/// Completes every open upload from its recorded parts.
pub struct CompleteMultipart;

impl TestCase for CompleteMultipart {
    fn name(&self) -> &'static str {
        "Multipart (Complete)"
    }

    fn produces(&self) -> &'static [FixtureKind] {
        &[FixtureKind::MultipartObject]
    }

    fn consumes(&self) -> &'static [FixtureKind] {
        &[FixtureKind::MultipartUpload, FixtureKind::Part]
    }

    fn retires(&self) -> &'static [FixtureKind] {
        &[FixtureKind::MultipartUpload, FixtureKind::Part]
    }

    fn run<'a>(
        &'a self,
        cx: &'a CaseContext,
        registry: &'a mut FixtureRegistry,
    ) -> BoxFuture<'a, Result<CaseReport, CaseFailure>> {
        async move {
            let case = self.name();
            let uploads = live_uploads(case, registry)?;
            let slots = uploads.iter().map(|(_, slot, _)| *slot).collect::<Vec<_>>();
            let mut inputs = Vec::with_capacity(uploads.len());
            for (index, (bucket, slot, upload)) in uploads.into_iter().enumerate() {
                let parts = registry.completed_parts(slot);
                if parts.is_empty() {
                    return Err(CaseFailure {
                        case,
                        index: Some(index),
                        source: Error::Fixture(format!("upload {} has no parts", upload.key)),
                    });
                }
                let size = registry.parts(slot).iter().map(|part| part.size).sum::<u64>();
                inputs.push((bucket, upload, parts, size));
            }
            let base = registry
                .multipart_objects
                .reserve(inputs.iter().map(|(_, upload, _, _)| upload.key.clone()));
            let probe = cx.probe();
            cx.orchestrator
                .run(
                    case,
                    inputs,
                    |(bucket, upload, parts, size)| {
                        let probe = probe.clone();
                        async move {
                            let request = RequestDescription::complete_multipart(
                                probe.config(),
                                &bucket,
                                &upload.key,
                                &upload.upload_id,
                                &parts,
                            )?;
                            let verified = probe.call(request, &Expectation::xml()).await?;
                            let result: CompleteMultipartUploadResult = decode(&verified.body)?;
                            let etag = match strip_etag_quotes(&result.etag) {
                                "" => required_etag(&verified)?,
                                etag => etag.to_string(),
                            };
                            Ok(ObjectInfo {
                                key: upload.key,
                                body: Bytes::new(),
                                etag,
                                size,
                                last_modified: last_modified(&verified.headers)?,
                            })
                        }
                    },
                    |index, object| {
                        registry.multipart_objects.publish(base + index, object)?;
                        registry.uploads.retire(slots[index])?;
                        Ok(())
                    },
                )
                .await
        }
        .boxed()
    }
}
