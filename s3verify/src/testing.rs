//! An in-memory S3 server reached through [`HttpClient`], for tests.
//!
//! It implements the subset of the protocol the catalogue probes, checks the
//! integrity headers of every request, and can be told to misbehave.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use http::{
    header::{
        AUTHORIZATION, CONTENT_LENGTH, CONTENT_RANGE, DATE, ETAG, IF_MATCH, IF_MODIFIED_SINCE,
        IF_NONE_MATCH, LAST_MODIFIED, RANGE,
    },
    request::Parts,
    HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode,
};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use percent_encoding::percent_decode_str;
use rand::Rng;
use serde::Deserialize;
use url::form_urlencoded;

use crate::{
    aws::{strip_etag_quotes, CONTENT_SHA256_HEADER, REQUEST_ID_HEADER, UNSIGNED_PAYLOAD},
    digest::Digest,
    error::BoxedError,
    http::{HttpClient, HttpError},
    request::IMF_FIXDATE,
};

type Predicate = Arc<dyn Fn(&Parts) -> bool + Send + Sync>;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CompleteRequest {
    #[serde(default)]
    part: Vec<CompleteRequestPart>,
}

#[derive(Deserialize)]
struct CompleteRequestPart {
    #[serde(rename = "PartNumber")]
    part_number: u32,
    #[serde(rename = "ETag")]
    etag: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateBucketRequest {
    location_constraint: String,
}

struct Object {
    body: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
}

struct Bucket {
    region: String,
    objects: BTreeMap<String, Object>,
}

struct Upload {
    bucket: String,
    key: String,
    parts: BTreeMap<u32, (String, Bytes)>,
}

#[derive(Default)]
struct State {
    buckets: BTreeMap<String, Bucket>,
    uploads: HashMap<String, Upload>,
    next_id: u64,
    last_authorization: Option<String>,
    requests: HashMap<Method, usize>,
    fault: Option<Predicate>,
    corrupt: Option<Predicate>,
    ignored: Vec<HeaderName>,
    dropped: Vec<(HeaderName, Predicate)>,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryS3 {
    state: Arc<Mutex<State>>,
    jitter: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MemoryS3 {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Delays every response by a random fraction of `max`.
    pub(crate) fn with_jitter(mut self, max: Duration) -> Self {
        self.jitter = Some(max);
        self
    }

    /// Answers matching requests with `500 InternalError`.
    pub(crate) fn inject_fault(&self, predicate: impl Fn(&Parts) -> bool + Send + Sync + 'static) {
        self.lock().fault = Some(Arc::new(predicate));
    }

    /// Flips the first byte of successful object reads for matching requests.
    pub(crate) fn corrupt_reads(&self, predicate: impl Fn(&Parts) -> bool + Send + Sync + 'static) {
        self.lock().corrupt = Some(Arc::new(predicate));
    }

    /// Behaves as if the request never carried `name`.
    pub(crate) fn ignore_header(&self, name: HeaderName) {
        self.lock().ignored.push(name);
    }

    /// Removes `name` from the responses to matching requests.
    pub(crate) fn drop_response_header(
        &self,
        name: HeaderName,
        predicate: impl Fn(&Parts) -> bool + Send + Sync + 'static,
    ) {
        self.lock().dropped.push((name, Arc::new(predicate)));
    }

    pub(crate) fn bucket_exists(&self, name: &str) -> bool {
        self.lock().buckets.contains_key(name)
    }

    pub(crate) fn bucket_region(&self, name: &str) -> Option<String> {
        self.lock().buckets.get(name).map(|bucket| bucket.region.clone())
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.lock().buckets.len()
    }

    pub(crate) fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.lock()
            .buckets
            .get(bucket)?
            .objects
            .get(key)
            .map(|object| object.body.clone())
    }

    pub(crate) fn object_count(&self) -> usize {
        self.lock()
            .buckets
            .values()
            .map(|bucket| bucket.objects.len())
            .sum()
    }

    pub(crate) fn upload_count(&self) -> usize {
        self.lock().uploads.len()
    }

    pub(crate) fn part_etag(&self, upload_id: &str, part_number: u32) -> Option<String> {
        self.lock()
            .uploads
            .get(upload_id)?
            .parts
            .get(&part_number)
            .map(|(etag, _)| etag.clone())
    }

    pub(crate) fn requests(&self, method: Method) -> usize {
        self.lock().requests.get(&method).copied().unwrap_or_default()
    }

    pub(crate) fn last_authorization(&self) -> Option<String> {
        self.lock().last_authorization.clone()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn handle(&self, mut parts: Parts, body: Bytes) -> Response<Full<Bytes>> {
        let now = Utc::now().trunc_subsecs(0);
        let mut state = self.lock();
        state.next_id += 1;
        let request_id = format!("{:016X}", state.next_id);
        *state.requests.entry(parts.method.clone()).or_default() += 1;
        if let Some(authorization) = parts.headers.get(AUTHORIZATION) {
            state.last_authorization = authorization.to_str().ok().map(str::to_string);
        }
        for name in &state.ignored {
            parts.headers.remove(name);
        }

        let mut response = if state.fault.as_ref().is_some_and(|fault| fault(&parts)) {
            error(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", "injected fault")
        } else if let Err(response) = check_integrity(&parts.headers, &body) {
            response
        } else {
            let corrupt = state.corrupt.as_ref().is_some_and(|corrupt| corrupt(&parts));
            let mut response = state.route(&parts, body, now);
            if corrupt && response.status() == StatusCode::OK && !response.body().is_empty() {
                let mut bytes = response.body().to_vec();
                bytes[0] ^= 0xff;
                *response.body_mut() = Bytes::from(bytes);
            }
            response
        };
        let dropped = state
            .dropped
            .iter()
            .filter(|(_, predicate)| predicate(&parts))
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>();
        drop(state);

        let headers = response.headers_mut();
        headers.insert(DATE, header(&now.format(IMF_FIXDATE).to_string()));
        headers.insert(REQUEST_ID_HEADER, header(&request_id));
        let len = response.body().len();
        if !response.headers().contains_key(CONTENT_LENGTH) {
            response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(len));
        }
        for name in dropped {
            response.headers_mut().remove(name);
        }
        response.map(Full::new)
    }
}

impl HttpClient for MemoryS3 {
    type RespBody = Full<Bytes>;

    async fn send_request<B>(
        &self,
        request: Request<B>,
    ) -> Result<Response<Self::RespBody>, HttpError>
    where
        B: Body + Send + Sync + 'static,
        B::Data: Into<Bytes>,
        B::Error: Into<BoxedError>,
    {
        let (parts, body) = request.into_parts();
        let body = body
            .map_frame(|frame| frame.map_data(Into::<Bytes>::into))
            .collect()
            .await
            .map_err(|err| HttpError::Other(err.into()))?
            .to_bytes();

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(max) = self.jitter {
            let delay = rand::thread_rng().gen_range(Duration::ZERO..=max);
            tokio::time::sleep(delay).await;
        }
        let response = self.handle(parts, body);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response)
    }
}

impl State {
    fn route(&mut self, parts: &Parts, body: Bytes, now: DateTime<Utc>) -> Response<Bytes> {
        let path = parts.uri.path().trim_start_matches('/');
        let (bucket, key) = match path.split_once('/') {
            Some((bucket, key)) if !key.is_empty() => (
                bucket.to_string(),
                Some(percent_decode_str(key).decode_utf8_lossy().into_owned()),
            ),
            _ => (path.trim_end_matches('/').to_string(), None),
        };
        let query = form_urlencoded::parse(parts.uri.query().unwrap_or_default().as_bytes())
            .into_owned()
            .collect::<HashMap<String, String>>();
        if bucket.is_empty() {
            return error(StatusCode::BAD_REQUEST, "InvalidBucketName", "bucket required");
        }

        let Some(key) = key else {
            return match parts.method {
                Method::PUT => self.make_bucket(bucket, &body),
                Method::DELETE => self.remove_bucket(&bucket),
                Method::GET if query.contains_key("uploads") => {
                    let prefix = query.get("prefix").map(String::as_str).unwrap_or_default();
                    self.list_uploads(&bucket, prefix)
                }
                _ => error(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed", "bucket"),
            };
        };
        if !self.buckets.contains_key(&bucket) {
            return error(StatusCode::NOT_FOUND, "NoSuchBucket", "bucket does not exist");
        }

        match (&parts.method, query.get("uploadId")) {
            (&Method::POST, _) if query.contains_key("uploads") => {
                self.initiate(bucket, key)
            }
            (&Method::PUT, Some(upload_id)) => {
                let part_number = query
                    .get("partNumber")
                    .and_then(|number| number.parse::<u32>().ok());
                match part_number {
                    Some(number) if number >= 1 => self.upload_part(upload_id, number, body),
                    _ => error(StatusCode::BAD_REQUEST, "InvalidArgument", "partNumber"),
                }
            }
            (&Method::POST, Some(upload_id)) => self.complete(upload_id, &body, now),
            (&Method::DELETE, Some(upload_id)) => match self.uploads.remove(upload_id) {
                Some(_) => empty(StatusCode::NO_CONTENT),
                None => error(StatusCode::NOT_FOUND, "NoSuchUpload", "upload does not exist"),
            },
            (&Method::PUT, None) => {
                let etag = hex::encode(md5::compute(&body).0);
                let response = Response::builder()
                    .status(StatusCode::OK)
                    .header(ETAG, format!("\"{etag}\""))
                    .body(Bytes::new());
                self.put(&bucket, key, body, etag, now);
                response.unwrap_or_else(|_| empty(StatusCode::INTERNAL_SERVER_ERROR))
            }
            (&Method::GET, None) => self.get(&bucket, &key, &parts.headers, false),
            (&Method::HEAD, None) => self.get(&bucket, &key, &parts.headers, true),
            (&Method::DELETE, None) => {
                if let Some(bucket) = self.buckets.get_mut(&bucket) {
                    bucket.objects.remove(&key);
                }
                empty(StatusCode::NO_CONTENT)
            }
            _ => error(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed", "object"),
        }
    }

    fn make_bucket(&mut self, name: String, body: &Bytes) -> Response<Bytes> {
        if self.buckets.contains_key(&name) {
            return error(StatusCode::CONFLICT, "BucketAlreadyOwnedByYou", "bucket exists");
        }
        let region = if body.is_empty() {
            "us-east-1".to_string()
        } else {
            match quick_xml::de::from_reader::<_, CreateBucketRequest>(body.as_ref()) {
                Ok(request) => request.location_constraint,
                Err(_) => return error(StatusCode::BAD_REQUEST, "MalformedXML", "bucket config"),
            }
        };
        self.buckets.insert(
            name,
            Bucket {
                region,
                objects: BTreeMap::new(),
            },
        );
        empty(StatusCode::OK)
    }

    fn list_uploads(&self, bucket: &str, prefix: &str) -> Response<Bytes> {
        if !self.buckets.contains_key(bucket) {
            return error(StatusCode::NOT_FOUND, "NoSuchBucket", "bucket does not exist");
        }
        let mut uploads = self
            .uploads
            .iter()
            .filter(|(_, upload)| upload.bucket == bucket && upload.key.starts_with(prefix))
            .map(|(id, upload)| (upload.key.as_str(), id.as_str()))
            .collect::<Vec<_>>();
        uploads.sort();
        let listed = uploads
            .into_iter()
            .map(|(key, id)| format!("<Upload><Key>{key}</Key><UploadId>{id}</UploadId></Upload>"))
            .collect::<String>();
        xml(format!(
            "<ListMultipartUploadsResult><Bucket>{bucket}</Bucket><Prefix>{prefix}</Prefix>\
             <IsTruncated>false</IsTruncated>{listed}</ListMultipartUploadsResult>"
        ))
    }

    fn remove_bucket(&mut self, name: &str) -> Response<Bytes> {
        let Some(bucket) = self.buckets.get(name) else {
            return error(StatusCode::NOT_FOUND, "NoSuchBucket", "bucket does not exist");
        };
        let open_uploads = self.uploads.values().any(|upload| upload.bucket == name);
        if !bucket.objects.is_empty() || open_uploads {
            return error(StatusCode::CONFLICT, "BucketNotEmpty", "bucket is not empty");
        }
        self.buckets.remove(name);
        empty(StatusCode::NO_CONTENT)
    }

    fn put(&mut self, bucket: &str, key: String, body: Bytes, etag: String, now: DateTime<Utc>) {
        if let Some(bucket) = self.buckets.get_mut(bucket) {
            bucket.objects.insert(
                key,
                Object {
                    body,
                    etag,
                    last_modified: now,
                },
            );
        }
    }

    fn get(&self, bucket: &str, key: &str, headers: &HeaderMap, head: bool) -> Response<Bytes> {
        let Some(object) = self.buckets.get(bucket).and_then(|b| b.objects.get(key)) else {
            return error(StatusCode::NOT_FOUND, "NoSuchKey", "key does not exist");
        };
        let value = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

        if let Some(etag) = value(IF_MATCH) {
            if strip_etag_quotes(etag) != object.etag {
                return error(
                    StatusCode::PRECONDITION_FAILED,
                    "PreconditionFailed",
                    "At least one of the pre-conditions you specified did not hold",
                );
            }
        }
        let not_modified = match value(IF_NONE_MATCH) {
            Some(etag) => strip_etag_quotes(etag) == object.etag,
            None => value(IF_MODIFIED_SINCE)
                .and_then(|since| DateTime::parse_from_rfc2822(since).ok())
                .is_some_and(|since| object.last_modified <= since),
        };

        let mut builder = Response::builder()
            .header(ETAG, format!("\"{}\"", object.etag))
            .header(LAST_MODIFIED, object.last_modified.format(IMF_FIXDATE).to_string());
        if not_modified {
            return builder
                .status(StatusCode::NOT_MODIFIED)
                .body(Bytes::new())
                .unwrap_or_else(|_| empty(StatusCode::INTERNAL_SERVER_ERROR));
        }

        let len = object.body.len();
        let (status, body) = match value(RANGE).map(|range| parse_range(range, len)) {
            Some(Some((start, end))) => {
                builder = builder.header(CONTENT_RANGE, format!("bytes {start}-{end}/{len}"));
                (StatusCode::PARTIAL_CONTENT, object.body.slice(start..=end))
            }
            Some(None) => {
                return error(StatusCode::RANGE_NOT_SATISFIABLE, "InvalidRange", "range")
            }
            None => (StatusCode::OK, object.body.clone()),
        };
        let builder = builder.status(status).header(CONTENT_LENGTH, body.len());
        let body = if head { Bytes::new() } else { body };
        builder
            .body(body)
            .unwrap_or_else(|_| empty(StatusCode::INTERNAL_SERVER_ERROR))
    }

    fn initiate(&mut self, bucket: String, key: String) -> Response<Bytes> {
        self.next_id += 1;
        let upload_id = format!("{:08x}+upload/{}", self.next_id, key.len());
        let body = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <InitiateMultipartUploadResult><Bucket>{bucket}</Bucket><Key>{key}</Key>\
             <UploadId>{upload_id}</UploadId></InitiateMultipartUploadResult>"
        );
        self.uploads.insert(
            upload_id,
            Upload {
                bucket,
                key,
                parts: BTreeMap::new(),
            },
        );
        xml(body)
    }

    fn upload_part(&mut self, upload_id: &str, number: u32, body: Bytes) -> Response<Bytes> {
        let Some(upload) = self.uploads.get_mut(upload_id) else {
            return error(StatusCode::NOT_FOUND, "NoSuchUpload", "upload does not exist");
        };
        let etag = hex::encode(md5::compute(&body).0);
        upload.parts.insert(number, (etag.clone(), body));
        Response::builder()
            .status(StatusCode::OK)
            .header(ETAG, format!("\"{etag}\""))
            .body(Bytes::new())
            .unwrap_or_else(|_| empty(StatusCode::INTERNAL_SERVER_ERROR))
    }

    fn complete(&mut self, upload_id: &str, body: &Bytes, now: DateTime<Utc>) -> Response<Bytes> {
        let Ok(request) = quick_xml::de::from_reader::<_, CompleteRequest>(body.as_ref()) else {
            return error(StatusCode::BAD_REQUEST, "MalformedXML", "complete request");
        };
        let Some(upload) = self.uploads.get(upload_id) else {
            return error(StatusCode::NOT_FOUND, "NoSuchUpload", "upload does not exist");
        };
        if request.part.is_empty() {
            return error(StatusCode::BAD_REQUEST, "MalformedXML", "no parts");
        }

        let mut payload = Vec::new();
        let mut digests = Vec::new();
        for part in &request.part {
            match upload.parts.get(&part.part_number) {
                Some((etag, bytes)) if *etag == strip_etag_quotes(&part.etag) => {
                    payload.extend_from_slice(bytes);
                    digests.extend(md5::compute(bytes).0);
                }
                _ => return error(StatusCode::BAD_REQUEST, "InvalidPart", "unknown part"),
            }
        }
        let etag = format!(
            "{}-{}",
            hex::encode(md5::compute(&digests).0),
            request.part.len()
        );

        let Some(upload) = self.uploads.remove(upload_id) else {
            return error(StatusCode::NOT_FOUND, "NoSuchUpload", "upload does not exist");
        };
        let body = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <CompleteMultipartUploadResult><Location>/{bucket}/{key}</Location>\
             <Bucket>{bucket}</Bucket><Key>{key}</Key><ETag>&quot;{etag}&quot;</ETag>\
             </CompleteMultipartUploadResult>",
            bucket = upload.bucket,
            key = upload.key,
        );
        self.put(&upload.bucket, upload.key, Bytes::from(payload), etag, now);
        xml(body)
    }
}

/// Rejects bodies whose `Content-MD5` or `x-amz-content-sha256` disagree
/// with the received bytes.
#[allow(clippy::result_large_err)]
fn check_integrity(headers: &HeaderMap, body: &Bytes) -> Result<(), Response<Bytes>> {
    let digest = Digest::compute(body);
    if let Some(md5) = headers.get("content-md5") {
        if md5.as_bytes() != digest.content_md5.as_bytes() {
            return Err(error(StatusCode::BAD_REQUEST, "BadDigest", "Content-MD5 mismatch"));
        }
    }
    match headers.get(CONTENT_SHA256_HEADER).map(HeaderValue::as_bytes) {
        Some(value) if value == UNSIGNED_PAYLOAD.as_bytes() => Ok(()),
        Some(value) if value != digest.payload_sha256.as_bytes() => Err(error(
            StatusCode::BAD_REQUEST,
            "XAmzContentSHA256Mismatch",
            "payload hash mismatch",
        )),
        _ => Ok(()),
    }
}

/// Inclusive bounds of a single `bytes=a-b` range within `len` bytes.
fn parse_range(range: &str, len: usize) -> Option<(usize, usize)> {
    let (start, end) = range.strip_prefix("bytes=")?.split_once('-')?;
    let start = start.parse::<usize>().ok()?;
    let end = end.parse::<usize>().ok()?.min(len.checked_sub(1)?);
    (start <= end).then_some((start, end))
}

fn header(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap()
}

fn empty(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

fn xml(body: String) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(body));
    response
        .headers_mut()
        .insert(http::header::CONTENT_TYPE, header("application/xml"));
    response
}

fn error(status: StatusCode, code: &str, message: &str) -> Response<Bytes> {
    let mut response = xml(format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <Error><Code>{code}</Code><Message>{message}</Message></Error>"
    ));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use http::{Request, StatusCode};
    use http_body_util::{BodyExt, Empty, Full};

    use super::{parse_range, MemoryS3};
    use crate::http::HttpClient;

    #[test]
    fn ranges() {
        assert_eq!(parse_range("bytes=0-9", 100), Some((0, 9)));
        assert_eq!(parse_range("bytes=90-200", 100), Some((90, 99)));
        assert_eq!(parse_range("bytes=5-4", 100), None);
        assert_eq!(parse_range("bytes=0-0", 0), None);
        assert_eq!(parse_range("items=0-1", 10), None);
    }

    #[tokio::test]
    async fn integrity_is_checked() {
        let s3 = MemoryS3::new();
        let request = Request::put("http://localhost/bucket")
            .body(Empty::<Bytes>::new())
            .unwrap();
        assert_eq!(
            s3.send_request(request).await.unwrap().status(),
            StatusCode::OK
        );

        let request = Request::put("http://localhost/bucket/key")
            .header("content-md5", "1B2M2Y8AsgTpgAmY7PhCfg==")
            .body(Full::new(Bytes::from_static(b"not empty")))
            .unwrap();
        let response = s3.send_request(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(std::str::from_utf8(&body).unwrap().contains("BadDigest"));
        assert_eq!(s3.object_count(), 0);
    }

    #[tokio::test]
    async fn jitter_overlaps_requests() {
        let s3 = MemoryS3::new().with_jitter(Duration::from_millis(20));
        let requests = (0..8).map(|_| {
            let s3 = s3.clone();
            tokio::spawn(async move {
                let request = Request::get("http://localhost/bucket/key")
                    .body(Empty::<Bytes>::new())
                    .unwrap();
                s3.send_request(request).await.unwrap().status()
            })
        });
        for status in futures_util::future::join_all(requests).await {
            assert_eq!(status.unwrap(), StatusCode::NOT_FOUND);
        }
        assert!(s3.peak_in_flight() > 1);
    }

    #[tokio::test]
    async fn lists_open_uploads() {
        let s3 = MemoryS3::new();
        let send = |method: &str, uri: &str| {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Empty::<Bytes>::new())
                .unwrap();
            let s3 = s3.clone();
            async move {
                let response = s3.send_request(request).await.unwrap();
                let status = response.status();
                let body = response.into_body().collect().await.unwrap().to_bytes();
                (status, String::from_utf8(body.to_vec()).unwrap())
            }
        };
        send("PUT", "http://localhost/bucket").await;
        send("POST", "http://localhost/bucket/a-1?uploads").await;
        send("POST", "http://localhost/bucket/b-1?uploads").await;

        let (status, body) = send("GET", "http://localhost/bucket?uploads&prefix=a-").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<Key>a-1</Key>"));
        assert!(!body.contains("<Key>b-1</Key>"));

        let (status, _) = send("GET", "http://localhost/missing?uploads").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
