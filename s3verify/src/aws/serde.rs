use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct InitiateMultipartUploadResult {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

#[derive(Default, Debug, Serialize)]
#[serde(default, rename = "CompleteMultipartUpload", rename_all = "PascalCase")]
pub struct CompleteMultipartUploadRequest {
    pub part: Vec<CompleteMultipartUploadRequestPart>,
}

#[derive(Clone, Default, Debug, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CompleteMultipartUploadRequestPart {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    #[serde(rename = "ETag")]
    pub etag: String,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CompleteMultipartUploadResult {
    pub location: String,
    pub bucket: String,
    pub key: String,
    #[serde(rename = "ETag")]
    pub etag: String,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListMultipartUploadsResult {
    pub bucket: String,
    pub prefix: String,
    pub is_truncated: bool,
    pub upload: Vec<ListedUpload>,
}

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListedUpload {
    pub key: String,
    pub upload_id: String,
}

#[derive(Default, Debug, Serialize)]
#[serde(rename = "CreateBucketConfiguration", rename_all = "PascalCase")]
pub struct CreateBucketConfiguration {
    pub location_constraint: String,
}

#[cfg(test)]
mod tests {
    use super::{
        CompleteMultipartUploadRequest, CompleteMultipartUploadRequestPart,
        CompleteMultipartUploadResult, InitiateMultipartUploadResult, ListMultipartUploadsResult,
    };

    #[test]
    fn encode_complete_request() {
        let request = CompleteMultipartUploadRequest {
            part: vec![
                CompleteMultipartUploadRequestPart {
                    part_number: 1,
                    etag: "a".into(),
                },
                CompleteMultipartUploadRequestPart {
                    part_number: 2,
                    etag: "b".into(),
                },
            ],
        };
        let xml = quick_xml::se::to_string(&request).unwrap();
        assert_eq!(
            xml,
            "<CompleteMultipartUpload>\
             <Part><PartNumber>1</PartNumber><ETag>a</ETag></Part>\
             <Part><PartNumber>2</PartNumber><ETag>b</ETag></Part>\
             </CompleteMultipartUpload>"
        );
    }

    #[test]
    fn decode_results() {
        let initiate: InitiateMultipartUploadResult = quick_xml::de::from_str(
            "<InitiateMultipartUploadResult><Bucket>b</Bucket><Key>k</Key>\
             <UploadId>VXBsb2FkIElE</UploadId></InitiateMultipartUploadResult>",
        )
        .unwrap();
        assert_eq!(initiate.upload_id, "VXBsb2FkIElE");

        let complete: CompleteMultipartUploadResult = quick_xml::de::from_str(
            "<CompleteMultipartUploadResult><Location>http://s3/b/k</Location>\
             <Bucket>b</Bucket><Key>k</Key><ETag>\"3858f6-2\"</ETag>\
             </CompleteMultipartUploadResult>",
        )
        .unwrap();
        assert_eq!(complete.key, "k");
        assert_eq!(complete.etag, "\"3858f6-2\"");
    }

    #[test]
    fn decode_upload_listing() {
        let listing: ListMultipartUploadsResult = quick_xml::de::from_str(
            "<ListMultipartUploadsResult><Bucket>b</Bucket><Prefix>k</Prefix>\
             <IsTruncated>false</IsTruncated>\
             <Upload><Key>k</Key><UploadId>one</UploadId></Upload>\
             <Upload><Key>k2</Key><UploadId>two</UploadId></Upload>\
             </ListMultipartUploadsResult>",
        )
        .unwrap();
        assert_eq!(listing.prefix, "k");
        assert!(!listing.is_truncated);
        assert_eq!(
            listing
                .upload
                .iter()
                .map(|upload| (upload.key.as_str(), upload.upload_id.as_str()))
                .collect::<Vec<_>>(),
            vec![("k", "one"), ("k2", "two")]
        );

        let empty: ListMultipartUploadsResult =
            quick_xml::de::from_str("<ListMultipartUploadsResult></ListMultipartUploadsResult>")
                .unwrap();
        assert!(empty.upload.is_empty());
    }
}
