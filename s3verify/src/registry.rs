//! Fixtures shared between test cases.
//!
//! The registry is owned by the suite and lent `&mut` to one case at a time.
//! Inside a case only the orchestrator's aggregation step writes to it, so
//! no synchronization is needed: probe tasks never see the registry.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{kind} slot {index} is out of bounds ({len} reserved)")]
    OutOfBounds {
        kind: FixtureKind,
        index: usize,
        len: usize,
    },
    #[error("{kind} slot {index} was already published")]
    AlreadyPublished { kind: FixtureKind, index: usize },
    #[error("{kind} slot {index} was never published")]
    Unpublished { kind: FixtureKind, index: usize },
    #[error("part {part_number} of upload {index} was already recorded")]
    DuplicatePart { index: usize, part_number: u32 },
}

/// Categories of fixtures a test case can produce, consume or retire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FixtureKind {
    Bucket,
    Object,
    MultipartUpload,
    Part,
    MultipartObject,
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixtureKind::Bucket => "bucket",
            FixtureKind::Object => "object",
            FixtureKind::MultipartUpload => "multipart upload",
            FixtureKind::Part => "part",
            FixtureKind::MultipartObject => "multipart object",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub body: Bytes,
    /// Entity tag without the surrounding quotes.
    pub etag: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartUploadInfo {
    pub key: String,
    pub upload_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
    pub part_number: u32,
    pub etag: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

impl From<&PartInfo> for CompletedPart {
    fn from(part: &PartInfo) -> Self {
        Self {
            part_number: part.part_number,
            etag: part.etag.clone(),
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    name: String,
    value: Option<T>,
    retired: bool,
}

/// Append-only, write-once storage addressed by slot index.
#[derive(Debug)]
pub struct Slots<T> {
    kind: FixtureKind,
    slots: Vec<Slot<T>>,
}

impl<T> Slots<T> {
    pub fn new(kind: FixtureKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
        }
    }

    /// Appends one empty slot per name and returns the index of the first one.
    ///
    /// The name is the bucket name or object key the fixture is created
    /// under. It is recorded before any request is sent, so teardown can
    /// release a fixture the server created even if its slot is never
    /// published.
    pub fn reserve<I>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let base = self.slots.len();
        self.slots.extend(names.into_iter().map(|name| Slot {
            name,
            value: None,
            retired: false,
        }));
        base
    }

    pub fn publish(&mut self, index: usize, value: T) -> Result<(), RegistryError> {
        let kind = self.kind;
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(RegistryError::OutOfBounds { kind, index, len })?;
        if slot.value.is_some() {
            return Err(RegistryError::AlreadyPublished { kind, index });
        }
        slot.value = Some(value);
        Ok(())
    }

    /// Marks a published fixture as released. The value stays readable.
    pub fn retire(&mut self, index: usize) -> Result<(), RegistryError> {
        let kind = self.kind;
        match self.slots.get_mut(index) {
            Some(slot) if slot.value.is_some() => {
                slot.retired = true;
                Ok(())
            }
            Some(_) => Err(RegistryError::Unpublished { kind, index }),
            None => Err(RegistryError::OutOfBounds {
                kind,
                index,
                len: self.slots.len(),
            }),
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(|slot| slot.value.as_ref())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Published entries with their slot index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.value.as_ref().map(|value| (index, value)))
    }

    /// Reserved slots that were never published, with their reserved name.
    pub fn pending(&self) -> impl Iterator<Item = (usize, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_none())
            .map(|(index, slot)| (index, slot.name.as_str()))
    }

    /// Published entries that were not retired yet.
    pub fn live(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .filter(|_| !slot.retired)
                .map(|value| (index, value))
        })
    }
}

/// Buckets, objects, multipart uploads and parts created during one run.
#[derive(Debug)]
pub struct FixtureRegistry {
    pub buckets: Slots<BucketInfo>,
    pub objects: Slots<ObjectInfo>,
    pub uploads: Slots<MultipartUploadInfo>,
    pub multipart_objects: Slots<ObjectInfo>,
    parts: Vec<Vec<PartInfo>>,
}

impl Default for FixtureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self {
            buckets: Slots::new(FixtureKind::Bucket),
            objects: Slots::new(FixtureKind::Object),
            uploads: Slots::new(FixtureKind::MultipartUpload),
            multipart_objects: Slots::new(FixtureKind::MultipartObject),
            parts: Vec::new(),
        }
    }

    /// The bucket every object-level case works in.
    pub fn primary_bucket(&self) -> Option<&BucketInfo> {
        self.buckets.live().map(|(_, bucket)| bucket).next()
    }

    pub fn object(&self, key: &str) -> Option<&ObjectInfo> {
        self.objects
            .iter()
            .map(|(_, object)| object)
            .find(|object| object.key == key)
    }

    /// Records a part against the upload in slot `upload`, keeping the list
    /// ordered by part number.
    pub fn append_part(&mut self, upload: usize, part: PartInfo) -> Result<(), RegistryError> {
        if self.uploads.get(upload).is_none() {
            return Err(RegistryError::Unpublished {
                kind: FixtureKind::MultipartUpload,
                index: upload,
            });
        }
        if self.parts.len() <= upload {
            self.parts.resize_with(upload + 1, Vec::new);
        }
        let parts = &mut self.parts[upload];
        match parts.binary_search_by_key(&part.part_number, |p| p.part_number) {
            Ok(_) => Err(RegistryError::DuplicatePart {
                index: upload,
                part_number: part.part_number,
            }),
            Err(position) => {
                parts.insert(position, part);
                Ok(())
            }
        }
    }

    pub fn parts(&self, upload: usize) -> &[PartInfo] {
        self.parts.get(upload).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn completed_parts(&self, upload: usize) -> Vec<CompletedPart> {
        self.parts(upload).iter().map(CompletedPart::from).collect()
    }
}
