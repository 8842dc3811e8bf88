use crate::metadata::PhotoRef;
use serde::Deserialize;

/// Upload notification carrying one or more stored objects.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

impl StorageEvent {
    /// Photos in notification order. Keys arrive form-encoded (`+` for spaces).
    pub fn photos(&self) -> Vec<PhotoRef> {
        self.records
            .iter()
            .map(|record| PhotoRef::new(&record.s3.bucket.name, decode_key(&record.s3.object.key)))
            .collect()
    }
}

fn decode_key(key: &str) -> String {
    url::form_urlencoded::parse(key.as_bytes())
        .map(|(name, value)| {
            if value.is_empty() {
                name.into_owned()
            } else {
                format!("{}={}", name, value)
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}
