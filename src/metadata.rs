// src/metadata.rs

use crate::labels::LabelSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a stored photo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRef {
    pub container: String,
    pub object_key: String,
}

impl PhotoRef {
    pub fn new(container: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            object_key: object_key.into(),
        }
    }

    /// Index document id; unique per `(container, object_key)`.
    pub fn document_id(&self) -> String {
        format!("{}/{}", self.container, self.object_key)
    }
}

impl fmt::Display for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.object_key)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub object_key: String,
    pub container: String,
    pub labels: LabelSet,
    /// Time of the most recent indexing of this photo.
    pub created_timestamp: DateTime<Utc>,
}

impl PhotoRecord {
    pub fn new(photo: PhotoRef, labels: LabelSet) -> Self {
        Self {
            object_key: photo.object_key,
            container: photo.container,
            labels,
            created_timestamp: Utc::now(),
        }
    }

    pub fn photo_ref(&self) -> PhotoRef {
        PhotoRef::new(&self.container, &self.object_key)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchResult {
    pub url: String,
    pub labels: LabelSet,
}
