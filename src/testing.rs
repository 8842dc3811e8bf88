//! In-memory collaborators for unit tests.

use crate::dialog::{RecognizedText, Slot};
use crate::error::AppError;
use crate::labels::LabelSet;
use crate::metadata::{PhotoRecord, PhotoRef};
use crate::query::Query;
use crate::search::{IndexResponse, PhotoIndex};
use crate::services::detection::{DetectedLabel, LabelDetector};
use crate::services::nlu::TextInterpreter;
use crate::services::queue::WorkQueue;
use crate::services::storage::PhotoStore;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Exact, case-insensitive label matching over records kept in insertion order.
#[derive(Default)]
pub struct MemoryIndex {
    records: Mutex<IndexMap<String, PhotoRecord>>,
    upserts: Mutex<Vec<PhotoRef>>,
    searches: Mutex<Vec<Query>>,
    canned: Mutex<Option<IndexResponse>>,
    fail_with_status: Mutex<Option<u16>>,
}

impl MemoryIndex {
    pub fn respond_with(&self, response: IndexResponse) {
        *self.canned.lock().unwrap() = Some(response);
    }

    pub fn fail_with(&self, status: u16) {
        *self.fail_with_status.lock().unwrap() = Some(status);
    }

    pub fn record(&self, photo: &PhotoRef) -> Option<PhotoRecord> {
        self.records.lock().unwrap().get(&photo.document_id()).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn upserts(&self) -> Vec<PhotoRef> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<Query> {
        self.searches.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), AppError> {
        match *self.fail_with_status.lock().unwrap() {
            Some(status) => Err(AppError::Upstream { service: "search index", status }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PhotoIndex for MemoryIndex {
    async fn ensure_index_exists(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn upsert(&self, record: PhotoRecord) -> Result<(), AppError> {
        self.check_failure()?;
        self.upserts.lock().unwrap().push(record.photo_ref());
        self.records.lock().unwrap().insert(record.photo_ref().document_id(), record);
        Ok(())
    }

    async fn search(&self, query: &Query) -> Result<IndexResponse, AppError> {
        self.searches.lock().unwrap().push(query.clone());
        self.check_failure()?;
        if let Some(canned) = self.canned.lock().unwrap().take() {
            return Ok(canned);
        }
        let matches = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|record| {
                query.terms().iter().any(|term| {
                    record.labels.iter().any(|label| label.eq_ignore_ascii_case(term))
                })
            })
            .cloned()
            .collect();
        Ok(IndexResponse::from_records(matches))
    }
}

#[derive(Default)]
pub struct FakeDetector {
    labels: Vec<DetectedLabel>,
    unavailable: bool,
    calls: Mutex<Vec<(PhotoRef, usize, f32)>>,
}

impl FakeDetector {
    pub fn returning(labels: &[(&str, f32)]) -> Self {
        Self {
            labels: labels
                .iter()
                .map(|(name, confidence)| DetectedLabel {
                    name: name.to_string(),
                    confidence: *confidence,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Default::default() }
    }

    pub fn calls(&self) -> Vec<(PhotoRef, usize, f32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LabelDetector for FakeDetector {
    async fn detect_labels(
        &self,
        photo: &PhotoRef,
        max_labels: usize,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>, AppError> {
        self.calls.lock().unwrap().push((photo.clone(), max_labels, min_confidence));
        if self.unavailable {
            return Err(AppError::Upstream { service: "label detection", status: 503 });
        }
        Ok(self.labels.clone())
    }
}

/// Operator metadata keyed by object key.
#[derive(Default)]
pub struct FakeStore {
    custom_labels: HashMap<String, String>,
}

impl FakeStore {
    pub fn with_labels(object_key: &str, custom_labels: &str) -> Self {
        let mut store = Self::default();
        store.custom_labels.insert(object_key.to_string(), custom_labels.to_string());
        store
    }
}

#[async_trait]
impl PhotoStore for FakeStore {
    async fn custom_labels(&self, photo: &PhotoRef) -> Result<Option<String>, AppError> {
        Ok(self.custom_labels.get(&photo.object_key).cloned())
    }
}

/// Maps whole input texts to the slots an NLU engine would fill.
#[derive(Default)]
pub struct FakeInterpreter {
    responses: HashMap<String, BTreeMap<String, Option<Slot>>>,
}

impl FakeInterpreter {
    pub fn with(mut self, text: &str, slots: &[(&str, Option<&str>)]) -> Self {
        let slots = slots
            .iter()
            .map(|(name, value)| (name.to_string(), value.map(Slot::with_value)))
            .collect();
        self.responses.insert(text.to_string(), slots);
        self
    }
}

#[async_trait]
impl TextInterpreter for FakeInterpreter {
    async fn recognize_text(&self, text: &str) -> Result<RecognizedText, AppError> {
        let slots = self.responses.get(text).cloned().unwrap_or_default();
        Ok(RecognizedText::new(slots))
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    payloads: Mutex<Vec<String>>,
}

impl RecordingQueue {
    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

impl WorkQueue for RecordingQueue {
    fn enqueue(&self, payload: String) -> Result<(), AppError> {
        self.payloads.lock().unwrap().push(payload);
        Ok(())
    }
}

pub fn labels(values: &[&str]) -> LabelSet {
    values.iter().collect()
}
