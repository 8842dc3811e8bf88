use crate::config::AppConfig;
use crate::error::AppError;
use crate::labels::LabelSet;
use crate::metadata::PhotoRef;
use crate::services::detection::LabelDetector;
use crate::services::storage::PhotoStore;
use std::sync::Arc;

/// Collects a photo's labels from operator metadata and label detection.
pub struct LabelExtractor {
    store: Arc<dyn PhotoStore>,
    detector: Arc<dyn LabelDetector>,
    max_labels: usize,
    min_confidence: f32,
}

impl LabelExtractor {
    pub fn new(config: &AppConfig, store: Arc<dyn PhotoStore>, detector: Arc<dyn LabelDetector>) -> Self {
        Self {
            store,
            detector,
            max_labels: config.max_labels,
            min_confidence: config.min_confidence,
        }
    }

    pub async fn extract(&self, photo: &PhotoRef) -> Result<LabelSet, AppError> {
        log::trace!("Reading custom labels for {}", photo);
        let mut labels = match self.store.custom_labels(photo).await? {
            Some(raw) => LabelSet::parse_comma_separated(&raw),
            None => LabelSet::new(),
        };
        log::debug!("Custom labels for {}: {:?}", photo, labels);

        let detected: LabelSet = self
            .detector
            .detect_labels(photo, self.max_labels, self.min_confidence)
            .await?
            .into_iter()
            .filter(|label| label.confidence >= self.min_confidence)
            .take(self.max_labels)
            .map(|label| label.name)
            .collect();
        log::debug!("Detected labels for {}: {:?}", photo, detected);

        labels.merge(detected);
        Ok(labels)
    }
}
