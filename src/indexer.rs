use crate::error::AppError;
use crate::events::StorageEvent;
use crate::extractor::LabelExtractor;
use crate::metadata::{PhotoRecord, PhotoRef};
use crate::search::PhotoIndex;
use std::sync::Arc;

pub struct IndexWriter {
    index: Arc<dyn PhotoIndex>,
}

impl IndexWriter {
    pub fn new(index: Arc<dyn PhotoIndex>) -> Self {
        Self { index }
    }

    /// One keyed write; errors are returned to the caller without retrying.
    pub async fn upsert(&self, record: PhotoRecord) -> Result<(), AppError> {
        let photo = record.photo_ref();
        log::debug!("Upserting {} with {} labels", photo, record.labels.len());
        self.index.upsert(record).await?;
        log::debug!("Indexed {}", photo);
        Ok(())
    }
}

/// Upload path: label extraction followed by an index upsert per photo.
pub struct Ingestor {
    extractor: LabelExtractor,
    writer: IndexWriter,
}

impl Ingestor {
    pub fn new(extractor: LabelExtractor, writer: IndexWriter) -> Self {
        Self { extractor, writer }
    }

    pub async fn ingest(&self, photo: PhotoRef) -> Result<(), AppError> {
        log::info!("Received photo: {}", photo);
        let labels = self.extractor.extract(&photo).await?;
        log::info!("Attached labels: {:?}", labels);
        self.writer.upsert(PhotoRecord::new(photo, labels)).await
    }

    /// Handles notifications in order, stopping at the first failure so the
    /// event can be redelivered.
    pub async fn handle_event(&self, event: &StorageEvent) -> Result<usize, AppError> {
        let photos = event.photos();
        log::info!("Storage event with {} photos", photos.len());
        let count = photos.len();
        for photo in photos {
            self.ingest(photo).await?;
        }
        Ok(count)
    }
}

/// Consumes photos from the walker until the channel closes. Failed photos
/// are logged and skipped.
pub fn start_indexing(
    ingestor: Arc<Ingestor>,
    photos_rx: crossbeam_channel::Receiver<PhotoRef>,
    runtime: tokio::runtime::Handle,
) -> Result<usize, AppError> {
    log::info!("Starting photo indexing");

    let mut indexed = 0;
    for photo in photos_rx {
        let description = photo.to_string();
        match runtime.block_on(ingestor.ingest(photo)) {
            Ok(()) => indexed += 1,
            Err(e) => log::warn!("Failed to index {}: {}", description, e),
        }
    }

    log::info!("Indexed {} photos.", indexed);
    Ok(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::testing::{labels, FakeDetector, FakeStore, MemoryIndex};
    use serde_json::json;

    fn ingestor(index: Arc<MemoryIndex>, detector: FakeDetector) -> Ingestor {
        let extractor = LabelExtractor::new(&AppConfig::for_tests(), Arc::new(FakeStore::default()), Arc::new(detector));
        Ingestor::new(extractor, IndexWriter::new(index))
    }

    fn event(keys: &[&str]) -> StorageEvent {
        let records: Vec<_> = keys
            .iter()
            .map(|key| json!({ "s3": { "bucket": { "name": "bucket1" }, "object": { "key": key } } }))
            .collect();
        serde_json::from_value(json!({ "Records": records })).unwrap()
    }

    #[tokio::test]
    async fn upload_event_indexes_detected_labels() {
        let index = Arc::new(MemoryIndex::default());
        let ingestor = ingestor(index.clone(), FakeDetector::returning(&[("cat", 95.0), ("pet", 91.0), ("outdoor", 80.0)]));

        let count = ingestor.handle_event(&event(&["img1.jpg"])).await.unwrap();

        let photo = PhotoRef::new("bucket1", "img1.jpg");
        assert_eq!(count, 1);
        assert_eq!(index.upserts(), vec![photo.clone()]);
        assert_eq!(index.record(&photo).unwrap().labels, labels(&["cat", "pet"]));
    }

    #[tokio::test]
    async fn reindexing_updates_in_place() {
        let index = Arc::new(MemoryIndex::default());
        let ingestor = ingestor(index.clone(), FakeDetector::returning(&[("cat", 95.0)]));
        let photo = PhotoRef::new("bucket1", "img1.jpg");

        ingestor.ingest(photo.clone()).await.unwrap();
        let first = index.record(&photo).unwrap();
        ingestor.ingest(photo.clone()).await.unwrap();
        let second = index.record(&photo).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(first.labels, second.labels);
        assert_eq!(second.labels.len(), 1);
        assert!(second.created_timestamp >= first.created_timestamp);
    }

    #[tokio::test]
    async fn write_failure_stops_the_event() {
        let index = Arc::new(MemoryIndex::default());
        index.fail_with(503);
        let ingestor = ingestor(index.clone(), FakeDetector::returning(&[("cat", 95.0)]));

        let err = ingestor.handle_event(&event(&["img1.jpg", "img2.jpg"])).await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(index.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn channel_consumer_indexes_every_photo() {
        let index = Arc::new(MemoryIndex::default());
        let ingestor = Arc::new(ingestor(index.clone(), FakeDetector::returning(&[("cat", 95.0)])));
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(PhotoRef::new("bucket1", "img1.jpg")).unwrap();
        tx.send(PhotoRef::new("bucket1", "img2.jpg")).unwrap();
        drop(tx);

        let handle = tokio::runtime::Handle::current();
        let indexed = tokio::task::spawn_blocking(move || start_indexing(ingestor, rx, handle))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(indexed, 2);
        assert_eq!(index.len(), 2);
    }
}
