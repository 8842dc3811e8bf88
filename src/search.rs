use crate::error::AppError;
use crate::metadata::{PhotoRecord, SearchResult};
use crate::query::Query;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use url::{form_urlencoded, Url};

#[async_trait]
pub trait PhotoIndex: Send + Sync {
    async fn ensure_index_exists(&self) -> Result<(), AppError>;
    /// Partial update of the record keyed by its identity, inserting it when absent.
    async fn upsert(&self, record: PhotoRecord) -> Result<(), AppError>;
    async fn search(&self, query: &Query) -> Result<IndexResponse, AppError>;
}

/// Search response as returned by the index. Both levels of `hits` may be
/// missing; that is read as "no matches".
#[derive(Debug, Default, Deserialize)]
pub struct IndexResponse {
    pub hits: Option<Hits>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Hits {
    pub hits: Option<Vec<Hit>>,
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_source")]
    pub source: PhotoRecord,
}

impl IndexResponse {
    pub fn from_records(records: Vec<PhotoRecord>) -> Self {
        Self {
            hits: Some(Hits {
                hits: Some(records.into_iter().map(|source| Hit { source }).collect()),
            }),
        }
    }

    pub fn into_records(self) -> Option<Vec<PhotoRecord>> {
        let hits = self.hits?.hits?;
        Some(hits.into_iter().map(|hit| hit.source).collect())
    }
}

/// Builds the public URL of a photo from a template with `{container}` and
/// `{key}` placeholders.
#[derive(Debug, Clone)]
pub struct PublicUrlResolver {
    template: String,
}

impl PublicUrlResolver {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    pub fn resolve(&self, container: &str, object_key: &str) -> Result<String, AppError> {
        let raw = self
            .template
            .replace("{container}", container)
            .replace("{key}", &encode_key(object_key));
        Ok(Url::parse(&raw)?.to_string())
    }
}

/// Percent-encodes every `/`-separated segment of an object key, so `#`, `?`
/// and `%` stay part of the path.
fn encode_key(object_key: &str) -> String {
    object_key
        .split('/')
        .map(|segment| {
            form_urlencoded::byte_serialize(segment.as_bytes())
                .collect::<String>()
                .replace('+', "%20")
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub struct SearchExecutor {
    index: Arc<dyn PhotoIndex>,
    urls: PublicUrlResolver,
}

impl SearchExecutor {
    pub fn new(index: Arc<dyn PhotoIndex>, urls: PublicUrlResolver) -> Self {
        Self { index, urls }
    }

    /// Runs `query` and maps hits in the index's relevance order.
    pub async fn execute(&self, query: &Query) -> Result<Vec<SearchResult>, AppError> {
        log::info!("Searching for {}", query.text());
        let response = self.index.search(query).await?;

        let records = match response.into_records() {
            Some(records) => records,
            None => {
                log::warn!("Search response carried no hits for query: {}", query.text());
                return Ok(Vec::new());
            }
        };

        let results: Vec<SearchResult> = records
            .into_iter()
            .filter_map(|record| match self.urls.resolve(&record.container, &record.object_key) {
                Ok(url) => Some(SearchResult { url, labels: record.labels }),
                Err(e) => {
                    log::warn!("Skipping {}/{}: {}", record.container, record.object_key, e);
                    None
                }
            })
            .collect();
        log::debug!("Found {} photos for query: {}", results.len(), query.text());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSet;
    use crate::metadata::PhotoRef;
    use crate::query::QueryBuilder;
    use crate::testing::MemoryIndex;

    fn executor(index: Arc<MemoryIndex>) -> SearchExecutor {
        SearchExecutor::new(index, PublicUrlResolver::new("https://{container}.s3.amazonaws.com/{key}"))
    }

    fn query(labels: &[&str]) -> Query {
        let labels: LabelSet = labels.iter().collect();
        QueryBuilder::new(100).build(&labels).unwrap()
    }

    #[tokio::test]
    async fn maps_hits_to_public_urls() {
        let index = Arc::new(MemoryIndex::default());
        index
            .upsert(PhotoRecord::new(
                PhotoRef::new("bucket1", "img1.jpg"),
                ["cat", "pet"].into_iter().collect(),
            ))
            .await
            .unwrap();

        let results = executor(index.clone()).execute(&query(&["cat"])).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://bucket1.s3.amazonaws.com/img1.jpg");
        assert_eq!(results[0].labels.iter().collect::<Vec<_>>(), vec!["cat", "pet"]);
        assert_eq!(index.searches().len(), 1);
    }

    #[tokio::test]
    async fn missing_hits_is_an_empty_result() {
        let index = Arc::new(MemoryIndex::default());
        index.respond_with(IndexResponse::default());

        let results = executor(index).execute(&query(&["cat"])).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn missing_inner_hits_decodes_as_no_records() {
        let response: IndexResponse = serde_json::from_str(r#"{"hits": {"total": 0}}"#).unwrap();
        assert!(response.into_records().is_none());

        let response: IndexResponse = serde_json::from_str(r#"{"took": 3}"#).unwrap();
        assert!(response.into_records().is_none());
    }

    #[test]
    fn public_urls_encode_keys() {
        let urls = PublicUrlResolver::new("https://photos.example.com/{container}/{key}");
        assert_eq!(
            urls.resolve("bucket1", "summer trip.jpg").unwrap(),
            "https://photos.example.com/bucket1/summer%20trip.jpg"
        );
    }

    #[test]
    fn reserved_characters_stay_in_the_key() {
        let urls = PublicUrlResolver::new("https://{container}.s3.amazonaws.com/{key}");
        let cases = [
            ("summer#1.jpg", "https://bucket1.s3.amazonaws.com/summer%231.jpg"),
            ("what?.jpg", "https://bucket1.s3.amazonaws.com/what%3F.jpg"),
            ("a%20b.jpg", "https://bucket1.s3.amazonaws.com/a%2520b.jpg"),
            ("a+b.jpg", "https://bucket1.s3.amazonaws.com/a%2Bb.jpg"),
            ("2024/trip/beach day.jpg", "https://bucket1.s3.amazonaws.com/2024/trip/beach%20day.jpg"),
        ];
        for (key, expected) in cases {
            let url = urls.resolve("bucket1", key).unwrap();
            assert_eq!(url, expected);

            let parsed = Url::parse(&url).unwrap();
            assert_eq!(parsed.query(), None);
            assert_eq!(parsed.fragment(), None);
        }
    }

    #[tokio::test]
    async fn unresolvable_hit_does_not_hide_the_others() {
        let index = Arc::new(MemoryIndex::default());
        index
            .upsert(PhotoRecord::new(PhotoRef::new("bad host", "img1.jpg"), ["cat"].into_iter().collect()))
            .await
            .unwrap();
        index
            .upsert(PhotoRecord::new(PhotoRef::new("bucket1", "img2.jpg"), ["cat"].into_iter().collect()))
            .await
            .unwrap();

        let results = executor(index).execute(&query(&["cat"])).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://bucket1.s3.amazonaws.com/img2.jpg");
    }
}
