use crate::config::AppConfig;
use crate::error::AppError;
use crate::metadata::PhotoRecord;
use crate::query::Query;
use crate::search::{IndexResponse, PhotoIndex};
use async_trait::async_trait;
use elasticsearch::{
    http::{
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    Elasticsearch, SearchParts, UpdateParts,
};
use serde_json::{json, Value};
use url::Url;

const SERVICE: &str = "search index";
/// Concurrent updates of one photo are serialized by the index.
const RETRY_ON_CONFLICT: i64 = 3;

pub struct ElasticsearchIndex {
    client: Elasticsearch,
    index_name: String,
}

impl ElasticsearchIndex {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        log::debug!("Creating Elasticsearch client for URL: {}", config.elasticsearch_url);
        let url = Url::parse(&config.elasticsearch_url)?;
        let conn_pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| AppError::Generic(format!("Elasticsearch transport: {}", e)))?;
        let client = Elasticsearch::new(transport);
        log::trace!("Elasticsearch client created successfully.");
        Ok(Self {
            client,
            index_name: config.index_name.clone(),
        })
    }
}

fn ensure_success(response: &Response) -> Result<(), AppError> {
    let status = response.status_code();
    if status.is_success() {
        Ok(())
    } else {
        Err(AppError::Upstream { service: SERVICE, status: status.as_u16() })
    }
}

fn match_query(query: &Query) -> Value {
    json!({
        "query": {
            "match": {
                query.field(): {
                    "query": query.text(),
                    "fuzziness": query.fuzziness().as_str()
                }
            }
        },
        "size": query.size()
    })
}

#[async_trait]
impl PhotoIndex for ElasticsearchIndex {
    async fn ensure_index_exists(&self) -> Result<(), AppError> {
        log::debug!("Checking if Elasticsearch index '{}' exists.", self.index_name);
        let index_exists = self
            .client
            .indices()
            .exists(elasticsearch::indices::IndicesExistsParts::Index(&[
                self.index_name.as_str(),
            ]))
            .send()
            .await?
            .status_code()
            .is_success();

        if !index_exists {
            log::info!("Elasticsearch index '{}' does not exist. Creating it.", self.index_name);
            let response = self
                .client
                .indices()
                .create(elasticsearch::indices::IndicesCreateParts::Index(
                    &self.index_name,
                ))
                .body(json!({
                    "mappings": {
                        "properties": {
                            "objectKey": { "type": "keyword" },
                            "container": { "type": "keyword" },
                            "labels": { "type": "text" },
                            "createdTimestamp": { "type": "date" }
                        }
                    }
                }))
                .send()
                .await?;
            ensure_success(&response)?;
            log::info!("Elasticsearch index '{}' created successfully.", self.index_name);
        } else {
            log::debug!("Elasticsearch index '{}' already exists.", self.index_name);
        }

        Ok(())
    }

    async fn upsert(&self, record: PhotoRecord) -> Result<(), AppError> {
        let doc_id = record.photo_ref().document_id();
        log::debug!("Upserting document {} in '{}'", doc_id, self.index_name);

        let response = self
            .client
            .update(UpdateParts::IndexId(&self.index_name, &doc_id))
            .retry_on_conflict(RETRY_ON_CONFLICT)
            .body(json!({
                "doc": {
                    "labels": &record.labels,
                    "createdTimestamp": record.created_timestamp,
                },
                "upsert": &record,
            }))
            .send()
            .await?;
        ensure_success(&response)?;

        let body = response.json::<Value>().await?;
        log::trace!("Elasticsearch update response: {:?}", body);
        Ok(())
    }

    async fn search(&self, query: &Query) -> Result<IndexResponse, AppError> {
        log::debug!("Searching Elasticsearch for photos with query: {}", query.text());
        let response = self
            .client
            .search(SearchParts::Index(&[self.index_name.as_str()]))
            .body(match_query(query))
            .send()
            .await?;
        ensure_success(&response)?;

        let body = response.json::<Value>().await?;
        log::trace!("Elasticsearch search response: {:?}", body);
        serde_json::from_value(body).map_err(|e| AppError::MalformedResponse {
            service: SERVICE,
            detail: e.to_string(),
        })
    }
}
