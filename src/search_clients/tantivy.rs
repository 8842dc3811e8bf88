use crate::config::AppConfig;
use crate::error::AppError;
use crate::labels::LabelSet;
use crate::metadata::PhotoRecord;
use crate::query::Query;
use crate::search::{IndexResponse, PhotoIndex};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query as TantivyQuery};
use tantivy::schema::{Document, Field, Schema, Term, STORED, STRING, TEXT};
use tantivy::{Index, IndexWriter};

const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Clone, Copy)]
struct Fields {
    doc_id: Field,
    object_key: Field,
    container: Field,
    labels: Field,
    created_timestamp: Field,
}

impl Fields {
    fn from_schema(schema: &Schema) -> Result<Self, AppError> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .ok_or_else(|| AppError::Generic(format!("Tantivy schema lacks field '{}'", name)))
        };
        Ok(Self {
            doc_id: field("doc_id")?,
            object_key: field("object_key")?,
            container: field("container")?,
            labels: field("labels")?,
            created_timestamp: field("created_timestamp")?,
        })
    }
}

/// Embedded index. One writer is shared by all upserts; each upsert replaces
/// the document with the same `(container, object_key)` id and commits.
pub struct TantivyIndex {
    index: Index,
    fields: Fields,
    writer: Arc<Mutex<IndexWriter>>,
}

fn schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field("doc_id", STRING);
    schema_builder.add_text_field("object_key", STRING | STORED);
    schema_builder.add_text_field("container", STRING | STORED);
    schema_builder.add_text_field("labels", TEXT | STORED);
    schema_builder.add_text_field("created_timestamp", STORED);
    schema_builder.build()
}

impl TantivyIndex {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let index_path = &config.tantivy_index_path;
        log::debug!("Initializing Tantivy index at path: {}", index_path);

        let index = match Index::open_in_dir(index_path) {
            Ok(index) => index,
            Err(_) => {
                log::info!("Tantivy index not found at {}. Creating new index.", index_path);
                std::fs::create_dir_all(index_path)?;
                Index::create_in_dir(index_path, schema())?
            }
        };
        Self::from_index(index)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, AppError> {
        Self::from_index(Index::create_in_ram(schema()))
    }

    fn from_index(index: Index) -> Result<Self, AppError> {
        let fields = Fields::from_schema(&index.schema())?;
        let writer = index.writer(WRITER_HEAP_BYTES)?;
        log::debug!("Tantivy index initialized successfully.");
        Ok(Self {
            index,
            fields,
            writer: Arc::new(Mutex::new(writer)),
        })
    }
}

/// Labels are tokenized like the `labels` field so every token becomes one
/// fuzzy clause; any clause matching is enough.
fn build_query(fields: &Fields, query: &Query) -> Box<dyn TantivyQuery> {
    let fuzziness = query.fuzziness();
    let clauses: Vec<(Occur, Box<dyn TantivyQuery>)> = query
        .terms()
        .iter()
        .flat_map(|label| {
            label
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
        })
        .map(|term| {
            let distance = fuzziness.max_edits(&term);
            let fuzzy = FuzzyTermQuery::new(Term::from_field_text(fields.labels, &term), distance, true);
            (Occur::Should, Box::new(fuzzy) as Box<dyn TantivyQuery>)
        })
        .collect();
    Box::new(BooleanQuery::new(clauses))
}

fn to_record(fields: &Fields, doc: &Document) -> PhotoRecord {
    let text = |field: Field| {
        doc.get_first(field)
            .and_then(|v| v.as_text())
            .unwrap_or("")
            .to_string()
    };
    let labels: LabelSet = doc.get_all(fields.labels).filter_map(|v| v.as_text()).collect();
    let created_timestamp = DateTime::parse_from_rfc3339(&text(fields.created_timestamp))
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_default();
    PhotoRecord {
        object_key: text(fields.object_key),
        container: text(fields.container),
        labels,
        created_timestamp,
    }
}

#[async_trait]
impl PhotoIndex for TantivyIndex {
    async fn ensure_index_exists(&self) -> Result<(), AppError> {
        log::debug!("Tantivy index existence is handled during initialization.");
        Ok(())
    }

    async fn upsert(&self, record: PhotoRecord) -> Result<(), AppError> {
        let fields = self.fields;
        let writer = self.writer.clone();

        tokio::task::spawn_blocking(move || {
            let doc_id = record.photo_ref().document_id();
            log::debug!("Upserting document {}", doc_id);

            let mut doc = Document::default();
            doc.add_text(fields.doc_id, &doc_id);
            doc.add_text(fields.object_key, &record.object_key);
            doc.add_text(fields.container, &record.container);
            for label in record.labels.iter() {
                doc.add_text(fields.labels, label);
            }
            doc.add_text(fields.created_timestamp, &record.created_timestamp.to_rfc3339());

            let mut writer = writer
                .lock()
                .map_err(|_| AppError::Generic("Tantivy writer lock poisoned".into()))?;
            writer.delete_term(Term::from_field_text(fields.doc_id, &doc_id));
            writer.add_document(doc)?;
            writer.commit()?;
            log::trace!("Tantivy index writer committed changes.");
            Ok(())
        })
        .await?
    }

    async fn search(&self, query: &Query) -> Result<IndexResponse, AppError> {
        let index = self.index.clone();
        let fields = self.fields;
        let query = query.clone();

        tokio::task::spawn_blocking(move || {
            log::debug!("Searching Tantivy for photos with query: {}", query.text());
            let searcher = index.reader()?.searcher();
            let tantivy_query = build_query(&fields, &query);
            let top_docs = searcher.search(&*tantivy_query, &TopDocs::with_limit(query.size().max(1)))?;

            let mut records = Vec::with_capacity(top_docs.len());
            for (_score, doc_address) in top_docs {
                let doc = searcher.doc(doc_address)?;
                records.push(to_record(&fields, &doc));
            }
            log::debug!("Found {} photos in Tantivy for query: {}", records.len(), query.text());
            Ok(IndexResponse::from_records(records))
        })
        .await?
    }
}
