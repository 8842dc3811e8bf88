use crate::error::AppError;
use crate::metadata::SearchResult;
use crate::query::QueryBuilder;
use crate::search::SearchExecutor;
use crate::services::nlu::TextInterpreter;
use serde::Serialize;
use std::sync::Arc;

pub const NO_LABELS_MESSAGE: &str = "Please provide at least a label";

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchResponse {
    pub fn advisory(message: &str) -> Self {
        Self {
            results: Vec::new(),
            message: Some(message.to_string()),
        }
    }
}

/// Free text in, photos out.
pub struct SearchOrchestrator {
    interpreter: Arc<dyn TextInterpreter>,
    queries: QueryBuilder,
    executor: SearchExecutor,
}

impl SearchOrchestrator {
    pub fn new(interpreter: Arc<dyn TextInterpreter>, queries: QueryBuilder, executor: SearchExecutor) -> Self {
        Self {
            interpreter,
            queries,
            executor,
        }
    }

    pub async fn respond(&self, text: &str) -> Result<SearchResponse, AppError> {
        let labels = self.interpreter.recognize_text(text).await?.labels();
        log::info!("Extracted labels: {:?}", labels);

        let Some(query) = self.queries.build(&labels) else {
            log::info!("No labels in '{}', skipping search", text);
            return Ok(SearchResponse::advisory(NO_LABELS_MESSAGE));
        };

        let results = self.executor.execute(&query).await?;
        Ok(SearchResponse { results, message: None })
    }
}
