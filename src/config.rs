use serde::Deserialize;
use std::collections::HashSet;
use crate::error::AppError;
use config::{Config, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub engine: String,
    pub elasticsearch_url: String,
    pub index_name: String,
    pub tantivy_index_path: String,
    pub photo_root: String,
    pub allowed_extensions: HashSet<String>,
    pub public_url_template: String,
    pub detection_url: String,
    pub max_labels: usize,
    pub min_confidence: f32,
    pub nlu: NluConfig,
    pub search_size: usize,
    pub max_elicit_attempts: u32,
    pub work_queue_enabled: bool,
    pub web_port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NluConfig {
    pub url: String,
    pub bot_id: String,
    pub bot_alias_id: String,
    pub locale_id: String,
    pub session_id: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, AppError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PHOTO_FINDER").separator("__"))
            .build()?;

        Ok(s.try_deserialize()?)
    }
}

#[cfg(test)]
impl AppConfig {
    /// Configuration used by unit tests; mirrors `config/default.toml`.
    pub fn for_tests() -> Self {
        Self {
            engine: "tantivy".into(),
            elasticsearch_url: "http://localhost:9200".into(),
            index_name: "photos".into(),
            tantivy_index_path: "./data/index".into(),
            photo_root: "./data/photos".into(),
            allowed_extensions: ["jpg", "jpeg", "png"].iter().map(|s| s.to_string()).collect(),
            public_url_template: "https://{container}.s3.amazonaws.com/{key}".into(),
            detection_url: "http://localhost:8081/detect-labels".into(),
            max_labels: 10,
            min_confidence: 90.0,
            nlu: NluConfig {
                url: "http://localhost:8082/recognize-text".into(),
                bot_id: "photo-bot".into(),
                bot_alias_id: "TSTALIASID".into(),
                locale_id: "en_US".into(),
                session_id: "photo-search".into(),
            },
            search_size: 100,
            max_elicit_attempts: 3,
            work_queue_enabled: false,
            web_port: 8080,
            log_level: "info".into(),
        }
    }
}
