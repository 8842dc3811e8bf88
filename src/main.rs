mod config;
mod dialog;
mod error;
mod events;
mod extractor;
mod indexer;
mod labels;
mod metadata;
mod orchestrator;
mod query;
mod search;
mod search_clients;
mod services;
mod walker;
mod web_server;

#[cfg(test)]
mod testing;

use crate::config::AppConfig;
use crate::dialog::DialogStateMachine;
use crate::extractor::LabelExtractor;
use crate::indexer::{IndexWriter, Ingestor};
use crate::metadata::PhotoRef;
use crate::orchestrator::SearchOrchestrator;
use crate::query::QueryBuilder;
use crate::search::{PhotoIndex, PublicUrlResolver, SearchExecutor};
use crate::search_clients::{elasticsearch::ElasticsearchIndex, tantivy::TantivyIndex};
use crate::services::detection::HttpLabelDetector;
use crate::services::nlu::HttpTextInterpreter;
use crate::services::queue::{self, ChannelWorkQueue};
use crate::services::storage::LocalPhotoStore;
use crate::web_server::AppState;
use actix_web::web;
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "photo_finder", about = "Label-indexed photo search")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Index a single stored photo
    Ingest { container: String, key: String },
    /// Index every photo found in a container directory
    Scan { container: String },
    /// Run a free-text search and print the results as JSON
    Search { text: String },
}

fn build_index(config: &AppConfig) -> Result<Arc<dyn PhotoIndex>> {
    let index: Arc<dyn PhotoIndex> = match config.engine.as_str() {
        "elasticsearch" => Arc::new(ElasticsearchIndex::new(config)?),
        "tantivy" => Arc::new(TantivyIndex::new(config)?),
        other => anyhow::bail!("Unknown search engine '{}', expected 'elasticsearch' or 'tantivy'", other),
    };
    Ok(index)
}

fn build_ingestor(config: &AppConfig, index: Arc<dyn PhotoIndex>) -> Result<Ingestor> {
    let extractor = LabelExtractor::new(
        config,
        Arc::new(LocalPhotoStore::new(&config.photo_root)),
        Arc::new(HttpLabelDetector::new(&config.detection_url)?),
    );
    Ok(Ingestor::new(extractor, IndexWriter::new(index)))
}

fn build_orchestrator(config: &AppConfig, index: Arc<dyn PhotoIndex>) -> Result<SearchOrchestrator> {
    let executor = SearchExecutor::new(index, PublicUrlResolver::new(&config.public_url_template));
    Ok(SearchOrchestrator::new(
        Arc::new(HttpTextInterpreter::new(&config.nlu)?),
        QueryBuilder::new(config.search_size),
        executor,
    ))
}

async fn scan(config: &AppConfig, container: String, ingestor: Ingestor) -> Result<()> {
    let container_dir = LocalPhotoStore::new(&config.photo_root).container_dir(&container)?;
    let allowed_extensions = config.allowed_extensions.clone();
    let (photos_tx, photos_rx) = crossbeam_channel::unbounded::<PhotoRef>();
    let ingestor = Arc::new(ingestor);
    let runtime = tokio::runtime::Handle::current();

    let walker_handle = tokio::task::spawn_blocking(move || {
        if let Err(e) = walker::start_walking(&container, &container_dir, &allowed_extensions, photos_tx) {
            log::error!("Walker error: {}", e);
        }
    });

    let indexer_handle = tokio::task::spawn_blocking(move || {
        if let Err(e) = indexer::start_indexing(ingestor, photos_rx, runtime) {
            log::error!("Indexer error: {}", e);
        }
    });

    tokio::try_join!(walker_handle, indexer_handle)?;
    log::info!("All indexing tasks have completed.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new()?;

    // Initialize env_logger based on config.log_level
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting photo_finder with {} index", config.engine);

    let index = build_index(&config)?;
    index.ensure_index_exists().await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let mut dialog = DialogStateMachine::new(config.max_elicit_attempts);
            if config.work_queue_enabled {
                let (work_queue, work_rx) = ChannelWorkQueue::new();
                dialog = dialog.with_queue(Arc::new(work_queue));
                std::thread::spawn(move || queue::start_worker(work_rx));
            }

            let state = web::Data::new(AppState {
                orchestrator: build_orchestrator(&config, index.clone())?,
                ingestor: build_ingestor(&config, index)?,
                dialog,
            });
            if let Err(e) = web_server::start_web_server(config.web_port, state).await {
                log::error!("Web server error: {}", e);
            }
        }
        Command::Ingest { container, key } => {
            build_ingestor(&config, index)?
                .ingest(PhotoRef::new(container, key))
                .await?;
        }
        Command::Scan { container } => {
            let ingestor = build_ingestor(&config, index)?;
            scan(&config, container, ingestor).await?;
        }
        Command::Search { text } => {
            let response = build_orchestrator(&config, index)?.respond(&text).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    info!("photo_finder finished");

    Ok(())
}
