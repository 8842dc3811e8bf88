use actix_web::{http::Method, web, App, HttpResponse, HttpResponseBuilder, HttpServer};
use serde::Deserialize;
use serde_json::json;
use crate::dialog::{DialogRequest, DialogStateMachine};
use crate::error::AppError;
use crate::events::StorageEvent;
use crate::indexer::Ingestor;
use crate::orchestrator::{SearchOrchestrator, SearchResponse, NO_LABELS_MESSAGE};

pub struct AppState {
    pub orchestrator: SearchOrchestrator,
    pub ingestor: Ingestor,
    pub dialog: DialogStateMachine,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

fn with_cors(mut builder: HttpResponseBuilder) -> HttpResponseBuilder {
    builder
        .insert_header(("Access-Control-Allow-Headers", "*"))
        .insert_header(("Access-Control-Allow-Origin", "*"))
        .insert_header(("Access-Control-Allow-Methods", "OPTIONS,GET"));
    builder
}

async fn search_photos(state: web::Data<AppState>, params: web::Query<SearchParams>) -> HttpResponse {
    log::debug!("Received search request: {:?}", params);

    let text = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let response = match text {
        None => SearchResponse::advisory(NO_LABELS_MESSAGE),
        Some(text) => match state.orchestrator.respond(text).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Search for '{}' failed: {}", text, e);
                SearchResponse::default()
            }
        },
    };
    log::info!("Search result: {} photos", response.results.len());

    with_cors(HttpResponse::Ok()).json(response)
}

async fn preflight() -> HttpResponse {
    with_cors(HttpResponse::Ok()).finish()
}

async fn ingest(
    state: web::Data<AppState>,
    event: web::Json<StorageEvent>,
) -> Result<HttpResponse, AppError> {
    let indexed = state.ingestor.handle_event(&event).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Info uploaded to index.",
        "indexed": indexed,
    })))
}

async fn dialog_turn(
    state: web::Data<AppState>,
    request: web::Json<DialogRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state.dialog.handle(request.into_inner())?;
    Ok(HttpResponse::Ok().json(response))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/search")
            .route(web::get().to(search_photos))
            .route(web::method(Method::OPTIONS).to(preflight)),
    )
    .service(web::resource("/ingest").route(web::post().to(ingest)))
    .service(web::resource("/dialog").route(web::post().to(dialog_turn)));
}

pub async fn start_web_server(port: u16, state: web::Data<AppState>) -> std::io::Result<()> {
    log::info!("Starting web server on port: {}", port);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(format!("0.0.0.0:{}", port))?
        .run()
        .await
}
