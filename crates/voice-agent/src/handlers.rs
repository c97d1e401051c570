use actix_web::{web, HttpResponse, Responder};
use voice_metrics::render_prometheus;

use crate::state::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn metrics(state: web::Data<AppState>) -> impl Responder {
    let summary = state.exposition.read().await.get_summary();
    let body = render_prometheus(&summary, state.active_conversations.get());

    HttpResponse::Ok()
        .content_type(PROMETHEUS_CONTENT_TYPE)
        .body(body)
}

pub async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "active_conversations": state.active_conversations.get(),
    }))
}
