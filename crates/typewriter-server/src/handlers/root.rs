use actix_web::{web, HttpResponse, Responder};

use crate::state::AppState;

pub async fn handler(state: web::Data<AppState>) -> impl Responder {
    let keywords: Vec<&str> = state
        .selector
        .table()
        .entries()
        .iter()
        .map(|entry| entry.keyword.as_str())
        .collect();

    HttpResponse::Ok().json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Simulated AI response streaming over Server-Sent Events",
        "cadenceMs": u64::try_from(state.config.cadence.as_millis()).unwrap_or(u64::MAX),
        "keywords": keywords,
        "endpoints": {
            "stream": "POST /api/v1/stream",
            "simulate": "POST /simulate",
            "health": "GET /health",
            "ui": "GET /ui/",
        },
    }))
}
