use actix_cors::Cors;
use actix_files::Files;
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use std::io;
use std::path::Path;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::handlers;
use crate::state::AppState;

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::root::handler))
        .route("/health", web::get().to(handlers::health::handler))
        .route("/simulate", web::post().to(handlers::simulate::handler))
        .route("/api/stream", web::post().to(handlers::stream::handler))
        .service(
            web::scope("/api/v1").route("/stream", web::post().to(handlers::stream::handler)),
        );
}

/// Malformed or mistyped JSON bodies become structured 400s.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into())
}

/// Allow-list CORS policy. No origins means same-origin only; `*` allows any.
pub fn build_cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600);

    if allowed_origins.iter().any(|origin| origin == "*") {
        return cors.allow_any_origin();
    }

    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

/// Mounts the demo UI under `/ui` when the directory exists.
pub fn configure_static(cfg: &mut web::ServiceConfig, static_dir: &Path) {
    if static_dir.is_dir() {
        cfg.service(Files::new("/ui", static_dir).index_file("index.html"));
    } else {
        log::debug!("Static directory {:?} not found, /ui disabled", static_dir);
    }
}

pub async fn run_server(config: AppConfig) -> io::Result<()> {
    let bind_address = config.bind_address();
    log::info!(
        "Starting typewriter server on {} ({}ms per char, {} keywords)",
        bind_address,
        config.cadence.as_millis(),
        config.responses.entries().len()
    );
    if config.allowed_origins.is_empty() {
        log::info!("CORS: same-origin only");
    } else {
        log::info!("CORS allow-list: {}", config.allowed_origins.join(", "));
    }

    let state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        let config = state.config.clone();
        App::new()
            .app_data(state.clone())
            .app_data(json_config())
            .wrap(build_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .configure(app_config)
            .configure(|cfg| configure_static(cfg, &config.static_dir))
            .default_service(web::to(handlers::not_found))
    })
    .bind(&bind_address)?
    .run()
    .await
}
