use std::io;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpServer};

use crate::handlers;
use crate::state::AppState;

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(handlers::metrics))
        .route("/health", web::get().to(handlers::health));
}

/// Bind the scrape server and run it in the background.
pub fn start_metrics_server(port: u16, state: AppState) -> io::Result<ServerHandle> {
    let data = web::Data::new(state);

    let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(app_config))
        .workers(1)
        .bind(("0.0.0.0", port))?
        .run();

    let handle = server.handle();
    actix_web::rt::spawn(server);
    log::info!("Metrics server listening on port {}", port);
    Ok(handle)
}
