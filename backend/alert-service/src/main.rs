use std::io;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use alert_service::{
    handlers::{alerts::register_routes as register_alerts, ws::register_routes as register_ws},
    logging, metrics,
    store::FileAlertStore,
    AppState, Config,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    logging::init_tracing();

    tracing::info!("Starting alert service");

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let store = Arc::new(FileAlertStore::new(&config.storage.data_dir));
    tracing::info!(data_dir = %config.storage.data_dir, "alert store initialized");

    let addr = format!("0.0.0.0:{}", config.app.port);
    let state = AppState::new(store, config);

    tracing::info!(%addr, "Starting HTTP server");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(|cfg| {
                register_alerts(cfg);
                register_ws(cfg);
            })
    })
    .bind(&addr)?
    .run()
    .await
}
