use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use chrono::FixedOffset;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod core;
mod db;
mod docs;
mod model;
mod models;
mod routes;

use config::Config;
use db::init_db;

use crate::core::clock::{SystemClock, TemporalContext};
use crate::core::engine::AttendanceEngine;
use crate::core::qr::QrCodec;
use crate::core::reconcile::LeaveReconciler;
use crate::core::repo::MySqlAttendanceRepo;
use crate::core::report::ReportAggregator;
use crate::docs::ApiDoc;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Presensi attendance service"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;
    let repo = MySqlAttendanceRepo::new(pool.clone());

    let zone = FixedOffset::east_opt(config.org_utc_offset_minutes * 60)
        .expect("ORG_UTC_OFFSET_MINUTES out of range");
    let temporal = TemporalContext::new(zone);

    let engine = Data::new(AttendanceEngine::new(
        repo.clone(),
        SystemClock,
        temporal,
        QrCodec::new(&config.qr_secret),
        (config.late_cutoff_hour, config.late_cutoff_minute),
    ));
    let reconciler = Data::new(LeaveReconciler::new(repo.clone()));
    let reports = Data::new(ReportAggregator::new(
        repo.clone(),
        config.report_batch_limit,
    ));
    let repo_data = Data::new(repo);

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(engine.clone())
            .app_data(reconciler.clone())
            .app_data(reports.clone())
            .app_data(repo_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
