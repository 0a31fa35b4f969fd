use actix::Actor;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod authentication;
mod config;
mod error;
mod fookie;
mod fookie_db;
mod fookie_http;
mod reports;
mod routes;
mod token;
mod validation;

use fookie_http::{HttpImageValidator, ImageValidator};
use reports::{CommandReportProvider, ReportProvider};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fookie=debug")),
        )
        .with_target(true)
        .init();

    let settings = config::Settings::from_env()?;
    let config = Arc::new(config::Config::load(&settings.config_file)?);

    let cookie_db_addr = fookie_db::CookieDb::open(&settings.database_url)?.start();
    let image_validator: Arc<dyn ImageValidator> =
        Arc::new(HttpImageValidator::new(settings.image_timeout)?);
    let report_provider = settings
        .report_command
        .clone()
        .map(|command| Arc::new(CommandReportProvider { command }) as Arc<dyn ReportProvider>);
    if report_provider.is_none() {
        info!("FOOKIE_REPORT_COMMAND not set, traffic reports are disabled");
    }

    let state = web::Data::new(fookie::GlobalState {
        cookie_db_addr,
        config,
        image_validator,
        report_provider,
        token_source: Arc::new(token::OsTokenSource),
    });

    info!("Listening on {}", settings.bind);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(&settings.bind)?
    .run()
    .await?;

    Ok(())
}
