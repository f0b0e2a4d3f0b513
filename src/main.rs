use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

use pasal_analytics::config::AppConfig;
use pasal_analytics::databases::{reports::stats::PgReportStore, setup_backend};
use pasal_analytics::routes;
use pasal_analytics::services::report::chart::ReportSource;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let pool = setup_backend(&config).await?;

    let source: Arc<dyn ReportSource> = Arc::new(PgReportStore::new(pool.clone()));
    let source = web::Data::from(source);
    let pool = web::Data::new(pool);

    log::info!("🚀 Analytics server listening on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(pool.clone())
            .app_data(source.clone())
            .configure(routes::init)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
