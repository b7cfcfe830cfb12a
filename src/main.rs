use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use tracing::{Level, info};
use tracing_appender::rolling;
use utoipa_swagger_ui::SwaggerUi;

use hr_admin::config::Config;
use hr_admin::db::init_db;
use hr_admin::docs::api_doc;
use hr_admin::error::expose_internal_details;
use hr_admin::routes::{self, RateLimits};
use hr_admin::state::{AppState, assistant_from_config};
use hr_admin::store::mysql::MySqlStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let level: Level = config
        .log_level
        .parse()
        .with_context(|| format!("LOG_LEVEL has invalid value '{}'", config.log_level))?;

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    expose_internal_details(config.is_development());
    info!(addr = %config.server_addr, env = %config.app_env, "Server starting...");

    let pool = init_db(&config).await?;
    let store = MySqlStore::new(pool, config.store_timeout);
    let state = Data::new(AppState::new(store, assistant_from_config(&config)?));
    let limits = RateLimits::from_config(&config);
    let openapi = api_doc(&config.api_prefix);
    let config_data = Data::new(config.clone());

    HttpServer::new(move || {
        let config = config_data.clone();
        let limits = limits.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard so the JS/CSS assets resolve
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", openapi.clone()),
            )
            .app_data(config.clone())
            .app_data(state.clone())
            .configure(|cfg| routes::configure(cfg, &config, &limits))
    })
    .shutdown_timeout(10)
    .bind(&config.server_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
