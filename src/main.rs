mod classifier;
mod config;
mod error;
mod handlers;
mod models;
mod preprocess;
mod validator;

use crate::classifier::{ClassMapping, OnnxClassifier};
use crate::config::AppConfig;
use crate::validator::EarValidator;
use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::load().context("failed to load configuration")?;
    init_logging(&cfg.logging.level);

    let classes = ClassMapping::load(&cfg.model.class_map_path)?;
    info!(
        path = %cfg.model.class_map_path.display(),
        classes = classes.len(),
        "class map loaded"
    );

    let classifier = OnnxClassifier::load(&cfg.model.weights_path)?;
    info!(path = %cfg.model.weights_path.display(), "model loaded");

    let validator = web::Data::new(EarValidator::new(
        Box::new(classifier),
        classes,
        &cfg.model.target_class,
    )?);

    let json_limit = cfg.server.json_limit_bytes;
    let (host, port) = cfg.bind_address();
    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(validator.clone())
            .app_data(handlers::json_config(json_limit))
            .configure(handlers::configure)
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
