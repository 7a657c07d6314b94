mod config;
mod model;
mod web;

use std::path::Path;
use actix_files as fs;
use actix_web::middleware::Logger;
use actix_web::{web::Data, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use config::Config;
use model::ModelManager;
use web::error::error_handlers;
use web::{cors, routes};

// App state structure
struct AppState {
    model: ModelManager,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting YC coach chat service");

    let config = Config::from_env();

    let model = match ModelManager::new(&config).await {
        Ok(manager) => {
            info!(
                "Bedrock client ready (model: {}, region: {})",
                config.model.model_id, config.model.region
            );
            manager
        }
        Err(e) => {
            error!("Failed to initialize model client: {:#}", e);
            std::process::exit(1);
        }
    };

    let app_state = Data::new(AppState { model });

    // The frontend is optional; only mount it when the directory is present
    let static_dir = Some(config.server.static_dir.clone()).filter(|dir| Path::new(dir).is_dir());
    match &static_dir {
        Some(dir) => info!("Serving static frontend from {}", dir),
        None => info!("No static frontend at {}", config.server.static_dir),
    }

    info!("Listening on {}:{}", config.server.bind_addr, config.server.port);

    HttpServer::new(move || {
        let app = App::new()
            .wrap(error_handlers())
            .wrap(cors::default_headers())
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(routes::configure);

        match &static_dir {
            Some(dir) => app.service(fs::Files::new("/", dir).index_file("index.html")),
            None => app,
        }
    })
    .bind((config.server.bind_addr.as_str(), config.server.port))?
    .run()
    .await
}
