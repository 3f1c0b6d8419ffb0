use crate::{config::Config, error::Result, routes::api_routes, services::RecommendationEngine};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::{info, warn};
use std::net::TcpListener;

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let bind_address = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}", bind_address);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    /// This is useful for testing where we want to use a random port
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let missing = self.config.verify_paths();
        if !missing.is_empty() {
            warn!(
                "{} required files are missing, the recommender will not be ready",
                missing.len()
            );
        }

        // Initialization is CPU bound; keep it off the async workers
        let sources = self.config.data_sources();
        let max_recommendations = self.config.max_recommendations;
        let engine = tokio::task::spawn_blocking(move || {
            RecommendationEngine::bootstrap(&sources, max_recommendations)
        })
        .await
        .context("Recommendation engine initialization panicked")?;
        info!("Recommendation engine state: {}", engine.stage());

        let engine = web::Data::new(engine);
        let config = web::Data::new(self.config.clone());

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(engine.clone())
                .app_data(config.clone())
                .service(api_routes())
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}
