mod api;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::dev::Service;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, RideStoreKind};
use crate::database::{JsonRideStore, MongoRideStore, RideRepository};
use crate::middleware::auth::AuthMiddleware;
use crate::services::{GeoService, RideService};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();

    log::info!("🚀 Starting GoTogether server...");
    log::info!("🌎 Environment: {}", config.environment);

    // 💾 Ride store
    let repo: Arc<dyn RideRepository> = match config.ride_store {
        RideStoreKind::Json => {
            let path = config.rides_file();
            log::info!("📁 Ride store: {} (persist: {})", path.display(), config.persist_rides);
            Arc::new(JsonRideStore::load(&path, config.persist_rides).await)
        }
        RideStoreKind::Mongo => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set when RIDE_STORE=mongo");
            let db = database::MongoDB::new(database_url)
                .await
                .expect("Failed to connect to MongoDB");
            log::info!("✅ MongoDB connected successfully");
            Arc::new(MongoRideStore::new(db))
        }
    };

    // 🗺️ Universities + cities
    let geo = GeoService::load(&config.universities_file(), &config.cities_file())
        .await
        .expect("Failed to load university/city data");
    let geo_data = web::Data::new(geo);

    let ride_service = Arc::new(RideService::new(
        repo,
        config.limiter.clone(),
        config.status_checker.thresholds,
        config.utc_offset,
    ));
    let rides_data = web::Data::from(ride_service.clone());

    // ⏱️ Background jobs
    log::info!("📅 Starting background jobs...");
    let checker = jobs::ride_status_checker::start_ride_status_checker(
        ride_service.clone(),
        &config.status_checker,
    );

    let debug_enabled = config.debug_enabled();
    let debug_data = web::Data::new(api::debug::DebugState {
        started_at: chrono::Utc::now(),
        environment: config.environment.clone(),
        jwt_secret: config.jwt_secret.clone(),
    });
    if debug_enabled {
        log::warn!("🐛 Debug routes enabled at /debug (APP_ENV={})", config.environment);
    } else if config.debug_routes {
        log::warn!("⚠️  DEBUG_ROUTES_ENABLED ignored in production");
    }

    let host = config.host.clone();
    let port = config.port;

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);
        for origin in &config.cors_origins {
            cors = cors.allowed_origin(origin);
        }

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();
        let secret = config.jwt_secret.clone();
        let debug_data = debug_data.clone();

        App::new()
            .app_data(rides_data.clone())
            .app_data(geo_data.clone())
            .app_data(utils::json_config())
            .app_data(utils::query_config())
            .wrap_fn(|req, srv| {
                api::metrics::increment_request_count();
                let fut = srv.call(req);
                async move {
                    let res = fut.await?;
                    if res.status().is_server_error() {
                        api::metrics::increment_error_count();
                    }
                    Ok(res)
                }
            })
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Metrics
            .route("/metrics", web::get().to(api::metrics::get_metrics))
            // Auth
            .service(
                web::scope("/api/auth")
                    .wrap(AuthMiddleware::new(&secret))
                    .route("/verify", web::get().to(api::auth::verify_token))
            )
            // Rides - Requires JWT
            .service(
                web::scope("/api/rides")
                    .wrap(AuthMiddleware::new(&secret))
                    .configure(api::rides::configure)
            )
            // Schools: catálogo público
            .service(
                web::scope("/api/schools")
                    .route("", web::get().to(api::schools::list_schools))
                    .route("/states", web::get().to(api::schools::list_states))
                    .route("/domain/{name}", web::get().to(api::schools::get_school_domain))
                    .route("/{state}", web::get().to(api::schools::get_schools_by_state))
            )
            // Nearby: público
            .route("/api/nearby/{name}", web::get().to(api::nearby::get_nearby))
            // 🐛 Debug: nunca em produção
            .configure(|cfg| {
                if !debug_enabled {
                    return;
                }
                cfg.app_data(debug_data).service(
                    web::scope("/debug")
                        .route("/token", web::get().to(api::debug::debug_token))
                        .service(
                            web::scope("")
                                .wrap(AuthMiddleware::debug(&secret))
                                .route("/status", web::get().to(api::debug::debug_status))
                                .route("/rides", web::get().to(api::debug::debug_rides))
                                .route("/users", web::get().to(api::debug::debug_users))
                                .route("/events", web::get().to(api::debug::debug_events))
                                .route("/clear-limiters", web::post().to(api::debug::clear_limiters))
                                .route("/check-statuses", web::post().to(api::debug::check_statuses))
                        )
                );
            })
    })
    .bind((host.as_str(), port))?
    .run();

    let result = server.await;

    // 🛑 Shutdown
    if let Some(handle) = checker {
        handle.abort();
        log::info!("⏹️  Ride status checker stopped");
    }
    log::info!("👋 GoTogether server stopped");

    result
}
