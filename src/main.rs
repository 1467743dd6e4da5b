mod config;
mod db;
mod errors;
mod handlers;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use db::lead_repository::LeadRepository;
use db::token_repository::RefreshTokenRepository;
use db::user_repository::UserRepository;
use db::Database;
use dotenv::dotenv;
use services::auth::AuthService;
use std::env;
use tracing::info;
use tracing_actix_web::TracingLogger;
use utils::auth::TokenService;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::api::health,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::leads::create_lead,
        handlers::leads::get_leads,
        handlers::leads::get_lead,
        handlers::leads::update_lead,
        handlers::leads::delete_lead,
        handlers::leads::archive_leads,
        handlers::leads::my_leads_by_status,
        handlers::leads::leads_by_status,
        handlers::leads::assign_lead,
    ),
    components(
        schemas(
            handlers::api::HealthResponse,
            handlers::api::HealthChecks,
            handlers::auth::SignupRequest,
            handlers::auth::LoginRequest,
            handlers::auth::SignupResponse,
            handlers::auth::LoginUser,
            handlers::auth::LoginResponse,
            handlers::auth::RefreshResponse,
            handlers::leads::CreateLeadRequest,
            handlers::leads::UpdateLeadRequest,
            handlers::leads::ArchiveLeadsRequest,
            handlers::leads::AssignLeadRequest,
            handlers::leads::LeadWithCreator,
            handlers::leads::LeadResponse,
            handlers::leads::LeadListResponse,
            handlers::leads::ArchiveLeadsResponse,
            handlers::leads::StatusLeadsResponse,
            models::user::Role,
            models::user::Claims,
            models::user::Principal,
            models::lead::Lead,
            models::lead::LeadStatus,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Authentication", description = "Signup, login and token refresh"),
        (name = "Leads", description = "Protected lead management endpoints")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

            // Sessions travel in the http-only `jwt` cookie, not a header.
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("jwt"))),
            );
        }
    }
}

/// Registers app data and routes; shared between `main` and the tests.
pub fn configure_app(cfg: &mut web::ServiceConfig, db: &Database, config: &AppConfig) {
    let users = UserRepository::new(db.clone());
    let tokens = RefreshTokenRepository::new(db.clone());
    let leads = LeadRepository::new(db.clone());
    let token_service = TokenService::new(&config.auth);
    let auth_service = AuthService::new(
        users.clone(),
        tokens,
        token_service.clone(),
        config.auth.refresh_ttl,
    );

    cfg.app_data(web::Data::new(db.clone()))
        .app_data(web::Data::new(users))
        .app_data(web::Data::new(leads))
        .app_data(web::Data::new(token_service))
        .app_data(web::Data::new(auth_service))
        .app_data(web::Data::new(config.clone()))
        // Public routes
        .route("/api/health", web::get().to(handlers::api::health))
        .service(
            web::scope("/api/v1/auth")
                .route("/signup", web::post().to(handlers::auth::signup))
                .route("/login", web::post().to(handlers::auth::login))
                .route("/refresh", web::post().to(handlers::auth::refresh)),
        )
        // Protected routes
        .service(
            web::scope("/api/v1/leads")
                .wrap(middleware::auth::AuthMiddleware)
                .route("", web::post().to(handlers::leads::create_lead))
                .route("", web::get().to(handlers::leads::get_leads))
                .route("/archive", web::post().to(handlers::leads::archive_leads))
                .route("/assign", web::post().to(handlers::leads::assign_lead))
                .route(
                    "/my/status/{status}",
                    web::get().to(handlers::leads::my_leads_by_status),
                )
                .route(
                    "/status/{status}",
                    web::get().to(handlers::leads::leads_by_status),
                )
                .route("/{id}", web::get().to(handlers::leads::get_lead))
                .route("/{id}", web::put().to(handlers::leads::update_lead))
                .route("/{id}", web::delete().to(handlers::leads::delete_lead)),
        );
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing subscriber for structured logging
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .json()
        .init();

    let config = AppConfig::from_env();

    let database = Database::new(&config.db_path).expect("Failed to initialize database");
    info!(db_path = %config.db_path, "Database initialized");

    let bind_address = config.bind_address();

    info!(bind_address = %bind_address, "Starting lead CRM API server");
    info!("Available endpoints:");
    info!("   GET    /api/health                       - Health check (public)");
    info!("   POST   /api/v1/auth/signup               - Register new user (public)");
    info!("   POST   /api/v1/auth/login                - Login user (public)");
    info!("   POST   /api/v1/auth/refresh              - Refresh access token (public)");
    info!("   POST   /api/v1/leads                     - Create lead (protected)");
    info!("   GET    /api/v1/leads                     - List leads (protected)");
    info!("   GET    /api/v1/leads/{{id}}                - Get lead (protected)");
    info!("   PUT    /api/v1/leads/{{id}}                - Update lead (protected)");
    info!("   DELETE /api/v1/leads/{{id}}                - Delete lead (protected)");
    info!("   POST   /api/v1/leads/archive             - Bulk archive leads (protected)");
    info!("   GET    /api/v1/leads/my/status/{{status}}  - Own leads by status (protected)");
    info!("   GET    /api/v1/leads/status/{{status}}     - All leads by status (admin)");
    info!("   POST   /api/v1/leads/assign              - Assign lead to user (protected)");
    info!(
        swagger_url = format!("http://{}/swagger-ui/", bind_address),
        "Swagger UI available"
    );

    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            // Swagger UI
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .configure(|cfg| configure_app(cfg, &database, &config))
    })
    .bind(&bind_address)?
    .run()
    .await
}
