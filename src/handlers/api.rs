use crate::config::AppConfig;
use crate::db::Database;
use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize, ToSchema)]
pub struct HealthChecks {
    pub database_reachable: bool,
    pub jwt_uses_default: bool,
}

/// Public health check endpoint with dependency checks
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is degraded")
    ),
    tag = "Health"
)]
pub async fn health(db: web::Data<Database>, config: web::Data<AppConfig>) -> impl Responder {
    let database_reachable = db.is_reachable();
    let jwt_uses_default = config.auth.uses_default_secrets();

    if jwt_uses_default {
        warn!("Health check: Using default JWT secrets - NOT SECURE FOR PRODUCTION");
    }

    let status = if database_reachable && !jwt_uses_default {
        "healthy"
    } else {
        "degraded"
    };

    let response = HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database_reachable,
            jwt_uses_default,
        },
    };

    if status == "healthy" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
