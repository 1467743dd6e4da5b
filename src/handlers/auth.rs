use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::user::{Principal, Role};
use crate::services::auth::AuthService;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct SignupResponse {
    pub message: String,
    pub user: Principal,
}

/// Login projection: id, email and role only.
#[derive(Serialize, ToSchema)]
pub struct LoginUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub user: LoginUser,
}

#[derive(Serialize, ToSchema)]
pub struct RefreshResponse {
    pub message: String,
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .finish()
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered successfully", body = SignupResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email or username already registered")
    ),
    tag = "Authentication"
)]
pub async fn signup(
    auth_service: web::Data<AuthService>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    info!(username = %payload.username, email = %payload.email, "Registration attempt");

    let user = auth_service
        .signup(
            &payload.username,
            &payload.email,
            &payload.password,
            payload.role,
        )
        .await?;

    Ok(HttpResponse::Created().json(SignupResponse {
        message: "Signup successful".to_string(),
        user: Principal::from(user),
    }))
}

/// Login an existing user, setting the session cookies
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Authentication"
)]
pub async fn login(
    auth_service: web::Data<AuthService>,
    config: web::Data<AppConfig>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!(email = %payload.email, "Login attempt");

    let session = auth_service
        .login(&payload.email, &payload.password)
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(
            "jwt",
            session.access_token,
            config.cookie_secure,
        ))
        .cookie(session_cookie(
            "refreshToken",
            session.refresh_token,
            config.cookie_secure,
        ))
        .json(LoginResponse {
            message: "Login successful".to_string(),
            user: LoginUser {
                id: session.user.id,
                email: session.user.email,
                role: session.user.role,
            },
        }))
}

/// Exchange the refresh-token cookie for a new access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "Access token refreshed", body = RefreshResponse),
        (status = 401, description = "Missing or invalid refresh token"),
        (status = 403, description = "Refresh token expired or not on record")
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    req: HttpRequest,
    auth_service: web::Data<AuthService>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let cookie = req.cookie("refreshToken").ok_or(ApiError::Authentication)?;

    let access_token = auth_service.refresh_access_token(cookie.value()).await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(
            "jwt",
            access_token,
            config.cookie_secure,
        ))
        .json(RefreshResponse {
            message: "Access token refreshed".to_string(),
        }))
}

#[cfg(test)]
mod tests {
    use crate::config::{AppConfig, AuthConfig};
    use crate::db::Database;
    use actix_web::body::MessageBody;
    use actix_web::cookie::Cookie;
    use actix_web::dev::ServiceResponse;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use chrono::Duration;

    fn test_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: "0".to_string(),
            db_path: String::new(),
            cookie_secure: false,
            auth: AuthConfig {
                access_secret: "access-test-secret".to_string(),
                refresh_secret: "refresh-test-secret".to_string(),
                access_ttl: Duration::minutes(15),
                refresh_ttl: Duration::days(7),
            },
        }
    }

    fn cookie_value<B>(resp: &ServiceResponse<B>, name: &str) -> Option<String>
    where
        B: MessageBody,
    {
        resp.headers()
            .get_all(header::SET_COOKIE)
            .filter_map(|h| h.to_str().ok())
            .filter_map(|s| Cookie::parse_encoded(s.to_string()).ok())
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
    }

    fn signup_body(username: &str, email: &str) -> serde_json::Value {
        serde_json::json!({
            "username": username,
            "email": email,
            "password": "pw123456"
        })
    }

    #[actix_web::test]
    async fn test_signup_defaults_role_and_hides_password() {
        let db = Database::in_memory().unwrap();
        let config = test_config();
        let app = test::init_service(
            App::new().configure(|cfg| crate::configure_app(cfg, &db, &config)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/signup")
                .set_json(signup_body("alice", "a@x.com"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["role"], "EMPLOYEE");
        assert_eq!(body["user"]["email"], "a@x.com");
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("password_hash").is_none());
    }

    #[actix_web::test]
    async fn test_signup_duplicate_email_conflicts() {
        let db = Database::in_memory().unwrap();
        let config = test_config();
        let app = test::init_service(
            App::new().configure(|cfg| crate::configure_app(cfg, &db, &config)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/signup")
                .set_json(signup_body("alice", "a@x.com"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        // Different username, same email.
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/signup")
                .set_json(signup_body("alice2", "a@x.com"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_login_sets_cookies_and_projects_user() {
        let db = Database::in_memory().unwrap();
        let config = test_config();
        let app = test::init_service(
            App::new().configure(|cfg| crate::configure_app(cfg, &db, &config)),
        )
        .await;

        test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/signup")
                .set_json(signup_body("alice", "a@x.com"))
                .to_request(),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/login")
                .set_json(serde_json::json!({ "email": "a@x.com", "password": "pw123456" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(cookie_value(&resp, "jwt").is_some());
        assert!(cookie_value(&resp, "refreshToken").is_some());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["role"], "EMPLOYEE");
        assert!(body["user"]["id"].is_string());
        assert!(body["user"].get("username").is_none());
    }

    #[actix_web::test]
    async fn test_login_failures_share_status_and_body() {
        let db = Database::in_memory().unwrap();
        let config = test_config();
        let app = test::init_service(
            App::new().configure(|cfg| crate::configure_app(cfg, &db, &config)),
        )
        .await;

        test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/signup")
                .set_json(signup_body("alice", "a@x.com"))
                .to_request(),
        )
        .await;

        let wrong_password = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/login")
                .set_json(serde_json::json!({ "email": "a@x.com", "password": "wrong" }))
                .to_request(),
        )
        .await;
        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        let wrong_password_body: serde_json::Value = test::read_body_json(wrong_password).await;

        let unknown_email = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/login")
                .set_json(serde_json::json!({ "email": "nobody@x.com", "password": "pw123456" }))
                .to_request(),
        )
        .await;
        assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
        let unknown_email_body: serde_json::Value = test::read_body_json(unknown_email).await;

        // No user enumeration: identical error bodies.
        assert_eq!(wrong_password_body, unknown_email_body);
    }

    #[actix_web::test]
    async fn test_refresh_issues_new_access_cookie_and_is_repeatable() {
        let db = Database::in_memory().unwrap();
        let config = test_config();
        let app = test::init_service(
            App::new().configure(|cfg| crate::configure_app(cfg, &db, &config)),
        )
        .await;

        test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/signup")
                .set_json(signup_body("alice", "a@x.com"))
                .to_request(),
        )
        .await;
        let login = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/login")
                .set_json(serde_json::json!({ "email": "a@x.com", "password": "pw123456" }))
                .to_request(),
        )
        .await;
        let refresh_token = cookie_value(&login, "refreshToken").unwrap();

        for _ in 0..2 {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/api/v1/auth/refresh")
                    .cookie(Cookie::new("refreshToken", refresh_token.clone()))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert!(cookie_value(&resp, "jwt").is_some());
        }
    }

    #[actix_web::test]
    async fn test_refresh_without_cookie_is_unauthorized() {
        let db = Database::in_memory().unwrap();
        let config = test_config();
        let app = test::init_service(
            App::new().configure(|cfg| crate::configure_app(cfg, &db, &config)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/v1/auth/refresh").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_refresh_with_forged_token_is_rejected() {
        let db = Database::in_memory().unwrap();
        let config = test_config();
        let app = test::init_service(
            App::new().configure(|cfg| crate::configure_app(cfg, &db, &config)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/refresh")
                .cookie(Cookie::new("refreshToken", "not.a.valid.jwt"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
