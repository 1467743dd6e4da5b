use crate::db::user_repository::UserRepository;
use crate::models::user::Principal;
use crate::utils::auth::TokenService;
use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::error;

/// Route authorization gate.
///
/// Resolves the `jwt` session cookie to a [`Principal`] and attaches it to
/// the request, or rejects with 401. A valid token whose user has since been
/// deleted is rejected too, so stale tokens cannot outlive their account.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    // Rc so the inner service can be moved into the async block; the user
    // lookup must complete before the request is forwarded.
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let token = match req.cookie("jwt") {
                Some(cookie) => cookie.value().to_string(),
                None => return Ok(reject(req, "Unauthorized - No Token Provided")),
            };

            let (token_service, users) = match (
                req.app_data::<web::Data<TokenService>>(),
                req.app_data::<web::Data<UserRepository>>(),
            ) {
                (Some(ts), Some(users)) => (ts.clone(), users.clone()),
                _ => {
                    error!("Auth middleware missing TokenService or UserRepository app data");
                    return Ok(server_error(req));
                }
            };

            let claims = match token_service.verify_access_token(&token) {
                Ok(claims) => claims,
                Err(_) => return Ok(reject(req, "Unauthorized - Invalid or expired token")),
            };

            let user = match users.get_by_id(&claims.sub).await {
                Ok(Some(user)) => user,
                Ok(None) => return Ok(reject(req, "Unauthorized - User not found")),
                Err(e) => {
                    error!(error = %e, "Failed to resolve principal during auth");
                    return Ok(server_error(req));
                }
            };

            req.extensions_mut().insert(Principal::from(user));

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

fn reject<B>(req: ServiceRequest, message: &str) -> ServiceResponse<EitherBody<B, BoxBody>> {
    let (req, _pl) = req.into_parts();
    let res = HttpResponse::Unauthorized().json(serde_json::json!({
        "error": message
    }));
    ServiceResponse::new(req, res).map_into_right_body()
}

fn server_error<B>(req: ServiceRequest) -> ServiceResponse<EitherBody<B, BoxBody>> {
    let (req, _pl) = req.into_parts();
    let res = HttpResponse::InternalServerError().json(serde_json::json!({
        "error": "Internal server error"
    }));
    ServiceResponse::new(req, res).map_into_right_body()
}
