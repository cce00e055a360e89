use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::config::AppConfig;
use crate::database::Database;
use crate::services::auth_service;
use crate::utils::error::AppError;

/// Requests that mutate state without a session.
const PUBLIC_MUTATIONS: &[(&str, &str)] = &[("POST", "/api/users/login")];

/// Verifies `Authorization: Bearer <jwt>` and stores the [`auth_service::Claims`]
/// in the request extensions.
///
/// Reads are allowed anonymously; every other method under `/api` needs a valid token
/// whose subject still exists. The stored role replaces the role in the token.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
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
    service: Rc<S>,
}

fn requires_token(method: &Method, path: &str) -> bool {
    if [Method::GET, Method::HEAD, Method::OPTIONS].contains(method) {
        return false;
    }
    if !path.starts_with("/api/") {
        return false;
    }
    !PUBLIC_MUTATIONS
        .iter()
        .any(|(m, p)| method.as_str() == *m && path.trim_end_matches('/') == *p)
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let required = requires_token(req.method(), req.path());

        let token = match bearer_token(&req) {
            Some(token) => token,
            None if required => {
                return Box::pin(async move {
                    Err(AppError::Unauthorized("Missing authorization token".to_string()).into())
                });
            }
            None => {
                let fut = self.service.call(req);
                return Box::pin(async move { fut.await });
            }
        };

        let settings = match req.app_data::<web::Data<AppConfig>>() {
            Some(config) => config.auth.clone(),
            None => {
                return Box::pin(async move {
                    Err(AppError::internal("AppConfig is not registered").into())
                });
            }
        };
        let db = match req.app_data::<web::Data<Database>>() {
            Some(db) => db.clone(),
            None => {
                return Box::pin(async move {
                    Err(AppError::internal("Database is not registered").into())
                });
            }
        };

        let claims = match auth_service::verify_token(&settings, &token) {
            Ok(claims) => claims,
            Err(e) => {
                log::warn!("🔒 Rejected token on {} {}: {}", req.method(), req.path(), e);
                return Box::pin(async move {
                    Err(AppError::Unauthorized("Invalid or expired token".to_string()).into())
                });
            }
        };

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            match auth_service::resolve_actor(&db, claims).await {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                }
                Err(e) if required => {
                    log::warn!("🔒 Rejected token on {} {}: {}", req.method(), req.path(), e);
                    return Err(e.into());
                }
                // anonymous reads still go through
                Err(_) => {}
            }
            service.call(req).await
        })
    }
}
