use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::services::auth_service::{self, JwtSettings};
use crate::utils::error::AppError;

/// Valida o bearer token e injeta a `SessionIdentity` nas extensions do request
pub struct AuthMiddleware {
    jwt: Rc<JwtSettings>,
}

impl AuthMiddleware {
    pub fn new(jwt: JwtSettings) -> Self {
        Self { jwt: Rc::new(jwt) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
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
            service,
            jwt: self.jwt.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt: Rc<JwtSettings>,
}

fn bearer_token(req: &ServiceRequest) -> Result<String, AppError> {
    let header_value = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

    let header_str = header_value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid token format".to_string()))?;

    header_str
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid token format".to_string()))
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let identity = bearer_token(&req).and_then(|token| {
            auth_service::verify_token(&self.jwt, &token).map_err(AppError::Unauthorized)
        });

        match identity {
            Ok(identity) => {
                log::debug!("🔑 {} authenticated as {}", identity.user_id, identity.role.as_str());
                req.extensions_mut().insert(identity);

                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Err(e) => {
                log::warn!("🚫 {} {} rejected: {}", req.method(), req.path(), e);
                crate::api::metrics::increment_error_count();
                let err: Error = actix_web::error::InternalError::from_response(
                    e.to_string(),
                    e.error_response(),
                )
                .into();
                Box::pin(async move { Err(err) })
            }
        }
    }
}
