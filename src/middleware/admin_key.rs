use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::error::AdminError;
use crate::security::hmac::constant_time_eq;
use crate::state::AppState;

/// Header carrying the static admin key
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Gate for administrative routes: requires `ADMIN_API_KEY` via the
/// `X-Admin-Key` header or the `api_key` query parameter.
pub struct AdminKeyMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AdminKeyMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminKeyMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminKeyMiddlewareService { service }))
    }
}

pub struct AdminKeyMiddlewareService<S> {
    service: S,
}

/// Admin key presented by the request, header first
fn provided_key(req: &ServiceRequest) -> Option<String> {
    if let Some(value) = req.headers().get(ADMIN_KEY_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }

    web::Query::<std::collections::HashMap<String, String>>::from_query(req.query_string())
        .ok()
        .and_then(|query| query.get("api_key").cloned())
}

fn is_authorized(req: &ServiceRequest) -> bool {
    let expected = match req
        .app_data::<web::Data<AppState>>()
        .and_then(|state| state.admin_api_key.clone())
    {
        Some(key) => key,
        // No key configured: admin surface stays closed
        None => return false,
    };

    match provided_key(req) {
        Some(provided) => constant_time_eq(&provided, &expected),
        None => false,
    }
}

impl<S, B> Service<ServiceRequest> for AdminKeyMiddlewareService<S>
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
        if !is_authorized(&req) {
            log::warn!("🔒 Rejected admin request to {}", req.path());
            return Box::pin(async move { Err(AdminError::Unauthorized.into()) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}
