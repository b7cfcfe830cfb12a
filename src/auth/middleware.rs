use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web::Data,
};
use tracing::{debug, warn};

use super::{Principal, jwt::verify_token};
use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;

fn reject(req: ServiceRequest, reason: &str) -> ServiceResponse<BoxBody> {
    debug!(path = %req.path(), reason, "Request rejected by auth");
    let resp = AppError::Unauthorized.error_response();
    req.into_response(resp)
}

/// Verifies the bearer token and attaches the [`Principal`] to the request.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get(AUTHORIZATION).map(|h| h.to_str()) {
        Some(Ok(value)) => value,
        Some(Err(_)) => return Ok(reject(req, "invalid header encoding")),
        None => return Ok(reject(req, "missing Authorization header")),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) if !t.trim().is_empty() => t.trim(),
        _ => return Ok(reject(req, "not a bearer token")),
    };

    let claims = match verify_token(token, &config.jwt_secret, config.jwt_issuer.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            let reason = e.to_string();
            return Ok(reject(req, &reason));
        }
    };

    let principal = Principal::from(claims);

    if let Some(state) = req.app_data::<Data<AppState>>() {
        if let Err(e) = state.directory.record(&principal).await {
            warn!(user_id = %principal.user_id, error = %e, "Failed to record principal");
        }
    }

    req.extensions_mut().insert(principal);

    next.call(req).await
}
