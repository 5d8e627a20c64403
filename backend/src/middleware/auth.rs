use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::actor::Actor,
    state::AppState,
    utils::jwt::{verify_access_token, Claims},
};

pub const API_KEY_HEADER: &str = "x-apikey";

/// Resolves the caller into an [`Actor`] and stores it, with its claims, as
/// request extensions.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (claims, actor) = authenticate_request(request.headers(), &state).await?;
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(rest) = header.strip_prefix("bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}

fn check_api_key(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected) {
        return Err(AppError::Unauthorized("Invalid API key".to_string()));
    }
    Ok(())
}

async fn authenticate_request(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<(Claims, Actor), AppError> {
    check_api_key(headers, state.config.api_key.as_deref())?;

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = verify_access_token(token, &state.config.jwt_secret).map_err(|err| {
        tracing::debug!(error = %err, "Rejected access token");
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    let employee = state
        .directory
        .find_employee(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown employee".to_string()))?;
    let scope = state.directory.load_scope(&employee.emp_id).await?;

    let actor = Actor {
        employee,
        roles: claims.actor_roles(),
        scope,
    };
    Ok((claims, actor))
}
