use crate::api::AppState;
use crate::domain::auth::Claims;
use crate::error::AppError;
use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Request, header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Name of the session cookie set by the Cadence web app.
pub const SESSION_COOKIE: &str = "cadence_session";

/// The signed-in user, resolved from the ambient session.
#[derive(Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).ok_or(AppError::AuthError)?;
        let claims = Claims::decode(&token, &state.config.auth.jwt_secret)?;

        tracing::Span::current().record("user_id", tracing::field::display(claims.sub));

        Ok(AuthUser { user_id: claims.sub })
    }
}

/// The session JWT travels in the session cookie; a bearer header is accepted
/// as a fallback for non-browser clients.
fn session_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    let auth_str = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    auth_str.strip_prefix("Bearer ").map(str::to_string)
}

/// Reuses an inbound `x-request-id` header, generating a UUID otherwise.
#[derive(Clone, Copy, Debug)]
pub struct MakeRequestUuidOrHeader;

impl MakeRequestId for MakeRequestUuidOrHeader {
    fn make_request_id<B>(&mut self, request: &Request<B>) -> Option<RequestId> {
        if let Some(id) = request.headers().get("x-request-id") {
            return Some(RequestId::new(id.clone()));
        }

        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}
