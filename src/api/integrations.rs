use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::integrations::ConnectResponse;
use crate::domain::oauth::OAuthState;
use crate::error::{AppError, Result};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect};
use axum::Json;

/// Starts the Office 365 calendar consent flow: responds with the provider
/// authorize URL for the frontend to send the browser to.
pub async fn connect(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse> {
    let oauth_state = params
        .into_iter()
        .find(|(key, _)| key == "returnTo")
        .map(|(_, return_to)| OAuthState { return_to: Some(return_to) });

    let url = state.integration_service.connect_url(oauth_state.as_ref())?;

    tracing::debug!(user_id = %auth_user.user_id, "issued authorize url");
    Ok(Json(ConnectResponse { url }))
}

/// OAuth redirect target. Exchanges the authorization code, resolves the
/// user's email via Graph, stores the credential and sends the browser back
/// to the app.
pub async fn callback(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse> {
    // The provider must deliver exactly one code value.
    let mut codes = params.iter().filter(|(key, _)| key == "code").map(|(_, value)| value);
    let code = match (codes.next(), codes.next()) {
        (Some(code), None) => code.clone(),
        _ => return Err(AppError::BadRequest("No code returned".to_string())),
    };

    let raw_state = params.iter().find(|(key, _)| key == "state").map(|(_, value)| value.as_str());

    let target = state.integration_service.handle_callback(auth_user.user_id, &code, raw_state).await?;

    Ok(Redirect::to(&target))
}
