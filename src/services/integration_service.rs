use crate::config::MicrosoftGraphConfig;
use crate::domain::credential::Credential;
use crate::domain::oauth::OAuthState;
use crate::error::{AppError, Result};
use crate::services::graph::{CodeExchange, GraphClient, SCOPES};
use crate::storage::CredentialStore;
use opentelemetry::{global, metrics::Counter};
use serde_json::{Map, Value};
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    connect_total: Counter<u64>,
    callback_completed_total: Counter<u64>,
    callback_denied_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("cadence-server");
        Self {
            connect_total: meter
                .u64_counter("integration_connect_total")
                .with_description("Total number of authorize URLs issued")
                .build(),
            callback_completed_total: meter
                .u64_counter("integration_callback_completed_total")
                .with_description("Total number of callbacks that stored a credential")
                .build(),
            callback_denied_total: meter
                .u64_counter("integration_callback_denied_total")
                .with_description("Total number of token exchanges rejected by the provider")
                .build(),
        }
    }
}

/// Orchestrates the Office 365 calendar OAuth flow: authorize URL issuance,
/// code exchange, profile resolution and credential persistence.
#[derive(Clone, Debug)]
pub struct IntegrationService {
    config: MicrosoftGraphConfig,
    graph: Arc<dyn GraphClient>,
    credentials: Arc<dyn CredentialStore>,
    metrics: Metrics,
}

impl IntegrationService {
    #[must_use]
    pub fn new(
        config: MicrosoftGraphConfig,
        graph: Arc<dyn GraphClient>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self { config, graph, credentials, metrics: Metrics::new() }
    }

    /// Builds the provider authorize URL that starts the consent flow.
    pub fn connect_url(&self, state: Option<&OAuthState>) -> Result<String> {
        let mut url = Url::parse(&self.config.authorize_endpoint)
            .map_err(|e| AppError::Upstream(format!("invalid authorize endpoint: {e}")))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("redirect_uri", &self.config.redirect_uri());

        if let Some(state) = state {
            url.query_pairs_mut().append_pair("state", &state.encode()?);
        }

        self.metrics.connect_total.add(1, &[]);
        Ok(url.into())
    }

    /// Runs the callback pipeline for an authenticated user and returns the
    /// location to redirect the browser to.
    ///
    /// A provider rejection of the code exchange is recovered into an
    /// error-bearing redirect; every later failure propagates as a fault.
    #[tracing::instrument(err, skip(self, code, raw_state), fields(user_id = %user_id))]
    pub async fn handle_callback(&self, user_id: Uuid, code: &str, raw_state: Option<&str>) -> Result<String> {
        let mut payload = match self.graph.exchange_code(code).await? {
            CodeExchange::Denied(body) => {
                self.metrics.callback_denied_total.add(1, &[]);
                tracing::warn!("Token exchange rejected by provider");
                return provider_error_redirect(&body);
            }
            CodeExchange::Granted(payload) => payload,
        };

        let access_token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Upstream("token response missing access_token".to_string()))?
            .to_owned();

        let profile = self.graph.fetch_profile(&access_token).await?;
        normalize_token_payload(&mut payload, profile.email());

        let credential = Credential::office365_calendar(user_id, Value::Object(payload));
        self.credentials.create(credential).await?;

        self.metrics.callback_completed_total.add(1, &[]);
        tracing::info!("Calendar credential stored");

        let return_to = OAuthState::decode(raw_state).and_then(|state| state.return_to);
        Ok(return_to.unwrap_or_else(|| "/integrations".to_string()))
    }
}

/// Rewrites the provider token payload for storage: the relative `expires_in`
/// becomes an absolute `expiry_date` (Unix seconds) and the resolved email is
/// folded in. All other provider fields pass through untouched.
fn normalize_token_payload(payload: &mut Map<String, Value>, email: Option<String>) {
    let now = OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1_000_000_000.0;

    if let Some(expires_in) = payload.remove("expires_in").as_ref().and_then(Value::as_f64) {
        let expiry_date = (now + expires_in).round() as i64;
        payload.insert("expiry_date".to_string(), Value::from(expiry_date));
    }

    if let Some(email) = email {
        payload.insert("email".to_string(), Value::from(email));
    }
}

fn provider_error_redirect(body: &Value) -> Result<String> {
    let error = serde_json::to_string(body).map_err(|_| AppError::Internal)?;
    let query = url::form_urlencoded::Serializer::new(String::new()).append_pair("error", &error).finish();
    Ok(format!("/integrations?{query}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_payload() -> Map<String, Value> {
        let Value::Object(map) = json!({
            "token_type": "Bearer",
            "access_token": "T",
            "refresh_token": "R",
            "ext_expires_in": 3600,
            "expires_in": 3600,
        }) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn test_normalization_replaces_expires_in_with_expiry_date() {
        let mut payload = token_payload();
        let before = OffsetDateTime::now_utc().unix_timestamp();

        normalize_token_payload(&mut payload, Some("a@b.com".to_string()));

        let after = OffsetDateTime::now_utc().unix_timestamp();
        assert!(payload.get("expires_in").is_none());

        let expiry_date = payload["expiry_date"].as_i64().unwrap();
        assert!(expiry_date >= before + 3600 && expiry_date <= after + 3601);
    }

    #[test]
    fn test_normalization_folds_in_email() {
        let mut payload = token_payload();
        normalize_token_payload(&mut payload, Some("a@b.com".to_string()));
        assert_eq!(payload["email"], json!("a@b.com"));
    }

    #[test]
    fn test_normalization_skips_unresolved_email() {
        let mut payload = token_payload();
        normalize_token_payload(&mut payload, None);
        assert!(payload.get("email").is_none());
    }

    #[test]
    fn test_normalization_preserves_provider_fields() {
        let mut payload = token_payload();
        normalize_token_payload(&mut payload, Some("a@b.com".to_string()));
        assert_eq!(payload["refresh_token"], json!("R"));
        assert_eq!(payload["ext_expires_in"], json!(3600));
        assert_eq!(payload["token_type"], json!("Bearer"));
    }

    #[test]
    fn test_normalization_without_numeric_expires_in() {
        let Value::Object(mut payload) = json!({"access_token": "T", "expires_in": "soon"}) else {
            unreachable!()
        };
        normalize_token_payload(&mut payload, None);
        assert!(payload.get("expires_in").is_none());
        assert!(payload.get("expiry_date").is_none());
    }

    #[test]
    fn test_provider_error_redirect_encodes_body() {
        let target = provider_error_redirect(&json!({"error": "invalid_grant"})).unwrap();
        assert!(target.starts_with("/integrations?error="));

        let (_, query) = target.split_once('?').unwrap();
        let (key, value) = url::form_urlencoded::parse(query.as_bytes()).next().unwrap();
        assert_eq!(key, "error");
        assert_eq!(value, r#"{"error":"invalid_grant"}"#);
    }
}
