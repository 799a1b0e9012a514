use crate::config::MicrosoftGraphConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Scopes requested for the calendar integration. `offline_access` makes the
/// provider issue a refresh token alongside the access token.
pub const SCOPES: [&str; 3] = ["offline_access", "Calendars.Read", "Calendars.ReadWrite"];

const FORM_URLENCODED_UTF8: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Outcome of the authorization-code exchange.
///
/// A provider rejection is not a fault: the callback recovers from it by
/// redirecting the browser with the provider's error body.
#[derive(Debug)]
pub enum CodeExchange {
    /// 2xx from the token endpoint; the raw JSON object of the response.
    Granted(Map<String, Value>),
    /// Non-2xx from the token endpoint; the JSON body as returned.
    Denied(Value),
}

/// The authenticated user as reported by the Graph `/me` endpoint.
#[derive(Debug, Deserialize)]
pub struct Profile {
    pub mail: Option<String>,
    #[serde(rename = "userPrincipalName")]
    pub user_principal_name: Option<String>,
}

impl Profile {
    /// In some tenants `mail` is null; `userPrincipalName` then usually
    /// carries the address.
    #[must_use]
    pub fn email(self) -> Option<String> {
        self.mail.or(self.user_principal_name)
    }
}

/// Outbound operations against the Microsoft identity platform and Graph API.
#[async_trait]
pub trait GraphClient: Send + Sync + std::fmt::Debug {
    async fn exchange_code(&self, code: &str) -> Result<CodeExchange>;
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile>;
}

#[derive(Clone, Debug)]
pub struct MicrosoftGraphClient {
    client: reqwest::Client,
    config: MicrosoftGraphConfig,
}

impl MicrosoftGraphClient {
    #[must_use]
    pub fn new(config: MicrosoftGraphConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }
}

#[async_trait]
impl GraphClient for MicrosoftGraphClient {
    async fn exchange_code(&self, code: &str) -> Result<CodeExchange> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("redirect_uri", &self.config.redirect_uri())
            .append_pair("client_secret", &self.config.client_secret)
            .finish();

        let response = self
            .client
            .post(&self.config.token_endpoint)
            .header(header::CONTENT_TYPE, FORM_URLENCODED_UTF8)
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("token request failed: {e}")))?;

        // The token endpoint reports grant errors as JSON too, so the body is
        // parsed regardless of status.
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("token response was not JSON: {e}")))?;

        if !status.is_success() {
            return Ok(CodeExchange::Denied(payload));
        }

        match payload {
            Value::Object(map) => Ok(CodeExchange::Granted(map)),
            _ => Err(AppError::Upstream("token endpoint returned a non-object body".to_string())),
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile> {
        let url = format!("{}/me", self.config.graph_base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("profile request failed: {e}")))?;

        response.json().await.map_err(|e| AppError::Upstream(format!("profile response was not JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_prefers_mail() {
        let profile: Profile =
            serde_json::from_value(serde_json::json!({"mail": "a@b.com", "userPrincipalName": "a@b.onmicrosoft.com"}))
                .unwrap();
        assert_eq!(profile.email().as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_email_falls_back_to_user_principal_name() {
        let profile: Profile =
            serde_json::from_value(serde_json::json!({"mail": null, "userPrincipalName": "a@b.onmicrosoft.com"}))
                .unwrap();
        assert_eq!(profile.email().as_deref(), Some("a@b.onmicrosoft.com"));
    }

    #[test]
    fn test_email_absent_when_profile_has_neither() {
        let profile: Profile = serde_json::from_value(serde_json::json!({"displayName": "A B"})).unwrap();
        assert_eq!(profile.email(), None);
    }
}
