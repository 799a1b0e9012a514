use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "CADENCE_DATABASE_URL")]
    pub database_url: String,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub msgraph: MicrosoftGraphConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "CADENCE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CADENCE_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management (health probe) server
    #[arg(long, env = "CADENCE_MGMT_PORT", default_value_t = 3001)]
    pub mgmt_port: u16,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Secret key shared with the web app that mints session JWTs
    #[arg(long, env = "CADENCE_JWT_SECRET")]
    pub jwt_secret: String,
}

#[derive(Clone, Debug, Args)]
pub struct MicrosoftGraphConfig {
    /// Application (client) ID of the Azure app registration
    #[arg(long, env = "MS_GRAPH_CLIENT_ID")]
    pub client_id: String,

    /// Client secret of the Azure app registration
    #[arg(long, env = "MS_GRAPH_CLIENT_SECRET")]
    pub client_secret: String,

    /// Public base URL of this deployment. The OAuth redirect URI is derived
    /// from it and must match the URI registered with the provider.
    #[arg(long, env = "CADENCE_BASE_URL")]
    pub base_url: String,

    /// Token endpoint of the Microsoft identity platform
    #[arg(
        long,
        env = "CADENCE_MS_TOKEN_ENDPOINT",
        default_value = "https://login.microsoftonline.com/common/oauth2/v2.0/token"
    )]
    pub token_endpoint: String,

    /// Authorization endpoint of the Microsoft identity platform
    #[arg(
        long,
        env = "CADENCE_MS_AUTHORIZE_ENDPOINT",
        default_value = "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
    )]
    pub authorize_endpoint: String,

    /// Base URL of the Microsoft Graph API
    #[arg(long, env = "CADENCE_MS_GRAPH_URL", default_value = "https://graph.microsoft.com/v1.0")]
    pub graph_base_url: String,
}

impl MicrosoftGraphConfig {
    /// The redirect URI registered with the provider for this integration.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}/api/integrations/office365calendar/callback", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the readiness database probe
    #[arg(long, env = "CADENCE_HEALTH_DB_TIMEOUT_MS", default_value_t = 2000)]
    pub db_timeout_ms: u64,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP endpoint for traces and metrics; telemetry export is disabled when unset
    #[arg(long, env = "CADENCE_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "CADENCE_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msgraph_config(base_url: &str) -> MicrosoftGraphConfig {
        MicrosoftGraphConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            base_url: base_url.to_string(),
            token_endpoint: "https://login.microsoftonline.com/common/oauth2/v2.0/token".to_string(),
            authorize_endpoint: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize".to_string(),
            graph_base_url: "https://graph.microsoft.com/v1.0".to_string(),
        }
    }

    #[test]
    fn test_redirect_uri_composition() {
        let config = msgraph_config("https://cadence.example.com");
        assert_eq!(
            config.redirect_uri(),
            "https://cadence.example.com/api/integrations/office365calendar/callback"
        );
    }

    #[test]
    fn test_redirect_uri_trailing_slash() {
        let config = msgraph_config("https://cadence.example.com/");
        assert_eq!(
            config.redirect_uri(),
            "https://cadence.example.com/api/integrations/office365calendar/callback"
        );
    }
}
