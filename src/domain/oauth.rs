use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Ephemeral state threaded through the OAuth flow via the `state` query
/// parameter, carrying the location to send the browser back to afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
}

impl OAuthState {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|_| AppError::Internal)
    }

    /// Decodes state from the raw query value. Absent or undecodable state
    /// yields `None`; the caller falls back to the default redirect.
    #[must_use]
    pub fn decode(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|raw| serde_json::from_str(raw).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        let state = OAuthState { return_to: Some("/bookings".to_string()) };
        let encoded = state.encode().unwrap();
        let decoded = OAuthState::decode(Some(&encoded)).unwrap();

        assert_eq!(state, decoded);
    }

    #[test]
    fn test_encode_omits_absent_return_to() {
        let state = OAuthState::default();
        assert_eq!(state.encode().unwrap(), "{}");
    }

    #[test]
    fn test_decode_absent_state() {
        assert_eq!(OAuthState::decode(None), None);
    }

    #[test]
    fn test_decode_malformed_state() {
        assert_eq!(OAuthState::decode(Some("not json")), None);
    }
}
