use uuid::Uuid;

/// Credential kind for the Office 365 calendar integration.
pub const OFFICE365_CALENDAR: &str = "office365_calendar";

/// A stored third-party credential owned by a user.
///
/// `key` is the provider's token payload, kept opaque so provider-specific
/// fields survive round-tripping through the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub id: Uuid,
    pub kind: String,
    pub key: serde_json::Value,
    pub user_id: Uuid,
}

impl Credential {
    #[must_use]
    pub fn office365_calendar(user_id: Uuid, key: serde_json::Value) -> Self {
        Self { id: Uuid::new_v4(), kind: OFFICE365_CALENDAR.to_string(), key, user_id }
    }
}
