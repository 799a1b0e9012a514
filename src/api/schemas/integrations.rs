use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub url: String,
}
