use reqwest::StatusCode;
use reqwest::header::COOKIE;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_connect_requires_session() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(app.connect_url()).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"message": "You must be logged in to do this"}));
}

#[tokio::test]
async fn test_connect_accepts_bearer_session() {
    let app = common::TestApp::spawn().await;
    let cookie = app.session_cookie(Uuid::new_v4());
    let token = cookie.strip_prefix("cadence_session=").unwrap();

    let resp = app.client.get(app.connect_url()).bearer_auth(token).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_connect_returns_authorize_url() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .get(format!("{}?returnTo=/bookings", app.connect_url()))
        .header(COOKIE, app.session_cookie(Uuid::new_v4()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    let url = url::Url::parse(body["url"].as_str().unwrap()).unwrap();
    assert!(url.as_str().starts_with(&app.config.msgraph.authorize_endpoint));

    let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs["response_type"], "code");
    assert_eq!(pairs["client_id"], "test-client-id");
    assert_eq!(pairs["scope"], "offline_access Calendars.Read Calendars.ReadWrite");
    assert_eq!(
        pairs["redirect_uri"],
        format!("{}/api/integrations/office365calendar/callback", common::BASE_URL)
    );
    assert_eq!(pairs["state"], r#"{"returnTo":"/bookings"}"#);
}

#[tokio::test]
async fn test_connect_without_return_to_omits_state() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .get(app.connect_url())
        .header(COOKIE, app.session_cookie(Uuid::new_v4()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    let url = url::Url::parse(body["url"].as_str().unwrap()).unwrap();
    assert!(url.query_pairs().all(|(key, _)| key != "state"));
}
