//! End-to-end OAuth install flow through the HTTP router, with Slack mocked.

mod test_utils;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::Value;
use slack_relay::{
    exchange::ExchangeError,
    models::{Integration, OAuthState, Team},
    repositories::{IntegrationRepository, OAuthStateRepository, TeamRepository},
    state_token::StateToken,
};
use test_utils::{insert_client, setup_test_app, slack_token_body, state_param};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn get(app: &axum::Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn error_message(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    body["error"].as_str().unwrap().to_string()
}

async fn mock_slack_success(server: &MockServer, code: &str, team_id: &str, team_name: &str) {
    Mock::given(method("GET"))
        .and(path("/oauth.v2.access"))
        .and(query_param("code", code))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(slack_token_body(team_id, team_name, "U0001")),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn redirect_link_issues_slack_redirect() {
    let slack = MockServer::start().await;
    let (app, state) = setup_test_app(&slack.uri()).await.unwrap();
    let client = insert_client(state.db.clone(), "123.456", "secret").await.unwrap();

    let response = get(&app, &format!("/redirect-link?account_id=5&client_id={}", client.id)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with("https://slack.com/oauth/v2/authorize?"));
    assert!(location.contains("client_id=123.456"));
    assert!(location.contains("redirect_uri=https%3A%2F%2Frelay.test%2Fauthorization"));

    let token = StateToken::decode(&state_param(&location)).unwrap();
    assert_eq!((token.account_id, token.client_id), (5, client.id));
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn redirect_link_validation_messages() {
    let slack = MockServer::start().await;
    let (app, state) = setup_test_app(&slack.uri()).await.unwrap();

    let cases = [
        ("/redirect-link?client_id=1", "The account_id query parameter is required."),
        ("/redirect-link?account_id=x&client_id=1", "The account_id query parameter must be an integer."),
        ("/redirect-link?account_id=1", "The client_id query parameter is required."),
        ("/redirect-link?account_id=1&client_id=1.5", "The client_id query parameter must be an integer."),
        ("/redirect-link?account_id=0&client_id=1", "The account_id query parameter must be a positive integer."),
    ];

    for (uri, expected) in cases {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(error_message(response).await, expected, "{uri}");
    }

    assert_eq!(OAuthState::find().count(&*state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn redirect_link_unknown_client_is_500() {
    let slack = MockServer::start().await;
    let (app, state) = setup_test_app(&slack.uri()).await.unwrap();

    let response = get(&app, "/redirect-link?account_id=1&client_id=42").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        error_message(response).await,
        "Could not retrieve client info for client_id=42"
    );
    // The state row written before the lookup stays behind.
    assert_eq!(OAuthState::find().count(&*state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn full_install_then_replay_is_rejected() {
    let slack = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth.v2.access"))
        .and(query_param("client_id", "123.456"))
        .and(query_param("client_secret", "secret"))
        .and(query_param("code", "code-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(slack_token_body("T100", "Acme", "U0001")),
        )
        .mount(&slack)
        .await;

    let (app, state) = setup_test_app(&slack.uri()).await.unwrap();
    let client = insert_client(state.db.clone(), "123.456", "secret").await.unwrap();

    let link = get(&app, &format!("/redirect-link?account_id=9&client_id={}", client.id)).await;
    let location = link.headers()[header::LOCATION].to_str().unwrap().to_string();
    let state_token = state_param(&location);
    let callback = format!(
        "/authorization?code=code-1&state={}",
        urlencode(&state_token)
    );

    let response = get(&app, &callback).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(to_bytes(response.into_body(), usize::MAX).await.unwrap().is_empty());

    let integrations = IntegrationRepository::new(state.db.clone())
        .list_by_account(9)
        .await
        .unwrap();
    assert_eq!(integrations.len(), 1);
    assert_eq!(integrations[0].slack_user_id, "U0001");
    assert_eq!(integrations[0].access_token, "xoxp-U0001");
    assert_eq!(integrations[0].app_id, "A0TESTAPP");

    let state_id = StateToken::decode(&state_token).unwrap().state_id;
    let row = OAuthStateRepository::new(state.db.clone())
        .find_by_id(state_id)
        .await
        .unwrap()
        .unwrap();
    assert!(row.redeemed.is_some());

    let replay = get(&app, &callback).await;
    assert_eq!(replay.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        error_message(replay).await,
        format!(
            "Could not find the OAuth state for account_id=9, client_id={}",
            client.id
        )
    );
    assert_eq!(Integration::find().count(&*state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn two_installs_for_same_team_update_name_and_append_integrations() {
    let slack = MockServer::start().await;
    mock_slack_success(&slack, "first", "T200", "Old Name").await;
    mock_slack_success(&slack, "second", "T200", "New Name").await;

    let (app, state) = setup_test_app(&slack.uri()).await.unwrap();
    let client = insert_client(state.db.clone(), "123.456", "secret").await.unwrap();

    for code in ["first", "second"] {
        let link = get(&app, &format!("/redirect-link?account_id=3&client_id={}", client.id)).await;
        let location = link.headers()[header::LOCATION].to_str().unwrap().to_string();
        let callback = format!(
            "/authorization?code={code}&state={}",
            urlencode(&state_param(&location))
        );
        assert_eq!(get(&app, &callback).await.status(), StatusCode::NO_CONTENT);
    }

    assert_eq!(Team::find().count(&*state.db).await.unwrap(), 1);
    let team = TeamRepository::new(state.db.clone())
        .find_by_slack_team_id("T200")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(team.name, "New Name");

    let integrations = IntegrationRepository::new(state.db.clone())
        .list_by_account(3)
        .await
        .unwrap();
    assert_eq!(integrations.len(), 2);
    assert!(integrations.iter().all(|i| i.team_id == team.id));
}

#[tokio::test]
async fn concurrent_callbacks_redeem_at_most_once() {
    let slack = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth.v2.access"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(slack_token_body("T300", "Race", "U0003")),
        )
        .mount(&slack)
        .await;

    let (_app, state) = setup_test_app(&slack.uri()).await.unwrap();
    let client = insert_client(state.db.clone(), "123.456", "secret").await.unwrap();

    let url = state
        .exchange
        .build_authorization_link(4, client.id)
        .await
        .unwrap();
    let token = state_param(url.as_str());

    let (first, second) = tokio::join!(
        state.exchange.complete_authorization("code-a", &token),
        state.exchange.complete_authorization("code-b", &token),
    );

    let outcomes = [first, second];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(ExchangeError::StateNotFound { .. })))
    );
    assert_eq!(Integration::find().count(&*state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn callback_failures_are_500_with_messages() {
    let slack = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth.v2.access"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ok": false, "error": "invalid_code" })),
        )
        .mount(&slack)
        .await;

    let (app, state) = setup_test_app(&slack.uri()).await.unwrap();
    let client = insert_client(state.db.clone(), "123.456", "secret").await.unwrap();

    let garbage = get(&app, "/authorization?code=abc&state=%21%21%21").await;
    assert_eq!(garbage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(garbage).await, "Could not decode the state.");

    let missing_state = get(&app, "/authorization?code=abc").await;
    assert_eq!(missing_state.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(missing_state).await, "Could not decode the state.");

    let missing_code = get(&app, "/authorization?state=abc").await;
    assert_eq!(missing_code.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        error_message(missing_code).await,
        "The code query parameter is required."
    );

    let denied = get(&app, "/authorization?error=access_denied&state=abc").await;
    assert_eq!(denied.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(denied).await.contains("access_denied"));

    // Slack rejects the code: state remains unredeemed and nothing is stored.
    let url = state
        .exchange
        .build_authorization_link(6, client.id)
        .await
        .unwrap();
    let token = state_param(url.as_str());
    let rejected = get(&app, &format!("/authorization?code=bad&state={}", urlencode(&token))).await;
    assert_eq!(rejected.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(rejected).await.starts_with("Could not exchange the token"));

    let state_id = StateToken::decode(&token).unwrap().state_id;
    let row = OAuthStateRepository::new(state.db.clone())
        .find_by_id(state_id)
        .await
        .unwrap()
        .unwrap();
    assert!(row.redeemed.is_none());
    assert_eq!(Integration::find().count(&*state.db).await.unwrap(), 0);
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
