use std::sync::Arc;

use http::{header::AUTHORIZATION, Method, StatusCode};
use serde_json::{json, Value};
use serendipity_request::mock::{MockOpts, MockTransport, Validator};
use serendipity_request::{CallContext, Response};
use serendipity_strava::{ActivityQuery, Error};

use crate::helpers::*;

const BASE: &str = "https://strava.test/api/v3";
const TOKEN_PATH: &str = "/api/v3/oauth/token";
const ACTIVITIES_PATH: &str = "/api/v3/athlete/activities";

fn script(responses: Vec<(u16, Value)>, validators: Vec<Validator>) -> MockTransport {
    let responses = responses
        .into_iter()
        .map(|(status, body)| {
            let status = StatusCode::from_u16(status).unwrap();
            Ok(Response::new(status, body.to_string()))
        })
        .collect();
    MockTransport::new(MockOpts {
        responses,
        validators,
        ..MockOpts::default()
    })
}

fn expect(name: &str, method: Method, path: &str) -> Validator {
    Validator {
        name: name.to_string(),
        expected_method: Some(method),
        expected_url_path: Some(path.to_string()),
        ..Validator::default()
    }
}

fn bearer(transport: &MockTransport, call: usize) -> String {
    let requests = transport.requests();
    requests[call]
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test(start_paused = true)]
async fn expired_token_is_refreshed_once_before_the_call() {
    init_tracing();
    let transport = script(
        vec![(200, refresh_body()), (200, json!([activity_body(1)]))],
        vec![
            expect("refresh", Method::POST, TOKEN_PATH),
            expect("list", Method::GET, ACTIVITIES_PATH),
        ],
    );
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), expired_tokens(), manager.clone(), params(BASE));

    let activities = client
        .list_activities(&CallContext::new(), &ActivityQuery::default())
        .await
        .expect("list failed");

    assert_eq!(activities.len(), 1);
    assert_eq!(transport.call_count(), 2);
    assert_eq!(client.tokens(), &new_tokens());
    assert_eq!(manager.saved(), vec![(USER_ID.to_string(), new_tokens())]);
    assert_eq!(bearer(&transport, 1), "Bearer new-access");

    let requests = transport.requests();
    assert_eq!(
        requests[0].url.query(),
        Some("client_id=mockClientId&client_secret=mockSecret&grant_type=refresh_token&refresh_token=old-refresh")
    );
    assert_eq!(requests[0].body.as_deref(), Some(&b"{}"[..]));
}

#[tokio::test(start_paused = true)]
async fn expired_token_is_refreshed_once_even_when_the_call_fails() {
    let transport = script(
        vec![(200, refresh_body()), (404, json!({"message": "Record Not Found"}))],
        vec![
            expect("refresh", Method::POST, TOKEN_PATH),
            expect("get", Method::GET, "/api/v3/activities/5"),
        ],
    );
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), expired_tokens(), manager.clone(), params(BASE));

    let err = client.get_activity(&CallContext::new(), 5).await.unwrap_err();

    assert!(matches!(err, Error::BadStatus { .. }), "unexpected error {err:?}");
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url.path(), TOKEN_PATH);
    assert_eq!(requests[1].method, Method::GET);
    assert_eq!(client.tokens(), &new_tokens());
    assert_eq!(manager.saved().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn proactive_and_reactive_refreshes_stack() {
    let transport = script(
        vec![
            (200, refresh_body()),
            (401, json!({"message": "Authorization Error"})),
            (200, refresh_body()),
            (401, json!({"message": "Authorization Error"})),
        ],
        vec![
            expect("proactive refresh", Method::POST, TOKEN_PATH),
            expect("first try", Method::GET, ACTIVITIES_PATH),
            expect("reactive refresh", Method::POST, TOKEN_PATH),
            expect("replay", Method::GET, ACTIVITIES_PATH),
        ],
    );
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), expired_tokens(), manager.clone(), params(BASE));

    let err = client
        .list_activities(&CallContext::new(), &ActivityQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unauthorized), "unexpected error {err:?}");
    assert_eq!(transport.call_count(), 4);
    assert_eq!(manager.saved().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn valid_token_is_not_refreshed() {
    let transport = script(vec![(200, json!([]))], vec![]);
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), valid_tokens(), manager.clone(), params(BASE));

    let activities = client
        .list_activities(&CallContext::new(), &ActivityQuery::default().page(2, 30))
        .await
        .unwrap();

    assert!(activities.is_empty());
    assert_eq!(transport.call_count(), 1);
    assert!(manager.saved().is_empty());
    assert_eq!(bearer(&transport, 0), "Bearer old-access");
    assert_eq!(transport.requests()[0].url.query(), Some("page=2&per_page=30"));
}

#[tokio::test(start_paused = true)]
async fn rejected_token_is_refreshed_and_the_call_replayed() {
    let transport = script(
        vec![
            (401, json!({"message": "Authorization Error"})),
            (200, refresh_body()),
            (200, activity_body(42)),
        ],
        vec![
            expect("first try", Method::GET, "/api/v3/activities/42"),
            expect("refresh", Method::POST, TOKEN_PATH),
            expect("replay", Method::GET, "/api/v3/activities/42"),
        ],
    );
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), valid_tokens(), manager.clone(), params(BASE));

    let activity = client
        .get_activity(&CallContext::new(), 42)
        .await
        .expect("get failed");

    assert_eq!(activity.id, 42);
    assert_eq!(activity.description.as_deref(), Some("along the river"));
    assert_eq!(transport.call_count(), 3);
    assert_eq!(bearer(&transport, 0), "Bearer old-access");
    assert_eq!(bearer(&transport, 2), "Bearer new-access");
    assert_eq!(manager.saved().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_twice_gives_up_after_one_refresh() {
    let transport = script(
        vec![
            (401, json!({"message": "Authorization Error"})),
            (200, refresh_body()),
            (401, json!({"message": "Authorization Error"})),
        ],
        vec![],
    );
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), valid_tokens(), manager.clone(), params(BASE));

    let err = client
        .list_activities(&CallContext::new(), &ActivityQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unauthorized), "unexpected error {err:?}");
    assert_eq!(transport.call_count(), 3);
    assert_eq!(manager.saved().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn no_replays_allowed_means_no_refresh() {
    let transport = script(vec![(401, json!({}))], vec![]);
    let mut params = params(BASE);
    params.max_unauthorized_retries = 0;
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), valid_tokens(), manager.clone(), params);

    let err = client.get_activity(&CallContext::new(), 7).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(transport.call_count(), 1);
    assert!(manager.saved().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_forced_refresh_is_returned() {
    let transport = script(
        vec![
            (401, json!({})),
            (400, json!({"message": "Bad Request", "errors": [{"field": "refresh_token"}]})),
        ],
        vec![],
    );
    let manager = Arc::new(RecordingTokenManager::default());
    let tokens = valid_tokens();
    let mut client = client(transport.clone(), tokens.clone(), manager.clone(), params(BASE));

    let err = client.get_activity(&CallContext::new(), 7).await.unwrap_err();

    match &err {
        Error::Refresh(inner) => {
            assert_eq!(inner.status(), Some(StatusCode::BAD_REQUEST));
            assert_eq!(inner.reason().unwrap()["message"], "Bad Request");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(transport.call_count(), 2);
    assert_eq!(client.tokens(), &tokens);
    assert!(manager.saved().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_proactive_refresh_does_not_stop_the_call() {
    let transport = script(
        vec![(500, json!({})), (400, json!({})), (200, json!([]))],
        vec![],
    );
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), expired_tokens(), manager.clone(), params(BASE));

    let activities = client
        .list_activities(&CallContext::new(), &ActivityQuery::default())
        .await
        .expect("list failed");

    assert!(activities.is_empty());
    // a retried 500 then a 400 for the refresh, then the call itself
    assert_eq!(transport.call_count(), 3);
    assert_eq!(bearer(&transport, 2), "Bearer old-access");
}

#[tokio::test(start_paused = true)]
async fn failed_proactive_refresh_is_logged_as_an_error_once() {
    let (logs, _guard) = capture_logs();
    let transport = script(vec![(400, json!({})), (200, json!([]))], vec![]);
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), expired_tokens(), manager, params(BASE));

    client
        .list_activities(&CallContext::new(), &ActivityQuery::default())
        .await
        .expect("list failed");

    let logs = String::from_utf8(logs.lock().unwrap().clone()).unwrap();
    assert_eq!(logs.matches("ERROR").count(), 1, "{logs}");
    assert!(logs.contains("unable to refresh Strava access token"), "{logs}");
    assert!(logs.contains("proceeding with stale access token"), "{logs}");
}

#[tokio::test(start_paused = true)]
async fn storage_failure_does_not_fail_the_refresh() {
    let transport = script(vec![(200, refresh_body())], vec![]);
    let manager = Arc::new(RecordingTokenManager::failing());
    let mut client = client(transport.clone(), valid_tokens(), manager.clone(), params(BASE));

    client
        .refresh_access_token(&CallContext::new())
        .await
        .expect("refresh failed");

    assert_eq!(client.tokens(), &new_tokens());
    assert_eq!(manager.saved().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn other_client_errors_do_not_refresh() {
    let transport = script(vec![(404, json!({"message": "Record Not Found"}))], vec![]);
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), valid_tokens(), manager.clone(), params(BASE));

    let err = client.get_activity(&CallContext::new(), 7).await.unwrap_err();

    match &err {
        Error::BadStatus { status, reason, .. } => {
            assert_eq!(status.code(), StatusCode::NOT_FOUND);
            assert_eq!(reason, &Some(json!({"message": "Record Not Found"})));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(transport.call_count(), 1);
    assert!(manager.saved().is_empty());
}

#[tokio::test(start_paused = true)]
async fn server_errors_are_retried_by_the_executor() {
    let transport = script(vec![(503, json!({})), (200, activity_body(3))], vec![]);
    let manager = Arc::new(RecordingTokenManager::default());
    let mut client = client(transport.clone(), valid_tokens(), manager, params(BASE));

    let activity = client.get_activity(&CallContext::new(), 3).await.unwrap();

    assert_eq!(activity.id, 3);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn generate_tokens_leaves_the_snapshot_alone() {
    let body = json!({
        "token_type": "Bearer",
        "expires_at": 1568775134,
        "expires_in": 21600,
        "refresh_token": "first-refresh",
        "access_token": "first-access",
        "athlete": {"id": 1, "username": "marianne", "firstname": "Marianne"}
    });
    let transport = script(
        vec![(200, body)],
        vec![expect("exchange", Method::POST, TOKEN_PATH)],
    );
    let manager = Arc::new(RecordingTokenManager::default());
    let tokens = valid_tokens();
    let client = client(transport.clone(), tokens.clone(), manager.clone(), params(BASE));

    let res = client
        .generate_tokens(&CallContext::new(), "auth-code")
        .await
        .expect("exchange failed");

    assert_eq!(res.access_token, "first-access");
    assert_eq!(res.athlete.username.as_deref(), Some("marianne"));
    assert_eq!(client.tokens(), &tokens);
    assert!(manager.saved().is_empty());
    assert_eq!(
        transport.requests()[0].url.query(),
        Some("client_id=mockClientId&client_secret=mockSecret&code=auth-code&grant_type=authorization_code")
    );
}

#[tokio::test(start_paused = true)]
async fn generate_tokens_reports_bad_status() {
    let transport = script(vec![(401, json!({"message": "Authorization Error"}))], vec![]);
    let client = client(
        transport.clone(),
        valid_tokens(),
        Arc::new(RecordingTokenManager::default()),
        params(BASE),
    );

    let err = client
        .generate_tokens(&CallContext::new(), "bad-code")
        .await
        .unwrap_err();

    // token endpoints never take the refresh path
    assert!(matches!(err, Error::BadStatus { .. }));
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(transport.call_count(), 1);
}
