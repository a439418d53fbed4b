use chrono::{TimeZone, Utc};
use httpmock::prelude::*;
use pulse_core::{CancellationToken, IssueRef};
use pulse_github::{GithubApiClient, GithubApiError, GithubClientConfig, IssueFetcher};
use pulse_transport::RetryPolicy;
use serde_json::json;

fn client_for(server: &MockServer, token: &str) -> GithubApiClient {
    GithubApiClient::new(GithubClientConfig {
        api_base: server.base_url(),
        token: token.to_string(),
        request_timeout_ms: 5_000,
        retry: RetryPolicy {
            max_retries: 2,
            base_delay_ms: 5,
            jitter_fraction: 0.0,
            rate_limit_wait_ms: 5,
        },
    })
    .expect("client")
}

fn comment_json(id: u64, created_at: &str, body: &str) -> serde_json::Value {
    json!({
        "id": id,
        "body": body,
        "created_at": created_at,
        "html_url": format!("https://github.com/acme/widgets/issues/7#issuecomment-{id}"),
        "user": { "login": "dev" }
    })
}

#[tokio::test]
async fn integration_fetch_issue_metadata_maps_labels_and_assignees() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/widgets/issues/7")
            .header("authorization", "Bearer secret")
            .header("x-github-api-version", "2022-11-28");
        then.status(200).json_body(json!({
            "number": 7,
            "title": "Ship the widget",
            "html_url": "https://github.com/acme/widgets/issues/7",
            "labels": [{ "name": "epic" }, { "name": "q3" }],
            "assignees": [{ "login": "alice" }]
        }));
    });

    let metadata = client_for(&server, "secret")
        .fetch_issue_metadata(&IssueRef::new("acme", "widgets", 7), &CancellationToken::new())
        .await
        .expect("metadata");

    mock.assert_calls(1);
    assert_eq!(metadata.title, "Ship the widget");
    assert_eq!(metadata.labels, vec!["epic".to_string(), "q3".to_string()]);
    assert_eq!(metadata.assignees, vec!["alice".to_string()]);
}

#[tokio::test]
async fn functional_fetch_comments_paginates_and_filters_by_creation_time() {
    let server = MockServer::start();
    let first_page = (0..100)
        .map(|index| comment_json(index + 1, "2024-05-02T10:00:00Z", "page one"))
        .collect::<Vec<_>>();
    let page_one = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/widgets/issues/7/comments")
            .query_param("since", "2024-05-01T00:00:00Z")
            .query_param("per_page", "100")
            .query_param("page", "1");
        then.status(200).json_body(json!(first_page));
    });
    let page_two = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/widgets/issues/7/comments")
            .query_param("page", "2");
        then.status(200).json_body(json!([
            comment_json(500, "2024-04-20T09:00:00Z", "edited recently, created before window"),
            comment_json(501, "2024-05-01T00:00:00Z", "exactly on the boundary"),
            comment_json(502, "not-a-date", "broken timestamp"),
        ]));
    });

    let since = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).single().expect("since");
    let comments = client_for(&server, "")
        .fetch_comments_since(
            &IssueRef::new("acme", "widgets", 7),
            since,
            &CancellationToken::new(),
        )
        .await
        .expect("comments");

    page_one.assert_calls(1);
    page_two.assert_calls(1);
    assert_eq!(comments.len(), 101);
    assert_eq!(comments[0].body, "exactly on the boundary");
    assert!(comments.iter().all(|comment| comment.created_at >= since));
    assert!(comments
        .windows(2)
        .all(|pair| pair[0].created_at <= pair[1].created_at));
}

#[tokio::test]
async fn regression_missing_issue_reports_actionable_not_found() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/issues/404");
        then.status(404).body("{\"message\":\"Not Found\"}");
    });

    let error = client_for(&server, "secret")
        .fetch_issue_metadata(
            &IssueRef::new("acme", "widgets", 404),
            &CancellationToken::new(),
        )
        .await
        .expect_err("missing issue");

    mock.assert_calls(1);
    assert!(matches!(error, GithubApiError::NotFound { .. }));
    assert!(error.to_string().contains("acme/widgets#404"));
}

#[tokio::test]
async fn regression_bad_credentials_fail_without_retry() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/issues/7/comments");
        then.status(401).body("{\"message\":\"Bad credentials\"}");
    });

    let error = client_for(&server, "expired")
        .fetch_comments_since(
            &IssueRef::new("acme", "widgets", 7),
            Utc::now(),
            &CancellationToken::new(),
        )
        .await
        .expect_err("unauthorized");

    mock.assert_calls(1);
    assert!(matches!(error, GithubApiError::Unauthorized { .. }));
    assert_eq!(error.status(), Some(401));
}

#[tokio::test]
async fn integration_server_errors_retry_then_surface_transport_error() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/issues/7");
        then.status(502).body("bad gateway");
    });

    let error = client_for(&server, "")
        .fetch_issue_metadata(&IssueRef::new("acme", "widgets", 7), &CancellationToken::new())
        .await
        .expect_err("exhausted");

    mock.assert_calls(3);
    assert!(matches!(error, GithubApiError::Transport(_)));
    assert_eq!(error.status(), Some(502));
}
