use cla_gate::mocks::sample_organization;
use cla_gate::{HostingClient, HostingPlatform, PlatformError};
use cla_gate_types::{CommitState, CommitStatus, OAuthToken};
use cla_gitlab::{GitLabConfig, GitLabPlatform};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> GitLabConfig {
    GitLabConfig {
        base_url: server.uri(),
        client_id: "app-id-0123456789".into(),
        client_secret: "app-secret-0123456789".into(),
        redirect_uri: "https://cla.example.org/v4/gitlab/oauth/callback".into(),
        page_size: 2,
        ..Default::default()
    }
}

fn token(access_token: &str) -> OAuthToken {
    OAuthToken {
        access_token: access_token.into(),
        refresh_token: "refresh".into(),
        token_type: "Bearer".into(),
        expires_in: None,
        created_at: None,
    }
}

#[tokio::test]
async fn refresh_exchanges_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=acme-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "token_type": "Bearer",
            "expires_in": 7200,
            "created_at": 1700000000,
            "scope": "api"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let platform = GitLabPlatform::new(config(&server)).unwrap();
    let token = platform
        .refresh_credential(&sample_organization("org-1", "acme"))
        .await
        .unwrap();

    assert_eq!(token.access_token, "new-access");
    assert_eq!(token.refresh_token, "new-refresh");
    assert_eq!(token.expires_in, Some(7200));
}

#[tokio::test]
async fn rejected_refresh_maps_to_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let platform = GitLabPlatform::new(config(&server)).unwrap();
    let err = platform
        .refresh_credential(&sample_organization("org-1", "acme"))
        .await
        .unwrap_err();

    match err {
        PlatformError::Status { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "invalid_grant");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_application_credentials_are_rejected() {
    let server = MockServer::start().await;
    let mut config = config(&server);
    config.client_secret.clear();

    let platform = GitLabPlatform::new(config).unwrap();
    let err = platform
        .refresh_credential(&sample_organization("org-1", "acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::Configuration(_)));
}

#[tokio::test]
async fn empty_access_token_cannot_build_client() {
    let server = MockServer::start().await;
    let platform = GitLabPlatform::new(config(&server)).unwrap();
    assert!(matches!(
        platform.new_client(&token("")).err().unwrap(),
        PlatformError::Configuration(_)
    ));
}

#[tokio::test]
async fn participants_follow_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/17/merge_requests/3/participants"))
        .and(query_param("page", "1"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-next-page", "2")
                .set_body_json(json!([
                    {"id": 1, "username": "alice", "name": "Alice"},
                    {"id": 2, "username": "bob", "name": "Bob"}
                ])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/17/merge_requests/3/participants"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-next-page", "")
                .set_body_json(json!([{"id": 3, "username": "carol"}])),
        )
        .mount(&server)
        .await;

    let platform = GitLabPlatform::new(config(&server)).unwrap();
    let client = platform.new_client(&token("tok")).unwrap();
    let participants = client.get_participants(17, 3).await.unwrap();

    let names: Vec<&str> = participants.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
    assert_eq!(participants[2].external_id, 3);
    assert!(participants[0].email.is_none());
}

#[tokio::test]
async fn latest_commit_is_first_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/17/merge_requests/3/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "newest", "title": "fix"},
            {"id": "older", "title": "init"}
        ])))
        .mount(&server)
        .await;

    let platform = GitLabPlatform::new(config(&server)).unwrap();
    let client = platform.new_client(&token("tok")).unwrap();
    assert_eq!(client.get_latest_commit(17, 3).await.unwrap().id, "newest");
}

#[tokio::test]
async fn merge_request_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/17/merge_requests/9"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"message\":\"404 Not found\"}"))
        .mount(&server)
        .await;

    let platform = GitLabPlatform::new(config(&server)).unwrap();
    let client = platform.new_client(&token("tok")).unwrap();
    let err = client.get_merge_request(17, 9).await.unwrap_err();
    assert!(matches!(err, PlatformError::Status { status: 404, .. }));
}

#[tokio::test]
async fn commit_status_and_note_are_posted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v4/projects/17/statuses/abc123"))
        .and(body_json(json!({
            "state": "failed",
            "name": "EasyCLA",
            "description": "Missing CLA Authorization",
            "target_url": "https://cla.example.org/sign"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/projects/17/merge_requests/3/notes"))
        .and(body_json(json!({"body": "hello"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let platform = GitLabPlatform::new(config(&server)).unwrap();
    let client = platform.new_client(&token("tok")).unwrap();
    client
        .set_commit_status(
            17,
            "abc123",
            &CommitStatus {
                state: CommitState::Failed,
                name: "EasyCLA".into(),
                description: "Missing CLA Authorization".into(),
                target_url: Some("https://cla.example.org/sign".into()),
            },
        )
        .await
        .unwrap();
    client.post_comment(17, 3, "hello").await.unwrap();
}

#[tokio::test]
async fn group_members_are_listed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/groups/555/members/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 4, "username": "dave", "access_level": 30}
        ])))
        .mount(&server)
        .await;

    let platform = GitLabPlatform::new(config(&server)).unwrap();
    let client = platform.new_client(&token("tok")).unwrap();
    let members = client.list_group_members(555).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].username, "dave");
}
