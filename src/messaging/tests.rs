use super::*;
use crate::messaging::models::{Notification, WebpushConfig, WebpushNotification};
use crate::testing::service_account_key;
use httpmock::prelude::*;
use reqwest_middleware::ClientBuilder;
use serde_json::json;

const SEND_PATH: &str = "/v1/projects/test-project/messages:send";

fn plain_messaging(server: &MockServer) -> FirebaseMessaging {
    let client = ClientBuilder::new(reqwest::Client::new()).build();
    FirebaseMessaging::new_with_client(client, server.url(SEND_PATH))
}

fn your_turn(token: &str) -> Message {
    Message {
        webpush: Some(WebpushConfig {
            notification: Some(WebpushNotification {
                icon: Some("/logo.jpeg".into()),
            }),
        }),
        ..Message::to_token(
            token,
            Notification {
                title: Some("It's Your Turn".into()),
                body: Some("Please proceed to the room.".into()),
                image: None,
            },
        )
    }
}

#[tokio::test]
async fn test_send_message_with_service_account_token() {
    let server = MockServer::start_async().await;

    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "access_token": "fake-token",
                    "token_type": "Bearer",
                    "expires_in": 3600
                }));
        })
        .await;

    let send_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SEND_PATH)
                .header("authorization", "Bearer fake-token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "name": "projects/test-project/messages/1" }));
        })
        .await;

    let middleware = AuthMiddleware::new(service_account_key(&server.url("/token")));
    let messaging =
        FirebaseMessaging::new_with_client(authorized_client(middleware), server.url(SEND_PATH));

    let name = messaging.send(&your_turn("device-token")).await.unwrap();
    assert_eq!(name, "projects/test-project/messages/1");

    // Second send reuses the cached access token.
    messaging.send(&your_turn("device-token")).await.unwrap();

    token_mock.assert_hits_async(1).await;
    send_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_send_request_shape() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_PATH).json_body(json!({
                "validate_only": false,
                "message": {
                    "token": "device-token",
                    "notification": {
                        "title": "It's Your Turn",
                        "body": "Please proceed to the room."
                    },
                    "webpush": {
                        "notification": { "icon": "/logo.jpeg" }
                    }
                }
            }));
            then.status(200)
                .json_body(json!({ "name": "projects/test-project/messages/2" }));
        })
        .await;

    let messaging = plain_messaging(&server);
    let name = messaging.send(&your_turn("device-token")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(name, "projects/test-project/messages/2");
}

#[tokio::test]
async fn test_dry_run_sets_validate_only() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SEND_PATH)
                .body_includes("\"validate_only\":true");
            then.status(200)
                .json_body(json!({ "name": "projects/test-project/messages/fake" }));
        })
        .await;

    let messaging = plain_messaging(&server);
    messaging.send_dry_run(&your_turn("device-token")).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_send_reports_unregistered_token() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_PATH);
            then.status(404).json_body(json!({
                "error": {
                    "code": 404,
                    "message": "Requested entity was not found.",
                    "status": "NOT_FOUND"
                }
            }));
        })
        .await;

    let messaging = plain_messaging(&server);
    let err = messaging.send(&your_turn("stale-token")).await.unwrap_err();

    match err {
        MessagingError::ApiError(msg) => {
            assert!(msg.contains("Requested entity was not found."));
            assert!(msg.contains("NOT_FOUND"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_rejects_message_without_single_target() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_PATH);
            then.status(200).json_body(json!({ "name": "unused" }));
        })
        .await;
    let messaging = plain_messaging(&server);

    let no_target = Message::default();
    assert!(matches!(
        messaging.send(&no_target).await,
        Err(MessagingError::InvalidMessage(_))
    ));

    let blank_token = your_turn("  ");
    assert!(matches!(
        messaging.send(&blank_token).await,
        Err(MessagingError::InvalidMessage(_))
    ));

    let two_targets = Message {
        topic: Some("clinic".into()),
        ..your_turn("device-token")
    };
    assert!(matches!(
        messaging.send(&two_targets).await,
        Err(MessagingError::InvalidMessage(_))
    ));

    mock.assert_hits_async(0).await;
}
