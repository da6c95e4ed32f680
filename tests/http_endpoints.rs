// tests/http_endpoints.rs
//
// Source fetch and webhook delivery against a local mock HTTP server.

use channel_relay::ingest::channel::ChannelReader;
use channel_relay::ingest::SourceReader;
use channel_relay::notify::discord::DiscordWebhook;
use channel_relay::notify::Sink;
use channel_relay::{DeliveryError, FetchError, Message, Source};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = include_str!("fixtures/channel_page.html");

fn message() -> Message {
    Message {
        timestamp: 1_709_294_400,
        text: "hello [click](https://example.com)".into(),
        photo: Some("https://cdn.example/p.jpg".into()),
        author: Some("Relay Test".into()),
        profile_picture: None,
        source_id: "relaytest".into(),
        color: 0x12_34_56,
    }
}

#[tokio::test]
async fn reader_fetches_base_url_plus_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/relaytest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/s/", server.uri());
    let reader = ChannelReader::from_url(Source::new("relaytest"), &base, reqwest::Client::new());
    assert_eq!(reader.url(), Some(format!("{base}relaytest").as_str()));

    let msgs = reader.fetch().await.expect("fetch ok");
    assert_eq!(msgs.len(), 3);
}

#[tokio::test]
async fn reader_maps_non_2xx_to_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let base = format!("{}/s/", server.uri());
    let reader = ChannelReader::from_url(Source::new("gone"), &base, reqwest::Client::new());
    match reader.fetch().await {
        Err(FetchError::Status { status, url }) => {
            assert_eq!(status, 503);
            assert!(url.ends_with("/s/gone"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn webhook_receives_embed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .and(body_json(json!({
            "embeds": [{
                "description": "hello [click](https://example.com)",
                "image": { "url": "https://cdn.example/p.jpg" },
                "color": 0x12_34_56,
                "timestamp": "2024-03-01T12:00:00Z"
            }],
            "username": "Relay Test"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sink = DiscordWebhook::new(
        format!("{}/api/webhooks/1/token", server.uri()),
        reqwest::Client::new(),
    )
    .with_timeout(5);
    sink.deliver(&message()).await.expect("delivered");
}

#[tokio::test]
async fn webhook_error_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let sink = DiscordWebhook::new(
        format!("{}/api/webhooks/1/secret", server.uri()),
        reqwest::Client::new(),
    );
    match sink.deliver(&message()).await {
        Err(DeliveryError::Status { status, endpoint }) => {
            assert_eq!(status, 500);
            assert!(!endpoint.contains("secret"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}
