//! End-to-end service tests: transport event in, published reply out
//!
//! Runs inbound messages through routing, decoding, site filtering,
//! handling, and assembly with a capture publisher standing in for the
//! broker.

mod helpers;

use helpers::{candidate, CapturePublisher, StubBackend, WordBehavior};

use g2p_common::messages::{G2pError, G2pPhonemes};
use g2p_hermes::dictionary::PronunciationDictionary;
use g2p_hermes::handler::RequestHandler;
use g2p_hermes::service::G2pService;
use g2p_hermes::transport::InboundMessage;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn service_with(
    backend: StubBackend,
    site_ids: Vec<String>,
) -> (G2pService, Arc<CapturePublisher>, Arc<StubBackend>) {
    let backend = Arc::new(backend);
    let publisher = Arc::new(CapturePublisher::new());
    let handler = Arc::new(RequestHandler::new(
        backend.clone(),
        Arc::new(PronunciationDictionary::new()),
        Duration::from_millis(500),
        Duration::from_millis(2_000),
    ));
    let service = G2pService::new(handler, publisher.clone(), site_ids);
    (service, publisher, backend)
}

fn pronounce_message(topic: &str, payload: serde_json::Value) -> InboundMessage {
    InboundMessage {
        topic: topic.to_string(),
        payload: serde_json::to_vec(&payload).unwrap(),
    }
}

#[tokio::test]
async fn test_round_trip_identity() {
    let (service, publisher, _backend) = service_with(
        StubBackend::new().with_behavior(
            "tomato",
            WordBehavior::Candidates(vec![candidate("tomato", &["T", "AH"], 1.0)]),
        ),
        Vec::new(),
    );

    service
        .process(pronounce_message(
            "hermes/g2p/kitchen/pronounce",
            serde_json::json!({
                "requestId": "req-42",
                "words": ["tomato"],
                "siteId": "kitchen",
                "sessionId": "sess-7",
                "numGuesses": 2
            }),
        ))
        .await;

    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "hermes/g2p/kitchen/pronunciation");

    let payload: G2pPhonemes = serde_json::from_slice(&messages[0].1).unwrap();
    assert_eq!(payload.request_id, "req-42");
    assert_eq!(payload.site_id, "kitchen");
    assert_eq!(payload.session_id.as_deref(), Some("sess-7"));
}

#[tokio::test]
async fn test_response_covers_all_words_on_the_wire() {
    let (service, publisher, _backend) = service_with(
        StubBackend::new()
            .with_behavior(
                "good",
                WordBehavior::Candidates(vec![
                    candidate("good", &["G", "UH", "D"], 1.0),
                    candidate("good", &["G", "UW", "D"], 2.0),
                ]),
            )
            .with_behavior("bad", WordBehavior::Timeout),
        Vec::new(),
    );

    service
        .process(pronounce_message(
            "hermes/g2p/default/pronounce",
            serde_json::json!({
                "requestId": "req-1",
                "words": ["good", "bad"],
                "siteId": "default"
            }),
        ))
        .await;

    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    let payload: G2pPhonemes = serde_json::from_slice(&messages[0].1).unwrap();

    // Both candidate entries for "good" plus the empty marker for "bad".
    let words: HashSet<&str> = payload.results.iter().map(|r| r.word.as_str()).collect();
    assert_eq!(words, HashSet::from(["good", "bad"]));
    let bad_entries: Vec<_> = payload
        .results
        .iter()
        .filter(|r| r.word == "bad")
        .collect();
    assert_eq!(bad_entries.len(), 1);
    assert!(bad_entries[0].phonemes.is_empty());
}

#[tokio::test]
async fn test_unknown_topic_is_ignored() {
    let (service, publisher, backend) = service_with(StubBackend::new(), Vec::new());

    service
        .process(InboundMessage {
            topic: "hermes/asr/startListening".to_string(),
            payload: b"{}".to_vec(),
        })
        .await;

    assert!(publisher.messages().is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_undecodable_payload_yields_invalid_request_error() {
    let (service, publisher, backend) = service_with(StubBackend::new(), Vec::new());

    service
        .process(InboundMessage {
            topic: "hermes/g2p/kitchen/pronounce".to_string(),
            payload: b"not json at all".to_vec(),
        })
        .await;

    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "hermes/error/g2p");

    let payload: G2pError = serde_json::from_slice(&messages[0].1).unwrap();
    assert!(payload.error.starts_with("invalidRequest:"));
    // correlation id unknown, but the site still comes from the topic
    assert_eq!(payload.request_id, "");
    assert_eq!(payload.site_id, "kitchen");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_missing_words_yields_invalid_request_without_backend_calls() {
    let (service, publisher, backend) = service_with(StubBackend::new(), Vec::new());

    service
        .process(pronounce_message(
            "hermes/g2p/kitchen/pronounce",
            serde_json::json!({ "requestId": "req-9", "siteId": "kitchen" }),
        ))
        .await;

    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "hermes/error/g2p");

    let payload: G2pError = serde_json::from_slice(&messages[0].1).unwrap();
    assert_eq!(payload.request_id, "req-9");
    assert!(payload.error.starts_with("invalidRequest:"));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_backend_unavailable_publishes_single_error() {
    let (service, publisher, _backend) = service_with(
        StubBackend::new()
            .with_behavior("alpha", WordBehavior::Unavailable)
            .with_behavior("beta", WordBehavior::Unavailable),
        Vec::new(),
    );

    service
        .process(pronounce_message(
            "hermes/g2p/default/pronounce",
            serde_json::json!({
                "requestId": "req-5",
                "words": ["alpha", "beta"],
                "siteId": "default"
            }),
        ))
        .await;

    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "hermes/error/g2p");

    let payload: G2pError = serde_json::from_slice(&messages[0].1).unwrap();
    assert!(payload.error.starts_with("backendUnavailable:"));
    assert_eq!(payload.context, "alpha,beta");
}

#[tokio::test]
async fn test_foreign_site_is_filtered_out() {
    let (service, publisher, backend) =
        service_with(StubBackend::new(), vec!["kitchen".to_string()]);

    service
        .process(pronounce_message(
            "hermes/g2p/garage/pronounce",
            serde_json::json!({
                "requestId": "req-3",
                "words": ["tomato"],
                "siteId": "garage"
            }),
        ))
        .await;

    assert!(publisher.messages().is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_site_id_falls_back_to_topic_segment() {
    let (service, publisher, _backend) = service_with(
        StubBackend::new().with_behavior(
            "tomato",
            WordBehavior::Candidates(vec![candidate("tomato", &["T"], 1.0)]),
        ),
        Vec::new(),
    );

    service
        .process(pronounce_message(
            "hermes/g2p/bedroom/pronounce",
            serde_json::json!({ "requestId": "req-8", "words": ["tomato"] }),
        ))
        .await;

    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "hermes/g2p/bedroom/pronunciation");

    let payload: G2pPhonemes = serde_json::from_slice(&messages[0].1).unwrap();
    assert_eq!(payload.site_id, "bedroom");
}
