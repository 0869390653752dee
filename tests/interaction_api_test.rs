//! Integration tests for the app interaction endpoints
//!
//! Requests go through the full router against an in-memory store with a
//! pinned clock.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use interaction_tsdb::http::build_router;
use interaction_tsdb::interaction::{InMemoryAppRegistry, InteractionService, SentryApp};
use interaction_tsdb::tsdb::{InMemoryTsdb, ManualClock, ModelRollups, Rollup, Timestamp, TsdbBackend};

const NOW: i64 = 1_700_000_000;
const ORG: u64 = 42;

fn test_app() -> (Router, Arc<InMemoryTsdb<ManualClock>>) {
    let store = Arc::new(InMemoryTsdb::with_clock(
        ModelRollups::uniform(Rollup::defaults()),
        ManualClock::new(Timestamp::from_secs(NOW as u64)),
    ));

    let registry = InMemoryAppRegistry::new();
    for (id, slug, components) in [
        (1, "acme-ci", vec!["issue-link", "stacktrace-link"]),
        (2, "beta-ci", vec!["stacktrace-link", "issue-link"]),
        (3, "quiet-app", vec![]),
    ] {
        registry
            .register_app(SentryApp {
                id,
                slug: slug.to_string(),
                owner_id: ORG,
            })
            .unwrap();
        for component in components {
            registry.register_component(id, component).unwrap();
        }
    }

    let service = Arc::new(InteractionService::new(store.clone(), Arc::new(registry)));
    (build_router(service), store)
}

fn interaction_uri(slug: &str) -> String {
    format!("/api/0/sentry-apps/{}/interaction/", slug)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn detail(body: &Value) -> &str {
    body["detail"].as_str().unwrap_or_default()
}

fn counts(series: &Value) -> Vec<u64> {
    series
        .as_array()
        .unwrap()
        .iter()
        .map(|point| point[1].as_u64().unwrap())
        .collect()
}

// ============================================================================
// Recording
// ============================================================================

#[tokio::test]
async fn test_record_view_increments_counter() {
    let (app, store) = test_app();

    let (status, body) = send(
        &app,
        post_json(&interaction_uri("acme-ci"), json!({ "tsdbField": "sentry_app_viewed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({}));

    let uri = format!(
        "{}?since={}&until={}&resolution=10s",
        interaction_uri("acme-ci"),
        NOW - 60,
        NOW
    );
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts(&body["views"]), vec![0, 0, 0, 0, 0, 0, 1]);
    assert_eq!(store.tenant_usage(ORG).writes, 1);
}

#[tokio::test]
async fn test_record_component_interaction() {
    let (app, _store) = test_app();

    for _ in 0..3 {
        let (status, _) = send(
            &app,
            post_json(
                &interaction_uri("beta-ci"),
                json!({
                    "tsdbField": "sentry_app_component_interacted",
                    "componentType": "issue-link",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let uri = format!("{}?since={}&until={}&resolution=1h", interaction_uri("beta-ci"), NOW, NOW);
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts(&body["componentInteractions"]["issue-link"]), vec![3]);
    assert_eq!(counts(&body["componentInteractions"]["stacktrace-link"]), vec![0]);
    assert_eq!(counts(&body["views"]), vec![0]);
}

#[tokio::test]
async fn test_record_requires_component_type() {
    let (app, store) = test_app();

    for body in [
        json!({ "tsdbField": "sentry_app_component_interacted" }),
        json!({ "tsdbField": "sentry_app_component_interacted", "componentType": "alert-rule-action" }),
        json!({ "tsdbField": "sentry_app_component_interacted", "componentType": 7 }),
    ] {
        let (status, response) = send(&app, post_json(&interaction_uri("acme-ci"), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            detail(&response),
            "The field componentType is required and must be one of ['stacktrace-link', 'issue-link']"
        );
    }
    assert_eq!(store.cell_count(), 0);
}

#[tokio::test]
async fn test_record_rejects_unknown_field() {
    let (app, store) = test_app();

    for body in [
        json!({ "tsdbField": "not_a_real_field" }),
        json!({ "tsdbField": "project" }),
        json!({}),
    ] {
        let (status, response) = send(&app, post_json(&interaction_uri("acme-ci"), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = detail(&response);
        assert!(message.contains("sentry_app_viewed"), "{}", message);
        assert!(message.contains("sentry_app_component_interacted"), "{}", message);
    }
    assert_eq!(store.cell_count(), 0);
}

#[tokio::test]
async fn test_record_rejects_malformed_json() {
    let (app, _store) = test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri(interaction_uri("acme-ci"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!detail(&body).is_empty());
}

// ============================================================================
// Reading
// ============================================================================

#[tokio::test]
async fn test_default_range_is_one_day_hourly() {
    let (app, _store) = test_app();

    let (status, body) = send(&app, get(&interaction_uri("acme-ci"))).await;
    assert_eq!(status, StatusCode::OK);

    // NOW is mid-hour, so both partial end buckets are present
    assert_eq!(body["views"].as_array().unwrap().len(), 25);
    let components = body["componentInteractions"].as_object().unwrap();
    let mut keys: Vec<_> = components.keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["issue-link", "stacktrace-link"]);
    for series in components.values() {
        assert_eq!(series.as_array().unwrap().len(), 25);
    }
}

#[tokio::test]
async fn test_component_keys_ignore_registration_order() {
    let (app, _store) = test_app();

    for (slug, component) in [("acme-ci", "stacktrace-link"), ("beta-ci", "stacktrace-link")] {
        let (status, _) = send(
            &app,
            post_json(
                &interaction_uri(slug),
                json!({
                    "tsdbField": "sentry_app_component_interacted",
                    "componentType": component,
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let uri = |slug: &str| format!("{}?since={}&until={}&resolution=1d", interaction_uri(slug), NOW, NOW);
    let (_, acme) = send(&app, get(&uri("acme-ci"))).await;
    let (_, beta) = send(&app, get(&uri("beta-ci"))).await;
    assert_eq!(acme["componentInteractions"], beta["componentInteractions"]);
    assert_eq!(counts(&acme["componentInteractions"]["stacktrace-link"]), vec![1]);
}

#[tokio::test]
async fn test_app_without_components() {
    let (app, _store) = test_app();

    let (status, body) = send(&app, get(&interaction_uri("quiet-app"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["componentInteractions"], json!({}));
    assert!(counts(&body["views"]).iter().all(|count| *count == 0));
}

#[tokio::test]
async fn test_invalid_query_parameters() {
    let (app, _store) = test_app();
    let base = interaction_uri("acme-ci");

    let cases = [
        (format!("{}?resolution=2h", base), "Invalid resolution"),
        (format!("{}?until=tomorrow", base), "until must be a numeric timestamp."),
        (format!("{}?since=yesterday", base), "since must be a numeric timestamp"),
        (
            format!("{}?since={}&until={}", base, NOW, NOW - 10),
            "start must be before or equal to end",
        ),
    ];
    for (uri, expected) in cases {
        let (status, body) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(detail(&body), expected);
    }
}

#[tokio::test]
async fn test_out_of_range_timestamps_are_rejected() {
    let (app, store) = test_app();
    let base = interaction_uri("acme-ci");

    let cases = [
        (format!("{}?since=-1e300&until=0&resolution=1d", base), "since must be a numeric timestamp"),
        (format!("{}?until=1e300&resolution=1d", base), "until must be a numeric timestamp."),
    ];
    for (uri, expected) in cases {
        let (status, body) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(detail(&body), expected);
    }
    assert_eq!(store.tenant_usage(ORG).reads, 0);
}

#[tokio::test]
async fn test_oversized_range_is_rejected() {
    let (app, store) = test_app();

    let uri = format!("{}?since=0&until={}&resolution=10s", interaction_uri("acme-ci"), NOW);
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        detail(&body).starts_with("Your interval and date range would create too many results"),
        "{}",
        body
    );
    assert_eq!(store.tenant_usage(ORG).reads, 0);

    // The same span at daily resolution stays under the cap
    let uri = format!(
        "{}?since={}&until={}&resolution=1d",
        interaction_uri("acme-ci"),
        NOW - 90 * 86_400,
        NOW
    );
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["views"].as_array().unwrap().len(), 91);
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_unknown_app_is_not_found() {
    let (app, _store) = test_app();

    let (status, body) = send(&app, get(&interaction_uri("ghost"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(detail(&body), "sentry app 'ghost' does not exist");

    let (status, _) = send(
        &app,
        post_json(&interaction_uri("ghost"), json!({ "tsdbField": "sentry_app_viewed" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_healthz() {
    let (app, _store) = test_app();

    let (status, body) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
