// Integration tests for `FieldClient` using wiremock.
#![allow(clippy::unwrap_used)]

use fieldctl_api::{ControllerBinding, Error, FieldClient, TargetGroup};
use fieldctl_core::{ControlFrame, FieldLocation, Mapping, TeamNumber};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, FieldClient) {
    let server = MockServer::start().await;
    let client = FieldClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn team(n: u32) -> TeamNumber {
    TeamNumber::new(n).unwrap()
}

fn loc(s: &str) -> FieldLocation {
    s.parse().unwrap()
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_current_map() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/map/current"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"7": "field1:red", "12": "field2:blue"})),
        )
        .mount(&server)
        .await;

    let mapping = client.current_map().await.unwrap();
    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping.get(team(7)), Some(loc("field1:red")));
    assert_eq!(mapping.get(team(12)), Some(loc("field2:blue")));
}

#[tokio::test]
async fn test_team_location() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/map/team/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"team": 7, "location": "field1:green"})),
        )
        .mount(&server)
        .await;

    assert_eq!(client.team_location(team(7)).await.unwrap(), loc("field1:green"));
}

#[tokio::test]
async fn test_remap_immediate_sends_mapping() {
    let (server, client) = setup().await;
    let body = json!({"3": "field1:yellow"});

    Mock::given(method("POST"))
        .and(path("/api/map/immediate"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let mut mapping = Mapping::new();
    mapping.insert(team(3), loc("field1:yellow"));
    let applied = client.remap_immediate(&mapping).await.unwrap();
    assert_eq!(applied, mapping);
}

#[tokio::test]
async fn test_stage_assign_sends_location_string() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/map/stage/44"))
        .and(body_json(json!("field2:red")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"44": "field2:red"})))
        .expect(1)
        .mount(&server)
        .await;

    let staged = client.stage_assign(team(44), loc("field2:red")).await.unwrap();
    assert_eq!(staged.get(team(44)), Some(loc("field2:red")));
}

#[tokio::test]
async fn test_reconcile_accepts_no_content() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/net/reconcile"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.reconcile().await.unwrap();
}

#[tokio::test]
async fn test_metrics_targets() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/metrics-sd"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"targets": ["10.0.7.2:8080"]}])),
        )
        .mount(&server)
        .await;

    assert_eq!(
        client.metrics_targets().await.unwrap(),
        vec![TargetGroup {
            targets: vec!["10.0.7.2:8080".into()]
        }]
    );
}

#[tokio::test]
async fn test_clear_stage() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/map/stage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.clear_stage().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bind_controller() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/field/bind"))
        .and(body_json(json!({"Field": "field1:red", "Controller": "js1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Field": "field1:red", "Controller": "js1", "Replaced": "js0"
        })))
        .mount(&server)
        .await;

    assert_eq!(
        client.bind_controller(loc("field1:red"), "js1").await.unwrap(),
        ControllerBinding {
            field: loc("field1:red"),
            controller: "js1".into(),
            replaced: Some("js0".into()),
        }
    );
}

#[tokio::test]
async fn test_update_input_sends_frame() {
    let (server, client) = setup().await;
    let frame = ControlFrame::neutral();

    Mock::given(method("PUT"))
        .and(path("/api/input/field2:blue"))
        .and(body_json(serde_json::to_value(frame).unwrap()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.update_input(loc("field2:blue"), &frame).await.unwrap();
}

#[tokio::test]
async fn test_update_input_unbound_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/input/field1:green"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "404", "message": "no controller bound to field1:green"
        })))
        .mount(&server)
        .await;

    let err = client
        .update_input(loc("field1:green"), &ControlFrame::neutral())
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[test]
fn test_base_url_with_prefix() {
    let client =
        FieldClient::from_reqwest("https://fms.example/control", reqwest::Client::new()).unwrap();
    assert_eq!(client.base_url().as_str(), "https://fms.example/control/");
    assert_eq!(
        client.events_url().unwrap().as_str(),
        "wss://fms.example/control/api/eventstream"
    );
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_not_found_carries_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/map/team/99"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": "404", "message": "team 99 has no location"})),
        )
        .mount(&server)
        .await;

    let err = client.team_location(team(99)).await.unwrap_err();
    assert!(err.is_not_found());
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "team 99 has no location");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_commit_conflict() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/map/commit-stage"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"error": "409", "message": "no staged mapping"})),
        )
        .mount(&server)
        .await;

    let err = client.commit_stage().await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/net/reconcile"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    match client.reconcile().await.unwrap_err() {
        Error::Api { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream down");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_success_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/field/configured-quads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["field1:purple"])))
        .mount(&server)
        .await;

    let err = client.configured_quads().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
}

#[tokio::test]
async fn test_unreachable_is_transient() {
    let client = FieldClient::new("http://127.0.0.1:1", std::time::Duration::from_secs(2)).unwrap();
    let err = client.current_map().await.unwrap_err();
    assert!(err.is_transient(), "{err:?}");
}
