// Event stream client against a real in-process control plane.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use fieldctl_api::{Error, FieldClient};
use fieldctl_core::{Event, EventHub, EventPublisher, EventStreamConfig, MappingStore};
use fieldctl_server::{AppState, router, serve};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn start(queue_depth: usize) -> (FieldClient, EventHub, CancellationToken) {
    let config = EventStreamConfig {
        queue_depth,
        write_timeout: Duration::from_secs(5),
    };
    let hub = EventHub::new(&config);
    let shutdown = CancellationToken::new();
    let state = AppState::new(Arc::new(MappingStore::detached()), hub.clone(), &[1], &config)
        .with_shutdown(shutdown.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, router(state), shutdown.clone(), Duration::from_secs(2)));

    let client = FieldClient::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    (client, hub, shutdown)
}

async fn wait_for_subscriber(hub: &EventHub) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while hub.subscriber_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_events_decode_in_order() {
    let (client, hub, shutdown) = start(16).await;
    let mut stream = client.events().await.unwrap();
    wait_for_subscriber(&hub).await;

    hub.publish_action_start("remap", "applying match 12");
    hub.publish_file_fetch("match-12.json");

    let first = stream.next_event().await.unwrap().unwrap();
    assert_eq!(
        first,
        Event::ActionStart {
            action: "remap".into(),
            message: "applying match 12".into()
        }
    );
    let second = stream.next_event().await.unwrap().unwrap();
    assert_eq!(
        second,
        Event::FileFetch {
            filename: "match-12.json".into()
        }
    );

    shutdown.cancel();
    assert!(stream.next_event().await.unwrap().is_none());
}

#[tokio::test]
async fn test_eviction_surfaces_as_close_error() {
    let (client, hub, shutdown) = start(2).await;
    let mut stream = client.events().await.unwrap();
    wait_for_subscriber(&hub).await;

    for n in 0..3 {
        hub.publish_log_line(&format!("line {n}"));
    }

    let err = loop {
        match stream.next_event().await {
            Ok(Some(_)) => {}
            Ok(None) => panic!("stream ended without a policy close"),
            Err(e) => break e,
        }
    };
    match err {
        Error::WebSocketClosed { code, .. } => assert_eq!(code, 1008),
        other => panic!("expected close error, got {other:?}"),
    }
    shutdown.cancel();
}
