//! End-to-end tests with Zenoh pub/sub and queries.
//!
//! Note: Zenoh requires multi-thread tokio runtime.
//! Each test uses a unique key prefix to avoid interference.

use std::time::Duration;
use zenvenus_common::{
    AttributeSnapshot, Format, SetValue, Value, attribute_key, decode_auto, encode,
    service_wildcard,
};

/// Generate a unique test prefix to avoid test interference.
fn unique_prefix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test_{}/temperature/pi", nanos)
}

/// A change notification published on an attribute key reaches a wildcard subscriber.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zenoh_snapshot_pubsub() {
    let prefix = unique_prefix();

    let session = zenoh::open(zenoh::Config::default())
        .await
        .expect("Failed to open Zenoh session");

    let subscriber = session
        .declare_subscriber(service_wildcard(&prefix))
        .await
        .expect("Failed to create subscriber");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = AttributeSnapshot::new("/Temperature", Some(Value::Float(47.2)), "47.2");
    let key = attribute_key(&prefix, &snapshot.path);
    session
        .put(&key, encode(&snapshot, Format::Json).expect("Failed to encode"))
        .await
        .expect("Failed to publish");

    let received = tokio::time::timeout(Duration::from_secs(5), subscriber.recv_async())
        .await
        .expect("Timeout waiting for message")
        .expect("Failed to receive message");

    assert_eq!(received.key_expr().as_str(), key);
    let decoded: AttributeSnapshot =
        decode_auto(&received.payload().to_bytes()).expect("Failed to decode");
    assert_eq!(decoded.path, "/Temperature");
    assert_eq!(decoded.value, Some(Value::Float(47.2)));

    drop(subscriber);
    session.close().await.expect("Failed to close session");
}

/// A query carrying a `SetValue` payload reaches a queryable and gets a reply.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zenoh_write_query() {
    let prefix = unique_prefix();

    let session = zenoh::open(zenoh::Config::default())
        .await
        .expect("Failed to open Zenoh session");

    let queryable = session
        .declare_queryable(service_wildcard(&prefix))
        .await
        .expect("Failed to declare queryable");

    let server = tokio::spawn(async move {
        let query = queryable.recv_async().await.expect("No query");
        let set: SetValue =
            decode_auto(&query.payload().expect("No payload").to_bytes()).expect("Bad payload");
        let snapshot = AttributeSnapshot::new("/CustomName", Some(set.value.clone()), set.value.to_string());
        query
            .reply(
                query.key_expr().clone(),
                encode(&snapshot, Format::Json).unwrap(),
            )
            .await
            .expect("Failed to reply");
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let payload = encode(
        &SetValue {
            value: Value::Text("Garage".to_string()),
        },
        Format::Json,
    )
    .unwrap();
    let replies = session
        .get(attribute_key(&prefix, "/CustomName"))
        .payload(payload)
        .timeout(Duration::from_secs(5))
        .await
        .expect("Failed to send query");

    let reply = replies.recv_async().await.expect("No reply");
    let sample = reply.result().expect("Error reply");
    let snapshot: AttributeSnapshot = decode_auto(&sample.payload().to_bytes()).unwrap();
    assert_eq!(snapshot.text, "Garage");

    server.await.unwrap();
    session.close().await.expect("Failed to close session");
}
