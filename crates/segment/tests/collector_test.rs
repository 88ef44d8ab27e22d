//! End-to-end handler tests against a mock collector.

use destination_core::{DestinationError, SegmentEvent, Settings};
use destination_segment::{EventDispatcher, HttpPublisher};
use mockito::{Matcher, Server, ServerGuard};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn settings(server: &ServerGuard) -> Settings {
    serde_json::from_value(json!({
        "collectorEndpoint": format!("{}/v1", server.url()),
        "apiKey": "testapikey",
        "environment": "production",
        "goalMapping": { "payment": "payment", "signup": "signup" },
        "unitMapping": {
            "anonymousId": "anonymous_id",
            "email": "email",
            "userId": "user_id"
        },
        "enablePageViewTracking": true,
        "enableAppScreenViewTracking": true,
        "enableExposureTracking": true
    }))
    .unwrap()
}

fn payment_event(properties: Value) -> SegmentEvent {
    SegmentEvent::from_value(json!({
        "anonymousId": "477f0fc8-84d0-47f8-9c01-705245bf728d",
        "channel": "client",
        "event": "payment",
        "messageId": "ajs-next-a8465170-0fb1-422e-b9d8-a1f53c3953af",
        "originalTimestamp": "2021-03-29T12:30:42.261Z",
        "properties": properties,
        "receivedAt": "2021-03-29T12:30:42.732Z",
        "sentAt": "2021-03-29T12:30:42.261Z",
        "timestamp": "2021-03-29T12:30:42.732Z",
        "type": "track",
        "userId": "12345",
        "version": 2
    }))
    .unwrap()
}

fn default_units() -> Value {
    json!([
        { "type": "anonymous_id", "uid": "477f0fc8-84d0-47f8-9c01-705245bf728d" },
        { "type": "user_id", "uid": "12345" }
    ])
}

async fn expect_publish(server: &mut ServerGuard, body: Value) -> mockito::Mock {
    server
        .mock("PUT", "/v1/context")
        .match_header("x-api-key", "testapikey")
        .match_header("x-agent", "segment")
        .match_header("x-environment", "production")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(body))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true}"#)
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn test_track_maps_goal_name() {
    let mut server = Server::new_async().await;
    let mock = expect_publish(
        &mut server,
        json!({
            "publishedAt": 1617021042261u64,
            "units": default_units(),
            "goals": [{
                "name": "payment",
                "achievedAt": 1617021042261u64,
                "properties": { "fee": 1000, "value": 10000, "ignored": 9 }
            }]
        }),
    )
    .await;

    let dispatcher = EventDispatcher::new(HttpPublisher::new());
    let event = payment_event(json!({ "fee": 1000, "value": 10000, "ignored": 9 }));
    let result = dispatcher.on_track(&event, &settings(&server)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result, Some(json!({ "ok": true })));
}

#[tokio::test]
async fn test_track_uses_override_units() {
    let mut server = Server::new_async().await;
    let mock = expect_publish(
        &mut server,
        json!({
            "publishedAt": 1617021042261u64,
            "units": [{ "type": "userId", "uid": "4312" }],
            "goals": [{
                "name": "payment",
                "achievedAt": 1617021042261u64,
                "properties": { "fee": 1000, "value": 10000, "ignored": 9 }
            }]
        }),
    )
    .await;

    let dispatcher = EventDispatcher::new(HttpPublisher::new());
    let event = payment_event(json!({
        "fee": 1000,
        "value": 10000,
        "ignored": 9,
        "absmartly": { "units": [{ "type": "userId", "uid": "4312" }] }
    }));
    dispatcher.on_track(&event, &settings(&server)).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_track_passes_through_unmapped_name_and_filters_properties() {
    let mut server = Server::new_async().await;
    let mock = expect_publish(
        &mut server,
        json!({
            "publishedAt": 1617021042261u64,
            "units": default_units(),
            "goals": [{
                "name": "unmapped",
                "achievedAt": 1617021042261u64,
                "properties": { "flt": 1.5, "int": 100, "obj": { "int": 999 } }
            }]
        }),
    )
    .await;

    let dispatcher = EventDispatcher::new(HttpPublisher::new());
    let mut event = payment_event(json!({
        "flt": 1.5,
        "int": 100,
        "str": "156",
        "bool": true,
        "obj": { "str": "abc", "int": 999 },
        "omitted": { "str": "ignored" }
    }));
    event.event = Some(json!("unmapped"));
    dispatcher.on_track(&event, &settings(&server)).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_page_and_screen_goals() {
    let mut server = Server::new_async().await;
    let page_mock = expect_publish(
        &mut server,
        json!({
            "publishedAt": 1617021042261u64,
            "units": default_units(),
            "goals": [{ "name": "home_pageview", "achievedAt": 1617021042261u64, "properties": {} }]
        }),
    )
    .await;
    let screen_mock = expect_publish(
        &mut server,
        json!({
            "publishedAt": 1617021042261u64,
            "units": default_units(),
            "goals": [{ "name": "home_screenview", "achievedAt": 1617021042261u64, "properties": {} }]
        }),
    )
    .await;

    let dispatcher = EventDispatcher::new(HttpPublisher::new());
    let settings = settings(&server);
    for kind in ["page", "screen"] {
        let event = SegmentEvent::from_value(json!({
            "anonymousId": "477f0fc8-84d0-47f8-9c01-705245bf728d",
            "name": "Home",
            "originalTimestamp": "2021-03-29T12:30:42.261Z",
            "properties": { "title": "Home Page" },
            "sentAt": "2021-03-29T12:30:42.261Z",
            "type": kind,
            "userId": "12345"
        }))
        .unwrap();
        let result = dispatcher.handle(&event, &settings).await.unwrap();
        assert_eq!(result, Some(json!({ "ok": true })));
    }

    page_mock.assert_async().await;
    screen_mock.assert_async().await;
}

#[tokio::test]
async fn test_group_passes_exposure_through_unmodified() {
    let mut server = Server::new_async().await;
    let exposure = json!({
        "exposures": [{
            "id": 0,
            "name": "test_experiment",
            "unit": null,
            "exposedAt": 1623508467556u64,
            "variant": 0,
            "assigned": false,
            "eligible": true,
            "overridden": false,
            "fullOn": false
        }],
        "publishedAt": 1623508467657u64,
        "units": [
            { "type": "userId", "uid": "gnzLDuqKcGxMNKFokfhOew" },
            { "type": "anonymousId", "uid": "puTh5EeqBvPN4FjqKfQK2A" }
        ],
        "hashed": true,
        "attributes": [{ "name": "user_agent", "value": "Mozilla/5.0", "setAt": 1623508467551u64 }]
    });
    let mock = expect_publish(&mut server, exposure.clone()).await;

    let dispatcher = EventDispatcher::new(HttpPublisher::new());
    let event = SegmentEvent::from_value(json!({
        "anonymousId": "477f0fc8-84d0-47f8-9c01-705245bf728d",
        "groupId": "test_experiment:0",
        "traits": { "absmartly": exposure },
        "type": "group",
        "userId": "12345"
    }))
    .unwrap();
    dispatcher.on_group(&event, &settings(&server)).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_noops_make_no_requests() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let dispatcher = EventDispatcher::new(HttpPublisher::new());
    let mut settings = settings(&server);

    let no_units = payment_event(json!({ "absmartly": { "units": [] } }));
    assert_eq!(dispatcher.on_track(&no_units, &settings).await.unwrap(), None);

    let null_units = payment_event(json!({ "absmartly": { "units": null } }));
    assert_eq!(dispatcher.on_track(&null_units, &settings).await.unwrap(), None);

    settings.enable_page_view_tracking = false;
    let page = SegmentEvent::from_value(json!({ "type": "page", "name": "Home", "userId": "1" }))
        .unwrap();
    assert_eq!(dispatcher.on_page(&page, &settings).await.unwrap(), None);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_publisher_uses_supplied_client() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/v1/context")
        .match_header("user-agent", "segment-destination-test")
        .match_header("x-api-key", "testapikey")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true}"#)
        .expect(1)
        .create_async()
        .await;

    let http = reqwest::Client::builder()
        .user_agent("segment-destination-test")
        .build()
        .unwrap();
    let dispatcher = EventDispatcher::new(HttpPublisher::with_client(http));
    let event = payment_event(json!({ "fee": 1 }));
    let result = dispatcher.on_track(&event, &settings(&server)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result, Some(json!({ "ok": true })));
}

#[tokio::test]
async fn test_response_decoded_regardless_of_status() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/v1/context")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"invalid unit"}"#)
        .create_async()
        .await;

    let dispatcher = EventDispatcher::new(HttpPublisher::new());
    let event = payment_event(json!({ "fee": 1 }));
    let result = dispatcher.on_track(&event, &settings(&server)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result, Some(json!({ "error": "invalid unit" })));
}

#[tokio::test]
async fn test_undecodable_response_is_transport_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/v1/context")
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let dispatcher = EventDispatcher::new(HttpPublisher::new());
    let event = payment_event(json!({ "fee": 1 }));
    let err = dispatcher
        .on_track(&event, &settings(&server))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, DestinationError::Transport(_)));
}
