mod support;

use futures::SinkExt;
use std::sync::atomic::Ordering;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn client_event_reaches_upstream_and_reply_comes_back_verbatim() {
    let mut upstream = support::spawn_fake_upstream().await;
    let relay = support::spawn_relay(&upstream.url, support::GOOD_KEY).await;

    let mut ws = support::connect_browser(relay.addr, "/").await;

    // sent right away, most likely before the upstream handshake finishes
    ws.send(r#"{"type":"input_text","text":"Hello!"}"#.into())
        .await
        .unwrap();

    let event = support::next_upstream_event(&mut upstream).await;
    assert_eq!(event["type"], "input_text");
    assert_eq!(event["text"], "Hello!");
    assert!(event["event_id"].as_str().unwrap().starts_with("evt_"));

    match support::next_message(&mut ws).await {
        Some(Message::Text(text)) => assert_eq!(text.as_str(), support::REPLY),
        other => panic!("expected the upstream event, got {other:?}"),
    }

    assert!(upstream.received.try_recv().is_err());
    assert_eq!(upstream.handshakes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn frames_keep_their_order() {
    let mut upstream = support::spawn_fake_upstream().await;
    let relay = support::spawn_relay(&upstream.url, support::GOOD_KEY).await;

    let mut ws = support::connect_browser(relay.addr, "/").await;
    for seq in 0..20 {
        let frame = serde_json::json!({"type": "conversation.item.create", "seq": seq});
        ws.send(Message::Text(frame.to_string().into())).await.unwrap();
    }

    for seq in 0..20 {
        let event = support::next_upstream_event(&mut upstream).await;
        assert_eq!(event["seq"], seq);
    }
}

#[tokio::test]
async fn malformed_frame_is_dropped_and_connection_survives() {
    let mut upstream = support::spawn_fake_upstream().await;
    let relay = support::spawn_relay(&upstream.url, support::GOOD_KEY).await;

    let mut ws = support::connect_browser(relay.addr, "/").await;
    ws.send("this is not json".into()).await.unwrap();
    ws.send(r#"{"no_type":true}"#.into()).await.unwrap();
    ws.send(r#"{"type":"input_text","text":"still here"}"#.into())
        .await
        .unwrap();

    let event = support::next_upstream_event(&mut upstream).await;
    assert_eq!(event["text"], "still here");

    match support::next_message(&mut ws).await {
        Some(Message::Text(text)) => assert_eq!(text.as_str(), support::REPLY),
        other => panic!("expected the upstream event, got {other:?}"),
    }
    assert_eq!(relay.registry.active(), 1);
}

#[tokio::test]
async fn binary_frames_are_relayed_like_text() {
    let mut upstream = support::spawn_fake_upstream().await;
    let relay = support::spawn_relay(&upstream.url, support::GOOD_KEY).await;

    let mut ws = support::connect_browser(relay.addr, "/").await;
    let frame = br#"{"type":"input_text","text":"bin"}"#.to_vec();
    ws.send(Message::Binary(frame.into())).await.unwrap();

    let event = support::next_upstream_event(&mut upstream).await;
    assert_eq!(event["type"], "input_text");
    assert_eq!(event["text"], "bin");
    assert!(event["event_id"].as_str().unwrap().starts_with("evt_"));

    match support::next_message(&mut ws).await {
        Some(Message::Text(text)) => assert_eq!(text.as_str(), support::REPLY),
        other => panic!("expected the upstream event, got {other:?}"),
    }
}

#[tokio::test]
async fn upstream_event_without_type_still_reaches_browser() {
    let mut upstream = support::spawn_fake_upstream().await;
    let relay = support::spawn_relay(&upstream.url, support::GOOD_KEY).await;

    let mut ws = support::connect_browser(relay.addr, "/").await;
    ws.send(r#"{"type":"test.typeless"}"#.into()).await.unwrap();
    ws.send(r#"{"type":"input_text","text":"after"}"#.into())
        .await
        .unwrap();

    support::next_upstream_event(&mut upstream).await;
    support::next_upstream_event(&mut upstream).await;

    match support::next_message(&mut ws).await {
        Some(Message::Text(text)) => assert_eq!(text.as_str(), support::TYPELESS),
        other => panic!("expected the typeless event first, got {other:?}"),
    }
    match support::next_message(&mut ws).await {
        Some(Message::Text(text)) => assert_eq!(text.as_str(), support::REPLY),
        other => panic!("expected the reply, got {other:?}"),
    }
}

#[tokio::test]
async fn upstream_hangup_closes_browser() {
    let mut upstream = support::spawn_fake_upstream().await;
    let relay = support::spawn_relay(&upstream.url, support::GOOD_KEY).await;

    let mut ws = support::connect_browser(relay.addr, "/").await;
    ws.send(r#"{"type":"test.close"}"#.into()).await.unwrap();
    support::next_upstream_event(&mut upstream).await;

    loop {
        match support::next_message(&mut ws).await {
            Some(Message::Close(_)) | None => break,
            Some(_) => continue,
        }
    }

    support::wait_for_clients(relay.addr, 0).await;
}
