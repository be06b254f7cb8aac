//! Integration tests for the client against a scripted fake server.

use std::time::{Duration, Instant};

use neohab::prelude::*;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

// =========================================================================
// Fake server
// =========================================================================

const STEP: Duration = Duration::from_secs(5);

/// The server side of one accepted connection.
struct Peer {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl Peer {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = timeout(STEP, listener.accept())
            .await
            .expect("accept timed out")
            .unwrap();
        Self {
            stream,
            buf: Vec::new(),
        }
    }

    async fn push(&mut self, message: Value) {
        let mut frame = message.to_string().into_bytes();
        frame.extend_from_slice(b"\n\n");
        self.stream.write_all(&frame).await.unwrap();
    }

    /// Reads the next `\n\n`-terminated command from the client.
    async fn next_command(&mut self) -> Value {
        loop {
            if let Some(pos) = self.buf.windows(2).position(|w| w == b"\n\n") {
                let frame: Vec<u8> = self.buf.drain(..pos + 2).collect();
                return serde_json::from_slice(&frame[..pos]).unwrap();
            }
            let mut chunk = [0u8; 1024];
            let n = timeout(STEP, self.stream.read(&mut chunk))
                .await
                .expect("read timed out")
                .unwrap();
            assert!(n > 0, "client closed before sending a command");
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

async fn listen() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn quick_config() -> ClientConfig {
    ClientConfig {
        should_reconnect: false,
        send_delay_ms: 0,
        corporation_poll_ms: 10,
        corporation_max_polls: 5,
        corporation_settle_ms: 10,
    }
}

fn client(port: u16, config: ClientConfig) -> HabitatClient {
    HabitatClient::builder("127.0.0.1", port)
        .username("randy")
        .config(config)
        .build()
}

/// Forwards every event registered under `keys` to a channel, tagged.
fn record(client: &HabitatClient, keys: &[&str]) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    for key in keys {
        let tx = tx.clone();
        let tag = key.to_string();
        client.on(*key, move |_, _| {
            let _ = tx.send(tag.clone());
        });
    }
    rx
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(STEP, rx.recv())
        .await
        .expect("event timed out")
        .expect("event channel closed")
}

fn my_avatar(ghost: bool) -> Value {
    json!({
        "op": "make",
        "you": true,
        "to": "session",
        "obj": {
            "type": "item",
            "ref": "user-randy-100",
            "name": "Randy",
            "mods": [{"type": "Avatar", "noid": 42, "x": 80, "y": 130, "amAGhost": ghost}]
        }
    })
}

/// Connects, introduces the client's avatar, and waits until it is mirrored.
async fn enter_region(
    listener: &TcpListener,
    client: &HabitatClient,
    ghost: bool,
) -> Peer {
    let mut entered = record(client, &["enteredRegion"]);
    client.connect().await.unwrap();
    let mut peer = Peer::accept(listener).await;
    peer.push(my_avatar(ghost)).await;
    assert_eq!(next_event(&mut entered).await, "enteredRegion");
    peer
}

// =========================================================================
// Connection supervisor
// =========================================================================

#[tokio::test]
async fn test_connect_fires_connected() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let mut events = record(&client, &["connected"]);

    client.connect().await.unwrap();
    let _peer = Peer::accept(&listener).await;

    assert!(client.is_connected());
    assert_eq!(next_event(&mut events).await, "connected");
}

#[tokio::test]
async fn test_connect_without_host_is_config_error() {
    let client = HabitatClient::new("", 0);
    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_connect_refused_is_transport_error() {
    let (listener, port) = listen().await;
    drop(listener);

    let client = client(port, quick_config());
    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_second_connect_is_noop() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let mut events = record(&client, &["connected"]);

    client.connect().await.unwrap();
    let _peer = Peer::accept(&listener).await;
    client.connect().await.unwrap();

    assert_eq!(next_event(&mut events).await, "connected");
    assert!(
        timeout(Duration::from_millis(200), listener.accept())
            .await
            .is_err()
    );
    assert_eq!(client.reaction_count("connected"), 1);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_fresh_session_clears_mirror() {
    let (listener, port) = listen().await;
    let client = client(
        port,
        ClientConfig {
            should_reconnect: true,
            ..quick_config()
        },
    );
    let mut events = record(&client, &["connected"]);

    let peer = enter_region(&listener, &client, false).await;
    assert_eq!(next_event(&mut events).await, "connected");
    assert!(client.get_avatar().is_some());

    drop(peer);
    let _second = Peer::accept(&listener).await;
    assert_eq!(next_event(&mut events).await, "connected");
    assert!(client.get_avatar().is_none());
}

#[tokio::test]
async fn test_disconnect_reconnects_exactly_once() {
    let (listener, port) = listen().await;
    let client = client(
        port,
        ClientConfig {
            should_reconnect: true,
            ..quick_config()
        },
    );
    let mut events = record(&client, &["connected", "disconnected"]);

    client.connect().await.unwrap();
    let first = Peer::accept(&listener).await;
    assert_eq!(next_event(&mut events).await, "connected");

    drop(first);
    let _second = Peer::accept(&listener).await;

    assert_eq!(next_event(&mut events).await, "disconnected");
    assert_eq!(next_event(&mut events).await, "connected");
    assert!(
        timeout(Duration::from_millis(200), listener.accept())
            .await
            .is_err()
    );
    assert!(events.try_recv().is_err());
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_disconnect_without_reconnect() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let mut events = record(&client, &["connected", "disconnected"]);

    client.connect().await.unwrap();
    let peer = Peer::accept(&listener).await;
    assert_eq!(next_event(&mut events).await, "connected");

    drop(peer);
    assert_eq!(next_event(&mut events).await, "disconnected");
    assert!(!client.is_connected());
    assert!(
        timeout(Duration::from_millis(200), listener.accept())
            .await
            .is_err()
    );

    let err = client.say("anyone?").await.unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
}

// =========================================================================
// Inbound dispatch
// =========================================================================

#[tokio::test]
async fn test_reactions_follow_mirror_updates_in_order() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let mut events = record(&client, &["msg", "make", "enteredRegion", "delete"]);

    client.connect().await.unwrap();
    let mut peer = Peer::accept(&listener).await;

    // One write carrying two frames, the second split from its terminator.
    let mut bytes = my_avatar(false).to_string().into_bytes();
    bytes.extend_from_slice(b"\n\n");
    bytes.extend_from_slice(json!({"op": "delete", "to": "user-randy-100"}).to_string().as_bytes());
    bytes.extend_from_slice(b"\n");
    peer.stream.write_all(&bytes).await.unwrap();
    peer.stream.flush().await.unwrap();

    assert_eq!(next_event(&mut events).await, "enteredRegion");
    assert_eq!(next_event(&mut events).await, "make");
    assert_eq!(next_event(&mut events).await, "msg");
    assert!(client.get_avatar().is_some());

    peer.stream.write_all(b"\n").await.unwrap();
    assert_eq!(next_event(&mut events).await, "delete");
    assert_eq!(next_event(&mut events).await, "msg");
    assert!(client.get_avatar().is_none());
    assert_eq!(client.get_avatar_noid(), None);
}

#[tokio::test]
async fn test_reaction_receives_message() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on("SPEAK$", move |_, msg| {
        let text = msg
            .and_then(|m| m.get("text"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        let _ = tx.send(text);
    });

    let mut peer = enter_region(&listener, &client, false).await;
    peer.push(json!({"op": "SPEAK$", "noid": 7, "text": "hi randy"})).await;

    let text = timeout(STEP, rx.recv()).await.unwrap().unwrap();
    assert_eq!(text.as_deref(), Some("hi randy"));
}

#[tokio::test]
async fn test_unterminated_tail_is_delivered_before_disconnect() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let on_msg = tx.clone();
    client.on("msg", move |_, msg| {
        let op = msg.and_then(|m| m.op()).unwrap_or_default().to_owned();
        let _ = on_msg.send(format!("msg {op}"));
    });
    client.on("disconnected", move |_, _| {
        let _ = tx.send("disconnected".to_owned());
    });

    client.connect().await.unwrap();
    let mut peer = Peer::accept(&listener).await;
    peer.stream.write_all(b"{\"op\":\"tail\"}\n").await.unwrap();
    peer.stream.shutdown().await.unwrap();

    assert_eq!(next_event(&mut rx).await, "msg tail");
    assert_eq!(next_event(&mut rx).await, "disconnected");
    assert!(rx.try_recv().is_err());
}

// =========================================================================
// Dispatch queue
// =========================================================================

#[tokio::test]
async fn test_commands_are_written_in_order_with_pacing() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let mut peer = enter_region(&listener, &client, false).await;

    let start = Instant::now();
    let first = client.send_with_delay(Command::new("ONE").to("ME"), Duration::from_millis(30));
    client.wait(Duration::from_millis(20));
    let second = client.send_with_delay(Command::new("TWO").to("ME"), Duration::from_millis(10));
    let third = client.send_with_delay(Command::new("THREE").to("ME"), Duration::from_millis(20));

    assert_eq!(peer.next_command().await["op"], "ONE");
    assert_eq!(peer.next_command().await["op"], "TWO");
    assert_eq!(peer.next_command().await["op"], "THREE");
    assert!(start.elapsed() >= Duration::from_millis(80));

    first.await.unwrap();
    second.await.unwrap();
    third.await.unwrap();
}

#[tokio::test]
async fn test_commands_are_resolved_and_substituted() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let mut peer = enter_region(&listener, &client, false).await;

    client
        .send(
            Command::new("SPEAK")
                .to("randy")
                .with("text", "I am $ME.name at $ME.mods.x")
                .with("noid", "$ME.mods.noid"),
        )
        .await
        .unwrap();

    let sent = peer.next_command().await;
    assert_eq!(sent["to"], "user-randy-100");
    assert_eq!(sent["text"], "I am Randy at 80");
    assert_eq!(sent["noid"], 42);
}

#[tokio::test]
async fn test_convenience_command_shapes() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let mut peer = enter_region(&listener, &client, false).await;

    client.say("hello").await.unwrap();
    client.walk_to(20, 140).await.unwrap();
    client.do_posture(Posture::Wave).await.unwrap();
    client.face_direction(Direction::Left).await.unwrap();
    client.goto_context("context-Downtown_5f").await.unwrap();
    client.discorporate().await.unwrap();

    assert_eq!(
        peer.next_command().await,
        json!({"op": "SPEAK", "to": "user-randy-100", "esp": 0, "text": "hello"})
    );
    assert_eq!(
        peer.next_command().await,
        json!({"op": "WALK", "to": "user-randy-100", "x": 20, "y": 140, "how": 1})
    );
    assert_eq!(
        peer.next_command().await,
        json!({"op": "POSTURE", "to": "user-randy-100", "pose": 141})
    );
    assert_eq!(
        peer.next_command().await,
        json!({"op": "POSTURE", "to": "user-randy-100", "pose": 254})
    );
    assert_eq!(
        peer.next_command().await,
        json!({
            "op": "entercontext",
            "to": "session",
            "context": "context-Downtown_5f",
            "user": "user-randy"
        })
    );
    assert_eq!(
        peer.next_command().await,
        json!({"op": "DISCORPORATE", "to": "user-randy-100"})
    );
}

#[tokio::test]
async fn test_goto_context_without_username_uses_user_alias() {
    let (listener, port) = listen().await;
    let client = HabitatClient::builder("127.0.0.1", port)
        .config(quick_config())
        .build();
    let mut peer = enter_region(&listener, &client, false).await;

    client.goto_context("context-Downtown_5f").await.unwrap();
    assert_eq!(peer.next_command().await["user"], "user-randy");
}

// =========================================================================
// Corporation
// =========================================================================

#[tokio::test]
async fn test_ensure_corporated_targets_the_ghost() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let mut peer = enter_region(&listener, &client, true).await;
    assert!(client.is_ghosted());
    assert_eq!(client.corporation_state(), CorporationState::GhostedNoGhostRef);

    let task = tokio::spawn({
        let client = client.clone();
        async move { client.ensure_corporated().await }
    });
    peer.push(json!({
        "op": "HEREIS_$",
        "object": {"ref": "ghost-randy-9", "name": "Ghost", "mods": [{"type": "Ghost", "noid": 9}]}
    }))
    .await;

    assert_eq!(
        peer.next_command().await,
        json!({"op": "CORPORATE", "to": "ghost-randy-9"})
    );
    timeout(STEP, task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_ensure_corporated_when_embodied_sends_nothing() {
    let (listener, port) = listen().await;
    let client = client(port, quick_config());
    let mut peer = enter_region(&listener, &client, false).await;

    client.ensure_corporated().await.unwrap();
    client.say("done").await.unwrap();

    assert_eq!(peer.next_command().await["op"], "SPEAK");
}

#[tokio::test]
async fn test_ensure_corporated_waits_out_the_settle_period() {
    let settle = Duration::from_millis(300);
    let (listener, port) = listen().await;
    let client = client(
        port,
        ClientConfig {
            corporation_settle_ms: 300,
            ..quick_config()
        },
    );
    let mut peer = enter_region(&listener, &client, true).await;

    let mut arrivals = record(&client, &["HEREIS_$"]);
    peer.push(json!({
        "op": "HEREIS_$",
        "object": {"ref": "ghost-randy-9", "name": "Ghost", "mods": [{"type": "Ghost", "noid": 9}]}
    }))
    .await;
    assert_eq!(next_event(&mut arrivals).await, "HEREIS_$");
    assert_eq!(client.corporation_state(), CorporationState::GhostedHasGhostRef);

    let start = Instant::now();
    let task = tokio::spawn({
        let client = client.clone();
        async move { client.ensure_corporated().await }
    });

    assert_eq!(peer.next_command().await["op"], "CORPORATE");
    assert!(!task.is_finished());

    timeout(STEP, task).await.unwrap().unwrap().unwrap();
    assert!(start.elapsed() >= settle);
}
