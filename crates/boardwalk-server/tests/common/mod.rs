use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use boardwalk_core::PlayerId;
use boardwalk_core::net::messages::{ClientMessage, JoinRoomMsg, ServerMessage};
use boardwalk_core::net::protocol::{decode_server_message, encode_client_message};

use boardwalk_server::build_app;
use boardwalk_server::config::ServerConfig;
use boardwalk_server::state::AppState;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Credentials returned by the REST surface.
pub struct Credentials {
    pub room_code: String,
    pub player_id: PlayerId,
    pub client_id: String,
}

/// POST /api/rooms and unwrap the credentials.
pub async fn rest_create_room(
    server: &TestServer,
    city: &str,
    nickname: &str,
    client_id: &str,
) -> Credentials {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/rooms", server.base_url()))
        .json(&serde_json::json!({
            "city": city,
            "nickname": nickname,
            "clientId": client_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "room creation should succeed");
    let body: serde_json::Value = resp.json().await.unwrap();
    Credentials {
        room_code: body["roomCode"].as_str().unwrap().to_string(),
        player_id: body["playerId"].as_i64().unwrap(),
        client_id: client_id.to_string(),
    }
}

/// POST /api/rooms/join and unwrap the credentials.
pub async fn rest_join_room(
    server: &TestServer,
    code: &str,
    nickname: &str,
    client_id: &str,
) -> Credentials {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/rooms/join", server.base_url()))
        .json(&serde_json::json!({
            "code": code,
            "nickname": nickname,
            "clientId": client_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "room join should succeed");
    let body: serde_json::Value = resp.json().await.unwrap();
    Credentials {
        room_code: body["roomCode"].as_str().unwrap().to_string(),
        player_id: body["playerId"].as_i64().unwrap(),
        client_id: client_id.to_string(),
    }
}

/// GET /api/rooms/{code} as raw JSON.
pub async fn rest_room_snapshot(server: &TestServer, code: &str) -> serde_json::Value {
    let resp = reqwest::get(format!("{}/api/rooms/{code}", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Send the realtime join handshake for previously issued credentials.
pub async fn ws_join(stream: &mut WsStream, creds: &Credentials, nickname: &str) {
    ws_send_client_msg(
        stream,
        &ClientMessage::JoinRoom(JoinRoomMsg {
            code: creds.room_code.clone(),
            player_id: creds.player_id,
            client_id: creds.client_id.clone(),
            nickname: nickname.to_string(),
        }),
    )
    .await;
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Read messages until one matches the predicate (5s total budget).
pub async fn ws_read_until<F>(stream: &mut WsStream, mut pred: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    for _ in 0..16 {
        let msg = ws_read_server_msg(stream).await;
        if pred(&msg) {
            return msg;
        }
    }
    panic!("Did not observe the expected message");
}
