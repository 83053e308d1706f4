//! Integration tests for event webhooks, against a local HTTP endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jokenpo::prelude::*;
use jokenpo::RoomProvisioner;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// One request as seen by the endpoint.
#[derive(Debug)]
struct Received {
    request_line: String,
    headers: HashMap<String, String>,
    body: serde_json::Value,
}

/// Starts an HTTP/1.1 endpoint that answers every request with `status`.
/// Returns its URL and the stream of requests it received.
async fn start_endpoint(status: &'static str) -> (String, mpsc::UnboundedReceiver<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, tx.clone(), status));
        }
    });

    (format!("http://{addr}/hooks/jokenpo"), rx)
}

/// Serves requests on one kept-alive connection until the client hangs up.
async fn serve(stream: TcpStream, tx: mpsc::UnboundedSender<Received>, status: &'static str) {
    let mut reader = BufReader::new(stream);
    loop {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
            return;
        }

        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(':').unwrap();
            headers.insert(name.to_ascii_lowercase(), value.trim().to_string());
        }

        let len: usize = headers
            .get("content-length")
            .map_or(0, |len| len.parse().unwrap());
        let mut body = vec![0; len];
        reader.read_exact(&mut body).await.unwrap();

        reader
            .get_mut()
            .write_all(format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\n\r\n").as_bytes())
            .await
            .unwrap();

        let _ = tx.send(Received {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: serde_json::from_slice(&body).unwrap(),
        });
    }
}

fn provisioner() -> RoomProvisioner {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    RoomProvisioner::new(
        Arc::new(Hub::new()),
        Duration::from_secs(30),
        Duration::from_secs(3600),
    )
    .with_http_client(http)
}

fn request(id: &str, rounds: u32, webhook_url: &str) -> CreateRoom {
    CreateRoom {
        id: Some(id.to_string()),
        name: "Final".to_string(),
        player1: "alice".to_string(),
        player2: "bob".to_string(),
        rounds,
        external_id: Some("league-42".to_string()),
        events_webhook: Some(WebhookConfig {
            url: webhook_url.to_string(),
            headers: HashMap::from([("X-Api-Key".to_string(), "k3y".to_string())]),
        }),
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Received>) -> Received {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("webhook should be delivered")
        .expect("endpoint should be running")
}

#[tokio::test]
async fn test_webhook_receives_every_decided_round() {
    let (url, mut received) = start_endpoint("200 OK").await;
    let prov = provisioner();
    let room = prov.create_room(request("r1", 2, &url)).unwrap().room;

    room.start();
    room.add_move_for_player(PlayerSlot::Player1, Move::Rock);
    room.add_move_for_player(PlayerSlot::Player2, Move::Scissors);

    let first = next(&mut received).await;
    assert_eq!(first.request_line, "POST /hooks/jokenpo HTTP/1.1");
    assert_eq!(first.headers["x-api-key"], "k3y");
    assert!(first.headers["content-type"].starts_with("application/json"));
    assert_eq!(first.body["external_id"], "league-42");
    assert_eq!(first.body["event"]["room_id"], "r1");
    assert_eq!(first.body["event"]["state"], "Running");
    assert_eq!(first.body["event"]["current_round"], 1);
    assert_eq!(first.body["event"]["round"]["player1_move"], "Rock");
    assert_eq!(first.body["event"]["player1_wins"], 1);

    room.add_move_for_player(PlayerSlot::Player1, Move::Paper);
    room.add_move_for_player(PlayerSlot::Player2, Move::Scissors);

    let second = next(&mut received).await;
    assert_eq!(second.body["event"]["state"], "Finished");
    assert_eq!(second.body["event"]["current_round"], 2);
    assert_eq!(second.body["event"]["player2_wins"], 1);
}

#[tokio::test]
async fn test_webhook_errors_do_not_stop_deliveries() {
    let (url, mut received) = start_endpoint("500 Internal Server Error").await;
    let prov = provisioner();
    let room = prov.create_room(request("r1", 2, &url)).unwrap().room;

    room.start();
    room.add_move_for_player(PlayerSlot::Player1, Move::Rock);
    room.add_move_for_player(PlayerSlot::Player2, Move::Scissors);
    assert_eq!(next(&mut received).await.body["event"]["current_round"], 1);

    room.add_move_for_player(PlayerSlot::Player1, Move::Rock);
    room.add_move_for_player(PlayerSlot::Player2, Move::Scissors);
    assert_eq!(next(&mut received).await.body["event"]["current_round"], 2);
    assert_eq!(room.state(), RoomState::Finished);
}

#[tokio::test]
async fn test_room_without_webhook_sends_nothing() {
    let (url, mut received) = start_endpoint("200 OK").await;
    let prov = provisioner();
    let mut req = request("r1", 1, &url);
    req.events_webhook = None;
    let room = prov.create_room(req).unwrap().room;

    room.start();
    room.add_move_for_player(PlayerSlot::Player1, Move::Rock);
    room.add_move_for_player(PlayerSlot::Player2, Move::Scissors);
    assert_eq!(room.state(), RoomState::Finished);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(received.try_recv().is_err());
}
