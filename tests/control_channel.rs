mod common;

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use common::{cards, controller, FakeProvider, FakeSource, RecordingSink};
use notecrawl::control::{self, ControlServer};
use notecrawl::engine::DEFAULT_BATCH_SIZE;

struct Client {
    lines: tokio::io::Lines<BufReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>>,
    writer: tokio::io::WriteHalf<tokio::io::DuplexStream>,
}

impl Client {
    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    async fn next(&mut self) -> Value {
        let line = self.lines.next_line().await.unwrap().expect("channel closed");
        serde_json::from_str(&line).unwrap()
    }
}

type ServeTask = tokio::task::JoinHandle<notecrawl::app::Result<()>>;

fn start_server(source: FakeSource, sink: Arc<RecordingSink>) -> (Client, ServeTask) {
    start_server_with_batch_size(source, sink, DEFAULT_BATCH_SIZE)
}

fn start_server_with_batch_size(
    source: FakeSource,
    sink: Arc<RecordingSink>,
    batch_size: usize,
) -> (Client, ServeTask) {
    let (server, events) = ControlServer::new(
        Arc::new(controller()),
        Arc::new(FakeProvider(Arc::new(source))),
        sink,
    );
    let server = server.with_default_batch_size(batch_size);

    let (client_side, server_side) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_side);
    let task = tokio::spawn(control::serve(
        server,
        events,
        BufReader::new(server_read),
        server_write,
    ));

    let (client_read, client_write) = tokio::io::split(client_side);
    let client = Client {
        lines: BufReader::new(client_read).lines(),
        writer: client_write,
    };
    (client, task)
}

#[tokio::test]
async fn test_start_streams_batches_then_finishes() {
    let sink = Arc::new(RecordingSink::default());
    let (mut client, task) = start_server(FakeSource::new(vec![cards(0..3)]), sink.clone());

    client
        .send(r#"{"action":"start","mode":"profile","totalLimit":0,"batchSize":2}"#)
        .await;

    assert_eq!(client.next().await, serde_json::json!({"status": "running"}));

    let first = client.next().await;
    assert_eq!(first["event"], "batch");
    assert_eq!(first["batchNumber"], 1);
    assert_eq!(first["items"].as_array().unwrap().len(), 2);

    let second = client.next().await;
    assert_eq!(second["batchNumber"], 2);
    assert_eq!(second["totalSoFar"], 3);

    let finished = client.next().await;
    assert_eq!(finished["status"], "complete");
    assert_eq!(finished["items"].as_array().unwrap().len(), 3);
    assert_eq!(finished["delivery"]["delivered"], 2);

    client.send(r#"{"action":"status"}"#).await;
    let status = client.next().await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["collected"], 3);
    assert_eq!(status["batches"], 2);

    assert_eq!(sink.sizes(), vec![2, 1]);

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_busy_and_stop_acks() {
    let sink = Arc::new(RecordingSink::default());
    let (source, gate) = FakeSource::new(vec![cards(0..3)]).gated();
    let (mut client, task) = start_server(source, sink);

    client.send(r#"{"action":"start"}"#).await;
    assert_eq!(client.next().await["status"], "running");

    client.send(r#"{"action":"start","mode":"feed"}"#).await;
    assert_eq!(client.next().await["status"], "busy");

    client.send(r#"{"action":"stop"}"#).await;
    assert_eq!(client.next().await["status"], "stopped");

    gate.add_permits(1);
    let finished = client.next().await;
    assert_eq!(finished["status"], "stopped");
    assert!(finished["items"].as_array().unwrap().is_empty());

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_bad_requests_get_error_acks() {
    let sink = Arc::new(RecordingSink::default());
    let (mut client, task) = start_server(FakeSource::new(vec![cards(0..3)]), sink);

    client.send("not json").await;
    assert_eq!(client.next().await["status"], "error");

    client.send(r#"{"action":"start","batchSize":0}"#).await;
    let reply = client.next().await;
    assert_eq!(reply["status"], "error");
    assert!(reply["message"].as_str().unwrap().contains("batch"));

    client.send(r#"{"action":"status"}"#).await;
    assert_eq!(client.next().await["status"], "idle");

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_start_without_batch_size_uses_configured_default() {
    let sink = Arc::new(RecordingSink::default());
    let (mut client, task) =
        start_server_with_batch_size(FakeSource::new(vec![cards(0..5)]), sink.clone(), 2);

    client.send(r#"{"action":"start","mode":"profile"}"#).await;
    assert_eq!(client.next().await["status"], "running");

    let mut batches = Vec::new();
    loop {
        let message = client.next().await;
        if message["event"] == "batch" {
            batches.push(message["items"].as_array().unwrap().len());
        } else {
            assert_eq!(message["status"], "complete");
            break;
        }
    }

    assert_eq!(batches, vec![2, 2, 1]);
    assert_eq!(sink.sizes(), vec![2, 2, 1]);

    drop(client);
    task.await.unwrap().unwrap();
}
