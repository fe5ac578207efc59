//! Self-contained integration tests for the remote command channel
//!
//! These tests start their own command service on an ephemeral port and talk
//! to it through the client or a raw socket.

use remote_console::config::{Config, RemoteConfig};
use remote_console::control::{
    CommandClient, CommandHandler, CommandService, ConnectionState, RemoteConsole, ServiceState,
    NO_BOTS_MESSAGE, REFUSAL_MESSAGE,
};
use remote_console::endpoint::{EndpointResolver, NoPrompt};
use remote_console::processor::{BotRegistry, CommandProcessor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Processor recording every command it receives
#[derive(Default)]
struct RecordingProcessor {
    bots: Vec<String>,
    reply: String,
    received: Mutex<Vec<(String, u64, String)>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingProcessor {
    fn new(bots: &[&str], reply: &str) -> Self {
        Self {
            bots: bots.iter().map(|b| b.to_string()).collect(),
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    fn received(&self) -> Vec<(String, u64, String)> {
        self.received.lock().unwrap().clone()
    }
}

impl CommandProcessor for RecordingProcessor {
    fn bot_names(&self) -> Vec<String> {
        self.bots.clone()
    }

    fn status(&self) -> String {
        r#"{"bots":["recording"]}"#.to_string()
    }

    fn respond(&self, bot: &str, owner_id: u64, command: &str) -> String {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.received
            .lock()
            .unwrap()
            .push((bot.to_string(), owner_id, command.to_string()));
        std::thread::sleep(self.delay);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

fn loopback_config(port: u16, owner_id: u64) -> RemoteConfig {
    RemoteConfig {
        host: Some("127.0.0.1".to_string()),
        port,
        owner_id,
        send_timeout_secs: 5,
        ..RemoteConfig::default()
    }
}

async fn start_service(processor: Arc<dyn CommandProcessor>, owner_id: u64) -> CommandService {
    let handler = Arc::new(CommandHandler::new(processor, owner_id));
    let mut service = CommandService::new(
        EndpointResolver::non_interactive(loopback_config(0, owner_id)),
        handler,
    );
    service.start().await;
    assert_eq!(service.state(), ServiceState::Running);
    service
}

fn client_for(service: &CommandService) -> CommandClient {
    let port = service.local_addr().expect("service not bound").port();
    CommandClient::new(EndpointResolver::non_interactive(loopback_config(port, 0)))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_end_to_end_status_command() {
    let processor = Arc::new(RecordingProcessor::new(&["main"], "<main> Running"));
    let mut service = start_service(processor.clone(), 76561198006963719).await;
    let mut client = client_for(&service);

    let reply = client.send("status").await;

    assert_eq!(reply.as_deref(), Some("<main> Running"));
    assert_eq!(
        processor.received(),
        vec![(
            "main".to_string(),
            76561198006963719,
            "!status".to_string()
        )]
    );
    assert_eq!(client.state(), ConnectionState::Connected);

    client.close().await;
    service.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refusal_without_owner() {
    let processor = Arc::new(RecordingProcessor::new(&["main"], "unused"));
    let mut service = start_service(processor.clone(), 0).await;
    let mut client = client_for(&service);

    assert_eq!(client.send("status").await.as_deref(), Some(REFUSAL_MESSAGE));
    assert_eq!(client.status().await.as_deref(), Some("{}"));
    assert!(processor.received().is_empty());
    assert!(service.is_running());

    service.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_bots_error() {
    let processor = Arc::new(RecordingProcessor::new(&[], "unused"));
    let mut service = start_service(processor.clone(), 42).await;
    let mut client = client_for(&service);

    assert_eq!(client.send("status").await.as_deref(), Some(NO_BOTS_MESSAGE));
    assert!(processor.received().is_empty());
    assert!(service.is_running());

    service.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_query_with_owner() {
    let processor = Arc::new(RecordingProcessor::new(&["main"], "unused"));
    let mut service = start_service(processor, 42).await;
    let mut client = client_for(&service);

    assert_eq!(
        client.status().await.as_deref(),
        Some(r#"{"bots":["recording"]}"#)
    );

    service.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_reused_across_sends() {
    let processor = Arc::new(RecordingProcessor::new(&["main"], "ok"));
    let mut service = start_service(processor.clone(), 42).await;
    let mut client = client_for(&service);

    for _ in 0..3 {
        assert_eq!(client.send("version").await.as_deref(), Some("ok"));
        assert_eq!(client.state(), ConnectionState::Connected);
    }
    assert_eq!(processor.received().len(), 3);

    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);
    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);

    // A closed client reconnects on the next send
    assert_eq!(client.send("version").await.as_deref(), Some("ok"));
    assert_eq!(client.state(), ConnectionState::Connected);

    service.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_commands_execute_one_at_a_time() {
    let processor = Arc::new(RecordingProcessor {
        delay: Duration::from_millis(100),
        ..RecordingProcessor::new(&["main"], "done")
    });
    let mut service = start_service(processor.clone(), 42).await;

    let mut tasks = Vec::new();
    for i in 0..4 {
        let mut client = client_for(&service);
        tasks.push(tokio::spawn(async move {
            client.send(&format!("cmd{}", i)).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().as_deref(), Some("done"));
    }

    assert_eq!(processor.received().len(), 4);
    assert_eq!(processor.max_in_flight.load(Ordering::SeqCst), 1);

    service.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_after_stop_fails() {
    let processor = Arc::new(RecordingProcessor::new(&["main"], "ok"));
    let mut service = start_service(processor, 42).await;
    let mut client = client_for(&service);
    service.stop().await;

    let reply = timeout(Duration::from_secs(10), client.send("status"))
        .await
        .expect("send exceeded its timeout");
    assert_eq!(reply, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_raw_protocol_errors() {
    let processor = Arc::new(RecordingProcessor::new(&["main"], "ok"));
    let mut service = start_service(processor.clone(), 42).await;
    let addr = service.local_addr().unwrap();

    let stream = TcpStream::connect(addr).await.expect("Failed to connect");
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    writer.write_all(b"this is not json\n").await.unwrap();
    reader.read_line(&mut line).await.unwrap();
    let response: serde_json::Value = serde_json::from_str(&line).expect("Parse failed");
    assert_eq!(response["success"], false);
    assert_eq!(response["error"]["type"], "ParseError");

    line.clear();
    writer
        .write_all(b"{\"id\":\"x-1\",\"service\":\"IPC\",\"call\":{\"op\":\"get_status\"}}\n")
        .await
        .unwrap();
    reader.read_line(&mut line).await.unwrap();
    let response: serde_json::Value = serde_json::from_str(&line).expect("Parse failed");
    assert_eq!(response["id"], "x-1");
    assert_eq!(response["error"]["type"], "UnknownService");

    line.clear();
    writer
        .write_all(b"{\"id\":\"x-2\",\"service\":\"ASF\",\"call\":{\"op\":\"handle_command\",\"input\":\"\"}}\n")
        .await
        .unwrap();
    reader.read_line(&mut line).await.unwrap();
    let response: serde_json::Value = serde_json::from_str(&line).expect("Parse failed");
    assert_eq!(response["success"], true);
    assert!(response.get("result").is_none());

    assert!(processor.received().is_empty());
    service.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_console_with_bot_registry() {
    let mut config = Config::new();
    config.remote = loopback_config(0, 42);
    config.bots = vec!["second".to_string(), "first".to_string()];

    let registry = Arc::new(BotRegistry::new(config.bots.clone()));
    let mut host = RemoteConsole::new(&config, registry, Arc::new(NoPrompt));
    host.start_server().await;
    assert!(host.is_server_running());
    let port = host.service().local_addr().unwrap().port();

    config.remote.port = port;
    let mut caller = RemoteConsole::new(
        &config,
        Arc::new(BotRegistry::default()),
        Arc::new(NoPrompt),
    );

    assert_eq!(
        caller.send_command("status").await.as_deref(),
        Some("<first> Running, 1 command(s) handled")
    );
    assert_eq!(caller.send_command("").await, None);

    caller.shutdown().await;
    host.shutdown().await;
    assert!(!host.is_server_running());
}
