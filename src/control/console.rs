//! Remote console facade
//!
//! Pairs one [`CommandService`] with one [`CommandClient`] built from the same
//! configuration, the way a host process uses them.

use crate::config::Config;
use crate::control::{CommandClient, CommandHandler, CommandService};
use crate::endpoint::{EndpointResolver, HostPrompt};
use crate::processor::CommandProcessor;
use std::sync::Arc;

/// A service and a client sharing one configuration
#[derive(Debug)]
pub struct RemoteConsole {
    service: CommandService,
    client: CommandClient,
}

impl RemoteConsole {
    /// Build a console over `processor`
    ///
    /// Both sides hold clones of one resolver, so a missing host is asked for
    /// at most once.
    pub fn new(
        config: &Config,
        processor: Arc<dyn CommandProcessor>,
        prompt: Arc<dyn HostPrompt>,
    ) -> Self {
        let resolver = EndpointResolver::new(config.remote.clone(), prompt);
        let handler = Arc::new(CommandHandler::new(processor, config.remote.owner_id));

        Self {
            service: CommandService::new(resolver.clone(), handler),
            client: CommandClient::new(resolver),
        }
    }

    /// The command service
    pub fn service(&mut self) -> &mut CommandService {
        &mut self.service
    }

    /// The command client
    pub fn client(&mut self) -> &mut CommandClient {
        &mut self.client
    }

    /// Whether the service is listening
    pub fn is_server_running(&self) -> bool {
        self.service.is_running()
    }

    /// Start the service
    pub async fn start_server(&mut self) {
        self.service.start().await;
    }

    /// Stop the service
    pub async fn stop_server(&mut self) {
        self.service.stop().await;
    }

    /// Relay a command through the client
    pub async fn send_command(&mut self, input: &str) -> Option<String> {
        self.client.send(input).await
    }

    /// Close the client, then stop the service
    pub async fn shutdown(&mut self) {
        self.client.close().await;
        self.service.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;
    use crate::processor::BotRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPrompt {
        calls: AtomicUsize,
    }

    impl HostPrompt for CountingPrompt {
        fn prompt_host(&self) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some("127.0.0.1".to_string())
        }
    }

    async fn unused_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_host_prompted_once_for_service_and_client() {
        let config = Config {
            remote: RemoteConfig {
                host: None,
                port: unused_port().await,
                owner_id: 1,
                send_timeout_secs: 5,
                ..RemoteConfig::default()
            },
            bots: vec!["main".to_string()],
        };
        let prompt = Arc::new(CountingPrompt {
            calls: AtomicUsize::new(0),
        });
        let processor = Arc::new(BotRegistry::new(["main"]));
        let mut console = RemoteConsole::new(&config, processor, prompt.clone());

        console.start_server().await;
        assert!(console.is_server_running());

        let reply = console.send_command("status").await;
        assert!(reply.is_some());
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);

        console.shutdown().await;
        assert!(!console.is_server_running());
    }
}
