//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own usage counters and fakes.

use super::constants::*;
use super::fixtures::{AudioBehavior, FakeAudioGenerator, FakeLlmProvider, LlmBehavior};
use charm_ringtone_server::audio::GenerationRequest;
use charm_ringtone_server::composer::Composer;
use charm_ringtone_server::knowledge_base::KnowledgeBase;
use charm_ringtone_server::llm::{CompletionOptions, Message};
use charm_ringtone_server::refiner::PromptRefiner;
use charm_ringtone_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use charm_ringtone_server::usage::{UsageLimiter, UsagePolicy};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Knobs for a spawned server. `Default` gives a refining LLM, a working
/// audio generator and the default usage policy.
#[derive(Clone, Debug)]
pub struct TestServerOptions {
    pub llm: LlmBehavior,
    pub audio: AudioBehavior,
    pub usage: UsagePolicy,
    pub max_duration_seconds: u32,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            llm: LlmBehavior::Refine,
            audio: AudioBehavior::Succeed,
            usage: UsagePolicy::default(),
            max_duration_seconds: 190,
        }
    }
}

/// Test server instance with isolated state
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Messages received by the fake LLM, one entry per call
    pub llm_calls: Arc<Mutex<Vec<Vec<Message>>>>,

    /// Requests received by the fake audio generator
    pub audio_requests: Arc<Mutex<Vec<GenerationRequest>>>,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server with default options on a random port
    pub async fn spawn() -> Self {
        Self::spawn_with(TestServerOptions::default()).await
    }

    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if port binding fails or the server doesn't become ready
    /// within timeout.
    pub async fn spawn_with(options: TestServerOptions) -> Self {
        let knowledge_base =
            KnowledgeBase::embedded().expect("Failed to load bundled knowledge base");
        let composer = Composer::new(Arc::new(knowledge_base));

        let llm_calls = Arc::new(Mutex::new(Vec::new()));
        let refiner = match options.llm {
            LlmBehavior::Disabled => PromptRefiner::disabled(),
            behavior => PromptRefiner::new(
                Arc::new(FakeLlmProvider::new(behavior, llm_calls.clone())),
                CompletionOptions::default(),
            ),
        };

        let audio_requests = Arc::new(Mutex::new(Vec::new()));
        let audio = Arc::new(FakeAudioGenerator::new(
            options.audio,
            audio_requests.clone(),
        ));

        let usage = Arc::new(UsageLimiter::new(options.usage));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            max_duration_seconds: options.max_duration_seconds,
            ..Default::default()
        };

        let app = make_app(config, composer, refiner, audio, usage);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            llm_calls,
            audio_requests,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Number of calls the fake LLM received
    pub fn llm_call_count(&self) -> usize {
        self.llm_calls.lock().unwrap().len()
    }

    /// Last request the fake audio generator received
    pub fn last_audio_request(&self) -> Option<GenerationRequest> {
        self.audio_requests.lock().unwrap().last().cloned()
    }

    /// Waits for the server to become ready by polling /healthz
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/healthz", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
