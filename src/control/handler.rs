//! Command handler for the remote channel
//!
//! Gatekeeps incoming calls (empty input, missing owner, no bots) and
//! forwards accepted commands to the [`CommandProcessor`], one at a time.

use crate::control::{ApiError, ApiRequest, ApiResponse, RemoteCall};
use crate::error::log_null_argument;
use crate::processor::{CommandProcessor, TRIGGER};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// Reply when no owning identity is configured
pub const REFUSAL_MESSAGE: &str = "Refusing to handle request because SteamOwnerID is not set!";

/// Reply when the processor has no bots
pub const NO_BOTS_MESSAGE: &str = "ERROR: No bots are enabled!";

/// Status reply when no owning identity is configured
pub const EMPTY_STATUS: &str = "{}";

/// Command handler shared by all connections of a service
pub struct CommandHandler {
    processor: Arc<dyn CommandProcessor>,
    owner_id: AtomicU64,
    dispatch: Mutex<()>,
}

impl CommandHandler {
    /// Create a new command handler
    pub fn new(processor: Arc<dyn CommandProcessor>, owner_id: u64) -> Self {
        Self {
            processor,
            owner_id: AtomicU64::new(owner_id),
            dispatch: Mutex::new(()),
        }
    }

    /// Current owning authorization id
    pub fn owner_id(&self) -> u64 {
        self.owner_id.load(Ordering::SeqCst)
    }

    /// Establish or clear (0) the owning identity
    pub fn set_owner_id(&self, owner_id: u64) {
        self.owner_id.store(owner_id, Ordering::SeqCst);
        info!("Remote console owner set to {}", owner_id);
    }

    /// Status snapshot, or `"{}"` without an owner
    pub fn get_status(&self) -> String {
        if self.owner_id() == 0 {
            return EMPTY_STATUS.to_string();
        }
        self.processor.status()
    }

    /// Execute one command and return its reply
    ///
    /// Blocks until the processor answers. Concurrent callers queue behind
    /// the command in flight.
    pub fn handle_command(&self, input: &str) -> Option<String> {
        if input.is_empty() {
            log_null_argument("input");
            return None;
        }

        let owner_id = self.owner_id();
        if owner_id == 0 {
            return Some(REFUSAL_MESSAGE.to_string());
        }

        let _guard = self.dispatch.lock().unwrap_or_else(|p| p.into_inner());

        let mut bots = self.processor.bot_names();
        bots.sort();
        let Some(bot) = bots.first() else {
            return Some(NO_BOTS_MESSAGE.to_string());
        };

        let command = format!("{}{}", TRIGGER, input);
        let output = self.processor.respond(bot, owner_id, &command);

        info!("Answered to remote command: {} with: {}", input, output);
        Some(output)
    }

    /// Handle a decoded request addressed to `service_path`
    pub async fn handle_request(
        self: &Arc<Self>,
        request: ApiRequest,
        service_path: &str,
    ) -> ApiResponse {
        debug!("Handling request {}: {:?}", request.id, request.call);

        if request.service != service_path {
            error!(
                "Request {} addressed unknown service '{}'",
                request.id, request.service
            );
            return ApiResponse::error(request.id, ApiError::UnknownService(request.service));
        }

        let handler = Arc::clone(self);
        let call = request.call;
        let outcome = tokio::task::spawn_blocking(move || match call {
            RemoteCall::GetStatus => Some(handler.get_status()),
            RemoteCall::HandleCommand { input } => handler.handle_command(&input),
        })
        .await;

        match outcome {
            Ok(result) => ApiResponse::success(request.id, result),
            Err(e) => {
                error!("Request {} failed: {}", request.id, e);
                ApiResponse::error(
                    request.id,
                    ApiError::InternalError(format!("command processing failed: {}", e)),
                )
            }
        }
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("owner_id", &self.owner_id())
            .finish_non_exhaustive()
    }
}
