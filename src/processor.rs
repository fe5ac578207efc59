//! Command processor seam
//!
//! The service never interprets commands itself. It hands a prefixed command
//! string to a [`CommandProcessor`], which owns the bots and their command
//! logic. [`BotRegistry`] is a small built-in processor used by the binary.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Prefix marking text as a command
pub const TRIGGER: char = '!';

/// Executes commands on behalf of the remote channel
///
/// Calls are synchronous and may take arbitrarily long.
#[cfg_attr(test, mockall::automock)]
pub trait CommandProcessor: Send + Sync {
    /// Names of the bots currently able to take commands
    fn bot_names(&self) -> Vec<String>;

    /// Structured status snapshot of all bots
    fn status(&self) -> String;

    /// Execute `command` on `bot` as `owner_id` and return the reply
    fn respond(&self, bot: &str, owner_id: u64, command: &str) -> String;
}

#[derive(Debug, Default)]
struct BotEntry {
    commands_handled: AtomicU64,
}

#[derive(Serialize)]
struct BotStatus<'a> {
    name: &'a str,
    commands_handled: u64,
}

#[derive(Serialize)]
struct RegistryStatus<'a> {
    version: &'static str,
    bots: Vec<BotStatus<'a>>,
}

/// Built-in processor answering a handful of housekeeping commands
#[derive(Debug, Default)]
pub struct BotRegistry {
    bots: BTreeMap<String, BotEntry>,
}

impl BotRegistry {
    /// Create a registry with the given bot names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bots: names
                .into_iter()
                .map(|n| (n.into(), BotEntry::default()))
                .collect(),
        }
    }

    /// Number of registered bots
    pub fn len(&self) -> usize {
        self.bots.len()
    }

    /// Whether no bots are registered
    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

impl CommandProcessor for BotRegistry {
    fn bot_names(&self) -> Vec<String> {
        self.bots.keys().cloned().collect()
    }

    fn status(&self) -> String {
        let status = RegistryStatus {
            version: crate::VERSION,
            bots: self
                .bots
                .iter()
                .map(|(name, entry)| BotStatus {
                    name,
                    commands_handled: entry.commands_handled.load(Ordering::Relaxed),
                })
                .collect(),
        };
        serde_json::to_string(&status).unwrap_or_else(|_| "{}".to_string())
    }

    fn respond(&self, bot: &str, owner_id: u64, command: &str) -> String {
        let Some(entry) = self.bots.get(bot) else {
            return format!("<{}> Bot not found!", bot);
        };
        entry.commands_handled.fetch_add(1, Ordering::Relaxed);
        debug!("Bot {} executing {:?} for {}", bot, command, owner_id);

        let Some(body) = command.strip_prefix(TRIGGER) else {
            return format!("<{}> Not a command: {}", bot, command);
        };

        let mut words = body.split_whitespace();
        match words.next().map(str::to_ascii_lowercase).as_deref() {
            Some("status") => format!(
                "<{}> Running, {} command(s) handled",
                bot,
                entry.commands_handled.load(Ordering::Relaxed)
            ),
            Some("version") => format!("<{}> {} V{}", bot, crate::APP_NAME, crate::VERSION),
            Some("bots") => format!("<{}> {}", bot, self.bot_names().join(", ")),
            Some("help") => format!("<{}> Available commands: bots, help, status, version", bot),
            _ => format!("<{}> Unknown command!", bot),
        }
    }
}
