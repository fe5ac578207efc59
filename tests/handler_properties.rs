//! Property-based tests for the command handler and endpoint formatting

use proptest::prelude::*;
use remote_console::control::{CommandHandler, REFUSAL_MESSAGE};
use remote_console::endpoint::Endpoint;
use remote_console::processor::CommandProcessor;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct LastCommand {
    last: Mutex<Option<String>>,
}

impl CommandProcessor for LastCommand {
    fn bot_names(&self) -> Vec<String> {
        vec!["main".to_string()]
    }

    fn status(&self) -> String {
        "{}".to_string()
    }

    fn respond(&self, _bot: &str, _owner_id: u64, command: &str) -> String {
        *self.last.lock().unwrap() = Some(command.to_string());
        command.to_uppercase()
    }
}

proptest! {
    #[test]
    fn prop_commands_arrive_with_trigger(input in "\\PC{1,64}") {
        let processor = Arc::new(LastCommand::default());
        let handler = CommandHandler::new(processor.clone(), 42);

        let reply = handler.handle_command(&input);
        let expected = format!("!{}", input);

        prop_assert_eq!(reply, Some(expected.to_uppercase()));
        prop_assert_eq!(processor.last.lock().unwrap().clone(), Some(expected));
    }

    #[test]
    fn prop_unowned_handler_never_dispatches(input in "\\PC{1,64}") {
        let processor = Arc::new(LastCommand::default());
        let handler = CommandHandler::new(processor.clone(), 0);

        let reply = handler.handle_command(&input);
        prop_assert_eq!(reply.as_deref(), Some(REFUSAL_MESSAGE));
        prop_assert!(processor.last.lock().unwrap().is_none());
    }

    #[test]
    fn prop_endpoint_format(a in 0u8..=255, b in 0u8..=255, port in 1u16..) {
        let host = format!("10.{}.{}.1", a, b);
        let endpoint = Endpoint::new(host.clone(), port);
        prop_assert_eq!(endpoint.to_string(), format!("tcp://{}:{}/ASF", host, port));
    }
}
