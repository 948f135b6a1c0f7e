use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    state::State,
};

/// Drops the queued commands and leaves queueing mode.
pub async fn discard(
    client_address: &str,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if !arguments.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("DISCARD"));
    }

    let mut state_guard = state.lock().await;
    state_guard
        .take_transaction(client_address)
        .map_err(|_| CommandError::DiscardWithoutMulti)?;

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
