use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    state::State,
};

/// Enters queueing mode for this connection. Until EXEC or DISCARD, every
/// other command is staged instead of executed.
pub async fn multi(
    client_address: &str,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if !arguments.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("MULTI"));
    }

    let mut state_guard = state.lock().await;
    state_guard
        .begin_transaction(client_address.to_string())
        .map_err(|_| CommandError::MultiNested)?;

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
