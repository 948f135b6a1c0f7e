use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{evict_if_expired, KeyValueStore},
    resp::RespValue,
};

/// Removes keys eagerly, whatever their type, and replies with the number
/// actually removed. An already-expired string is evicted but not counted:
/// it was logically gone before the call.
pub async fn del(
    store: &Arc<Mutex<KeyValueStore>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("DEL"));
    }

    let mut store_guard = store.lock().await;
    let mut removed = 0;

    for key in arguments {
        if evict_if_expired(&mut store_guard, key) {
            continue;
        }
        if store_guard.remove(key).is_some() {
            removed += 1;
        }
    }

    Ok(CommandResult::Response(
        RespValue::Integer(removed).encode(),
    ))
}
