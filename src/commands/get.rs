use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{evict_if_expired, DataType, KeyValueStore},
    resp::RespValue,
};

/// Reads a string value. An expired entry is removed on this access and
/// reported as missing.
pub async fn get(
    store: &Arc<Mutex<KeyValueStore>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("GET"));
    }

    let mut store_guard = store.lock().await;
    evict_if_expired(&mut store_guard, &arguments[0]);

    match store_guard.get(&arguments[0]) {
        Some(value) => match value.data {
            DataType::String(ref s) => Ok(CommandResult::Response(
                RespValue::BulkString(s.clone()).encode(),
            )),
            _ => Err(CommandError::WrongDataType),
        },
        None => Ok(CommandResult::Response(RespValue::NullBulkString.encode())),
    }
}
