use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{evict_if_expired, DataType, KeyValueStore, Value},
    resp::RespValue,
};

/// Increments the integer stored at a key.
///
/// A missing (or expired) key is created with value 1. A value that does not
/// parse as a signed 64-bit integer is an error. An existing expiry is left
/// untouched by the increment.
pub async fn incr(
    store: &Arc<Mutex<KeyValueStore>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("INCR"));
    }

    let mut store_guard = store.lock().await;
    evict_if_expired(&mut store_guard, &arguments[0]);

    let Some(value) = store_guard.get_mut(&arguments[0]) else {
        store_guard.insert(
            arguments[0].clone(),
            Value {
                data: DataType::String("1".to_string()),
                expiration: None,
            },
        );
        return Ok(CommandResult::Response(RespValue::Integer(1).encode()));
    };

    match value.data {
        DataType::String(ref mut stored) => {
            let current = stored
                .parse::<i64>()
                .map_err(|_| CommandError::NotAnInteger)?;
            let incremented = current + 1;
            *stored = incremented.to_string();

            Ok(CommandResult::Response(
                RespValue::Integer(incremented).encode(),
            ))
        }
        _ => Err(CommandError::WrongDataType),
    }
}
