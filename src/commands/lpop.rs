use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{DataType, KeyValueStore},
    resp::RespValue,
};

/// Pops from the head of a list.
///
/// Without a count: the head element as a bulk string, or a null bulk when
/// the list is missing or empty. With a count: a null bulk when the count
/// exceeds the list length, otherwise an array of the popped elements in
/// head-to-tail order. A drained list is removed from the keyspace.
pub async fn lpop(
    store: &Arc<Mutex<KeyValueStore>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.is_empty() || arguments.len() > 2 {
        return Err(CommandError::WrongNumberOfArguments("LPOP"));
    }

    let count = match arguments.get(1) {
        Some(raw) => Some(
            raw.parse::<i64>()
                .ok()
                .filter(|count| *count >= 1)
                .ok_or(CommandError::InvalidPopCount)? as usize,
        ),
        None => None,
    };

    let key = &arguments[0];
    let mut store_guard = store.lock().await;

    let list = match store_guard.get_mut(key) {
        Some(value) => match value.data {
            DataType::List(ref mut list) => list,
            _ => return Err(CommandError::WrongDataType),
        },
        None => {
            return Ok(CommandResult::Response(RespValue::NullBulkString.encode()));
        }
    };

    let response = match count {
        None => match list.pop_front() {
            Some(element) => RespValue::BulkString(element).encode(),
            None => RespValue::NullBulkString.encode(),
        },
        Some(count) => {
            if count > list.len() {
                RespValue::NullBulkString.encode()
            } else {
                let popped = list.drain(..count).collect::<Vec<String>>();
                RespValue::encode_array_from_strings(popped)
            }
        }
    };

    // A drained list must not linger as an empty entry.
    if matches!(
        store_guard.get(key),
        Some(value) if matches!(&value.data, DataType::List(list) if list.is_empty())
    ) {
        store_guard.remove(key);
    }

    Ok(CommandResult::Response(response))
}
