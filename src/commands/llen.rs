use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{DataType, KeyValueStore},
    resp::RespValue,
};

pub async fn llen(
    store: &Arc<Mutex<KeyValueStore>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("LLEN"));
    }

    let store_guard = store.lock().await;

    let length = match store_guard.get(&arguments[0]) {
        Some(value) => match value.data {
            DataType::List(ref list) => list.len(),
            _ => return Err(CommandError::WrongDataType),
        },
        None => 0,
    };

    Ok(CommandResult::Response(
        RespValue::Integer(length as i64).encode(),
    ))
}
