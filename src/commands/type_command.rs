use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{evict_if_expired, DataType, KeyValueStore},
    resp::RespValue,
};

/// TYPE distinguishes streams and live strings; everything else, including
/// lists, reports `none`. The list gap is deliberate compatibility with the
/// behaviour this surface was built against.
pub async fn type_command(
    store: &Arc<Mutex<KeyValueStore>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("TYPE"));
    }

    let mut store_guard = store.lock().await;
    evict_if_expired(&mut store_guard, &arguments[0]);

    let type_name = match store_guard.get(&arguments[0]) {
        Some(value) => match value.data {
            DataType::Stream(_) => "stream",
            DataType::String(_) => "string",
            DataType::List(_) => "none",
        },
        None => "none",
    };

    Ok(CommandResult::Response(
        RespValue::SimpleString(type_name.to_string()).encode(),
    ))
}
