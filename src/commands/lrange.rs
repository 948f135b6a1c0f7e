use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{DataType, KeyValueStore},
    resp::RespValue,
};

/// Returns the inclusive index range `[start, end]` of a list, with
/// negative indices counting from the tail.
pub async fn lrange(
    store: &Arc<Mutex<KeyValueStore>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 3 {
        return Err(CommandError::WrongNumberOfArguments("LRANGE"));
    }

    let start_index = arguments[1]
        .parse::<isize>()
        .map_err(|_| CommandError::NotAnInteger)?;
    let end_index = arguments[2]
        .parse::<isize>()
        .map_err(|_| CommandError::NotAnInteger)?;

    let store_guard = store.lock().await;

    let Some(value) = store_guard.get(&arguments[0]) else {
        return Ok(CommandResult::Response(RespValue::Array(Vec::new()).encode()));
    };

    let DataType::List(ref list) = value.data else {
        return Err(CommandError::WrongDataType);
    };

    let Some((start, end)) = normalise_range(list.len(), start_index, end_index) else {
        return Ok(CommandResult::Response(RespValue::Array(Vec::new()).encode()));
    };

    let range = list
        .range(start..=end)
        .cloned()
        .collect::<Vec<String>>();

    Ok(CommandResult::Response(
        RespValue::encode_array_from_strings(range),
    ))
}

/// Normalisation, in order: both endpoints negative add the length to both;
/// otherwise only a negative end gets the length added; start clamps to 0
/// and end to `len - 1`; an empty window yields `None`.
fn normalise_range(length: usize, start_index: isize, end_index: isize) -> Option<(usize, usize)> {
    let length = length as isize;

    let mut start = start_index;
    let mut end = end_index;

    if start < 0 && end < 0 {
        start += length;
        end += length;
    } else if end < 0 {
        end += length;
    }

    start = start.max(0);
    end = end.min(length - 1);

    if start >= length || start > end {
        return None;
    }

    Some((start as usize, end as usize))
}
