use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{
        command_error::CommandError,
        command_handler::CommandResult,
        stream_utils::{entries_to_resp, parse_entry_id},
    },
    key_value_store::{DataType, KeyValueStore, StreamEntry, StreamEntryId},
    resp::RespValue,
};

/// Inclusive range scan over a stream.
///
/// `-` stands for `0-1`, the smallest id a stream can hold; `+` stands for
/// the largest possible id. A bound without a sequence part defaults to 0
/// at the start and to the maximum signed 64-bit value at the end.
pub async fn xrange(
    store: &Arc<Mutex<KeyValueStore>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 3 {
        return Err(CommandError::WrongNumberOfArguments("XRANGE"));
    }

    let start = parse_range_bound(&arguments[1], 0)?;
    let end = parse_range_bound(&arguments[2], i64::MAX as u64)?;

    let store_guard = store.lock().await;

    let Some(value) = store_guard.get(&arguments[0]) else {
        return Ok(CommandResult::Response(RespValue::Array(Vec::new()).encode()));
    };

    let DataType::Stream(ref stream) = value.data else {
        return Err(CommandError::WrongDataType);
    };

    let matching = stream
        .iter()
        .filter(|entry| entry.id >= start && entry.id <= end)
        .collect::<Vec<&StreamEntry>>();

    Ok(CommandResult::Response(entries_to_resp(&matching).encode()))
}

fn parse_range_bound(raw: &str, default_seq: u64) -> Result<StreamEntryId, CommandError> {
    match raw {
        "-" => Ok(StreamEntryId::new(0, 1)),
        "+" => Ok(StreamEntryId::MAX),
        _ => parse_entry_id(raw, default_seq),
    }
}
