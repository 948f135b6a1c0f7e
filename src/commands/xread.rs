use std::{sync::Arc, time::Duration};

use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout_at, Instant};

use crate::{
    commands::{
        command_error::CommandError,
        command_handler::CommandResult,
        stream_utils::{entries_to_resp, parse_entry_id},
    },
    key_value_store::{DataType, KeyValueStore, StreamEntry, StreamEntryId},
    resp::RespValue,
    state::{State, StreamWaiter},
};

#[derive(Debug, PartialEq)]
struct XreadArguments {
    block_ms: Option<u64>,
    keys_and_ids: Vec<(String, String)>,
}

impl XreadArguments {
    fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::WrongNumberOfArguments("XREAD"));
        }

        let (block_ms, streams_index) = if arguments[0].eq_ignore_ascii_case("block") {
            let duration = arguments
                .get(1)
                .and_then(|raw| raw.parse::<u64>().ok())
                .ok_or(CommandError::InvalidBlockDuration)?;

            if !arguments
                .get(2)
                .is_some_and(|arg| arg.eq_ignore_ascii_case("streams"))
            {
                return Err(CommandError::SyntaxError);
            }

            (Some(duration), 3)
        } else if arguments[0].eq_ignore_ascii_case("streams") {
            (None, 1)
        } else {
            return Err(CommandError::SyntaxError);
        };

        let rest = &arguments[streams_index..];
        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("XREAD"));
        }

        let half = rest.len() / 2;
        let keys_and_ids = (0..half)
            .map(|i| (rest[i].clone(), rest[half + i].clone()))
            .collect();

        Ok(Self {
            block_ms,
            keys_and_ids,
        })
    }
}

/// Tail-follow read over one or more streams, returning entries strictly
/// after the given ids.
///
/// `$` resolves at call time to the stream's current tail, so only entries
/// appended after the call began qualify. Without BLOCK the reply is
/// immediate and streams with nothing new still appear as `[key, []]`; with
/// BLOCK the call suspends until some stream has data (only non-empty pairs
/// are returned) or replies a null bulk at the deadline.
pub async fn xread(
    client_address: &str,
    store: &Arc<Mutex<KeyValueStore>>,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let xread_arguments = XreadArguments::parse(arguments)?;
    let resolved = resolve_start_ids(store, &xread_arguments.keys_and_ids).await?;

    let Some(block_ms) = xread_arguments.block_ms else {
        let pairs = read_streams(store, &resolved, true).await?;
        return Ok(CommandResult::Response(RespValue::Array(pairs).encode()));
    };

    let deadline = (block_ms > 0).then(|| Instant::now() + Duration::from_millis(block_ms));

    // Register on every stream before the first check so an append landing
    // in between cannot be missed. The sender handle stays alive for the
    // whole wait; waiters hold clones.
    let (sender, mut receiver) = mpsc::channel(8);
    {
        let mut state_guard = state.lock().await;
        for (key, _) in &resolved {
            state_guard.add_stream_waiter(
                key.clone(),
                StreamWaiter {
                    client_address: client_address.to_string(),
                    sender: sender.clone(),
                },
            );
        }
    }

    let outcome = loop {
        match read_streams(store, &resolved, false).await {
            Ok(pairs) if !pairs.is_empty() => break Ok(Some(pairs)),
            Ok(_) => (),
            Err(e) => break Err(e),
        }

        let woken = match deadline {
            None => receiver.recv().await.is_some(),
            Some(deadline) => match timeout_at(deadline, receiver.recv()).await {
                Ok(received) => received.is_some(),
                Err(_) => false,
            },
        };

        if !woken {
            break Ok(None);
        }
    };

    {
        let mut state_guard = state.lock().await;
        for (key, _) in &resolved {
            state_guard.remove_stream_waiter(key, client_address);
        }
    }

    match outcome? {
        Some(pairs) => Ok(CommandResult::Response(RespValue::Array(pairs).encode())),
        None => Ok(CommandResult::Response(RespValue::NullBulkString.encode())),
    }
}

/// Turns the caller's id strings into concrete exclusive lower bounds. `$`
/// becomes the current tail id, or `0-0` for a stream with no entries yet.
async fn resolve_start_ids(
    store: &Arc<Mutex<KeyValueStore>>,
    keys_and_ids: &[(String, String)],
) -> Result<Vec<(String, StreamEntryId)>, CommandError> {
    let store_guard = store.lock().await;
    let mut resolved = Vec::with_capacity(keys_and_ids.len());

    for (key, raw_id) in keys_and_ids {
        let id = if raw_id == "$" {
            match store_guard.get(key) {
                Some(value) => match value.data {
                    DataType::Stream(ref stream) => stream
                        .last()
                        .map(|entry| entry.id)
                        .unwrap_or(StreamEntryId::new(0, 0)),
                    _ => return Err(CommandError::WrongDataType),
                },
                None => StreamEntryId::new(0, 0),
            }
        } else {
            parse_entry_id(raw_id, 0)?
        };

        resolved.push((key.clone(), id));
    }

    Ok(resolved)
}

async fn read_streams(
    store: &Arc<Mutex<KeyValueStore>>,
    resolved: &[(String, StreamEntryId)],
    include_empty: bool,
) -> Result<Vec<RespValue>, CommandError> {
    let store_guard = store.lock().await;
    let mut pairs = Vec::new();

    for (key, after) in resolved {
        let matching: Vec<&StreamEntry> = match store_guard.get(key) {
            Some(value) => match value.data {
                DataType::Stream(ref stream) => stream
                    .iter()
                    .filter(|entry| entry.id > *after)
                    .collect(),
                _ => return Err(CommandError::WrongDataType),
            },
            None => Vec::new(),
        };

        if matching.is_empty() && !include_empty {
            continue;
        }

        pairs.push(RespValue::Array(vec![
            RespValue::BulkString(key.clone()),
            entries_to_resp(&matching),
        ]));
    }

    Ok(pairs)
}
