use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{DataType, KeyValueStore, StreamEntry, StreamEntryId, Value},
    resp::RespValue,
    state::State,
};

const ID_ZERO: &str = "The ID specified in XADD must be greater than 0-0";
const ID_TOO_SMALL: &str =
    "The ID specified in XADD is equal or smaller than the target stream top item";
const ID_FORMAT: &str = "Invalid stream ID format";

/// The id forms XADD accepts.
enum IdSpec {
    /// `*`: wall-clock milliseconds, sequence chosen against the top entry.
    Auto,
    /// `ms-*`: fixed milliseconds, sequence chosen against the top entry.
    AutoSeq(u64),
    /// `ms-seq`: used verbatim after monotonicity checks.
    Explicit(StreamEntryId),
}

struct XaddArguments {
    key: String,
    id_spec: IdSpec,
    fields: Vec<(String, String)>,
}

impl XaddArguments {
    fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() < 4 || arguments.len() % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("XADD"));
        }

        Ok(Self {
            key: arguments[0].clone(),
            id_spec: parse_id_spec(&arguments[1])?,
            fields: arguments[2..]
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect(),
        })
    }
}

fn parse_id_spec(raw: &str) -> Result<IdSpec, CommandError> {
    if raw == "*" {
        return Ok(IdSpec::Auto);
    }

    let Some((ms_part, seq_part)) = raw.split_once('-') else {
        return Err(CommandError::InvalidStreamId(ID_FORMAT.to_string()));
    };

    if ms_part.is_empty() || seq_part.is_empty() || seq_part.contains('-') {
        return Err(CommandError::InvalidStreamId(ID_FORMAT.to_string()));
    }

    let ms = ms_part
        .parse::<u64>()
        .map_err(|_| CommandError::InvalidStreamId(ID_ZERO.to_string()))?;

    if seq_part == "*" {
        return Ok(IdSpec::AutoSeq(ms));
    }

    let seq = seq_part
        .parse::<u64>()
        .map_err(|_| CommandError::InvalidStreamId(ID_ZERO.to_string()))?;

    Ok(IdSpec::Explicit(StreamEntryId::new(ms, seq)))
}

/// The sequence an auto-generated id gets at `ms`: one past the top entry
/// when the milliseconds match, else 0 — except that a fresh stream at
/// `ms == 0` starts at 1 so `0-0` is never written. Milliseconds behind the
/// top entry cannot be generated at all.
fn next_sequence(top: Option<StreamEntryId>, ms: u64) -> Result<u64, CommandError> {
    match top {
        None => Ok(if ms == 0 { 1 } else { 0 }),
        Some(top) => {
            if ms == top.ms {
                Ok(top.seq + 1)
            } else if ms > top.ms {
                Ok(0)
            } else {
                Err(CommandError::InvalidStreamId(ID_TOO_SMALL.to_string()))
            }
        }
    }
}

/// Appends an entry to a stream, creating the stream on first use.
///
/// The chosen id must be strictly greater than the stream's current top id;
/// `0-0` is rejected outright. Every XREAD client blocked on the key is
/// woken after the append.
pub async fn xadd(
    store: &Arc<Mutex<KeyValueStore>>,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let xadd_arguments = XaddArguments::parse(arguments)?;

    let id = {
        let mut store_guard = store.lock().await;

        let top = match store_guard.get(&xadd_arguments.key) {
            Some(value) => match value.data {
                DataType::Stream(ref stream) => stream.last().map(|entry| entry.id),
                _ => return Err(CommandError::WrongDataType),
            },
            None => None,
        };

        let id = match xadd_arguments.id_spec {
            IdSpec::Auto => {
                let ms = Timestamp::now().as_millisecond() as u64;
                StreamEntryId::new(ms, next_sequence(top, ms)?)
            }
            IdSpec::AutoSeq(ms) => StreamEntryId::new(ms, next_sequence(top, ms)?),
            IdSpec::Explicit(id) => {
                if id.is_zero() {
                    return Err(CommandError::InvalidStreamId(ID_ZERO.to_string()));
                }
                if top.is_some_and(|top| id <= top) {
                    return Err(CommandError::InvalidStreamId(ID_TOO_SMALL.to_string()));
                }
                id
            }
        };

        let entry = StreamEntry {
            id,
            fields: xadd_arguments.fields,
        };

        match store_guard.get_mut(&xadd_arguments.key) {
            Some(Value {
                data: DataType::Stream(stream),
                ..
            }) => stream.push(entry),
            _ => {
                store_guard.insert(
                    xadd_arguments.key.clone(),
                    Value {
                        data: DataType::Stream(vec![entry]),
                        expiration: None,
                    },
                );
            }
        }

        id
    };

    let mut state_guard = state.lock().await;
    state_guard.notify_stream_waiters(&xadd_arguments.key);

    Ok(CommandResult::Response(
        RespValue::BulkString(id.to_string()).encode(),
    ))
}
