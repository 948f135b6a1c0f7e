use std::{sync::Arc, time::Duration};

use tokio::sync::{oneshot, Mutex};
use tokio::time::{timeout_at, Instant};

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{DataType, KeyValueStore},
    resp::RespValue,
    state::{ListWaiter, State},
};

/// Blocking head pop.
///
/// `timeout` is a non-negative number of seconds; `0` blocks until data
/// arrives. Replies `[key, value]` once an element is available and a null
/// bulk when the deadline passes first.
///
/// The waiter re-arms: a wakeup whose element was taken by a faster client
/// goes back to waiting instead of giving up early.
pub async fn blpop(
    client_address: &str,
    store: &Arc<Mutex<KeyValueStore>>,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 2 {
        return Err(CommandError::WrongNumberOfArguments("BLPOP"));
    }

    let timeout_secs = arguments[1]
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .ok_or(CommandError::InvalidTimeout)?;

    let key = &arguments[0];
    let deadline = (timeout_secs > 0.0).then(|| Instant::now() + Duration::from_secs_f64(timeout_secs));

    loop {
        // Register before checking the list so a push landing between the
        // check and the wait cannot be missed.
        let (sender, receiver) = oneshot::channel();
        {
            let mut state_guard = state.lock().await;
            state_guard.add_list_waiter(
                key.clone(),
                ListWaiter {
                    client_address: client_address.to_string(),
                    sender,
                },
            );
        }

        match pop_head(store, key).await {
            Ok(Some(element)) => {
                let mut state_guard = state.lock().await;
                state_guard.remove_list_waiter(key, client_address);

                return Ok(CommandResult::Response(
                    RespValue::encode_array_from_strings(vec![key.clone(), element]),
                ));
            }
            Ok(None) => (),
            Err(e) => {
                let mut state_guard = state.lock().await;
                state_guard.remove_list_waiter(key, client_address);
                return Err(e);
            }
        }

        let woken = match deadline {
            None => receiver.await.is_ok(),
            Some(deadline) => match timeout_at(deadline, receiver).await {
                Ok(result) => result.is_ok(),
                Err(_) => false,
            },
        };

        {
            let mut state_guard = state.lock().await;
            state_guard.remove_list_waiter(key, client_address);
        }

        if !woken {
            return Ok(CommandResult::Response(RespValue::NullBulkString.encode()));
        }
    }
}

/// Removes and returns the head of the list at `key`, deleting the key when
/// it drains.
async fn pop_head(
    store: &Arc<Mutex<KeyValueStore>>,
    key: &str,
) -> Result<Option<String>, CommandError> {
    let mut store_guard = store.lock().await;

    let Some(value) = store_guard.get_mut(key) else {
        return Ok(None);
    };

    let DataType::List(ref mut list) = value.data else {
        return Err(CommandError::WrongDataType);
    };

    let element = list.pop_front();
    if list.is_empty() {
        store_guard.remove(key);
    }

    Ok(element)
}
