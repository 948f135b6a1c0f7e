use std::{collections::VecDeque, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{DataType, KeyValueStore, Value},
    resp::RespValue,
    state::State,
};

/// RPUSH: appends values at the tail in argument order.
pub async fn rpush(
    store: &Arc<Mutex<KeyValueStore>>,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    push("RPUSH", store, state, arguments, false).await
}

/// LPUSH: inserts each value at the head left-to-right, so the last
/// argument ends up at the head.
pub async fn lpush(
    store: &Arc<Mutex<KeyValueStore>>,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    push("LPUSH", store, state, arguments, true).await
}

async fn push(
    command_name: &'static str,
    store: &Arc<Mutex<KeyValueStore>>,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
    prepend: bool,
) -> Result<CommandResult, CommandError> {
    if arguments.len() < 2 {
        return Err(CommandError::WrongNumberOfArguments(command_name));
    }

    let key = &arguments[0];
    let values = &arguments[1..];

    let new_length = {
        let mut store_guard = store.lock().await;

        match store_guard.get_mut(key) {
            Some(Value {
                data: DataType::List(list),
                ..
            }) => {
                push_values(list, values, prepend);
                list.len()
            }
            Some(_) => return Err(CommandError::WrongDataType),
            None => {
                let mut list = VecDeque::with_capacity(values.len());
                push_values(&mut list, values, prepend);
                let length = list.len();
                store_guard.insert(
                    key.clone(),
                    Value {
                        data: DataType::List(list),
                        expiration: None,
                    },
                );
                length
            }
        }
    };

    // Wake a parked BLPOP client after the store guard is released.
    let mut state_guard = state.lock().await;
    state_guard.notify_list_waiter(key);

    Ok(CommandResult::Response(
        RespValue::Integer(new_length as i64).encode(),
    ))
}

fn push_values(list: &mut VecDeque<String>, values: &[String], prepend: bool) {
    for value in values {
        if prepend {
            list.push_front(value.clone());
        } else {
            list.push_back(value.clone());
        }
    }
}
