use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{DataType, KeyValueStore, Value},
    resp::RespValue,
};

/// Parsed arguments for SET: `SET key value [PX milliseconds]`.
pub struct SetArguments {
    key: String,
    value: String,
    expiration: Option<Timestamp>,
}

impl SetArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 2 && arguments.len() != 4 {
            return Err(CommandError::WrongNumberOfArguments("SET"));
        }

        let mut expiration: Option<Timestamp> = None;

        if arguments.len() == 4 {
            if !arguments[2].eq_ignore_ascii_case("px") {
                return Err(CommandError::SyntaxError);
            }

            let milliseconds = arguments[3]
                .parse::<i64>()
                .ok()
                .filter(|ms| *ms >= 0)
                .ok_or(CommandError::InvalidExpiryValue)?;

            expiration = Some(Timestamp::now() + SignedDuration::from_millis(milliseconds));
        }

        Ok(Self {
            key: arguments[0].clone(),
            value: arguments[1].clone(),
            expiration,
        })
    }
}

/// Stores a string value, replacing any previous entry (and its expiry)
/// regardless of the previous type.
pub async fn set(
    store: &Arc<Mutex<KeyValueStore>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    store_guard.insert(
        set_arguments.key,
        Value {
            data: DataType::String(set_arguments.value),
            expiration: set_arguments.expiration,
        },
    );

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse() {
        assert!(SetArguments::parse(&args(&["k", "v"])).is_ok());
        assert!(SetArguments::parse(&args(&["k", "v", "px", "100"])).is_ok());
        assert!(SetArguments::parse(&args(&["k", "v", "PX", "100"])).is_ok());

        assert_eq!(
            SetArguments::parse(&args(&["k"])).err(),
            Some(CommandError::WrongNumberOfArguments("SET"))
        );
        assert_eq!(
            SetArguments::parse(&args(&["k", "v", "px"])).err(),
            Some(CommandError::WrongNumberOfArguments("SET"))
        );
        assert_eq!(
            SetArguments::parse(&args(&["k", "v", "ex", "100"])).err(),
            Some(CommandError::SyntaxError)
        );
        assert_eq!(
            SetArguments::parse(&args(&["k", "v", "px", "soon"])).err(),
            Some(CommandError::InvalidExpiryValue)
        );
        assert_eq!(
            SetArguments::parse(&args(&["k", "v", "px", "-5"])).err(),
            Some(CommandError::InvalidExpiryValue)
        );
    }

    #[tokio::test]
    async fn test_set_replaces_existing_entry() {
        let store = Arc::new(Mutex::new(KeyValueStore::new()));

        let result = set(&store, &args(&["fruit", "mango"])).await.unwrap();
        assert_eq!(result, CommandResult::Response("+OK\r\n".to_string()));

        set(&store, &args(&["fruit", "pear", "px", "60000"]))
            .await
            .unwrap();

        let store_guard = store.lock().await;
        let value = store_guard.get("fruit").unwrap();
        assert_eq!(value.data, DataType::String("pear".to_string()));
        assert_eq!(value.expiration.is_some(), true);
    }
}
