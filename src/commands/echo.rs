use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
};

/// ECHO replies its first argument as a bulk string; with no argument it
/// replies an empty bulk rather than an arity error.
pub fn echo(arguments: &[String]) -> Result<CommandResult, CommandError> {
    let message = arguments.first().cloned().unwrap_or_default();

    Ok(CommandResult::Response(
        RespValue::BulkString(message).encode(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo() {
        let result = echo(&["hello".to_string()]).unwrap();
        assert_eq!(
            result,
            CommandResult::Response("$5\r\nhello\r\n".to_string())
        );
    }

    #[test]
    fn test_echo_without_message() {
        let result = echo(&[]).unwrap();
        assert_eq!(result, CommandResult::Response("$0\r\n\r\n".to_string()));
    }
}
