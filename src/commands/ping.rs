use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
};

pub fn ping(_arguments: &[String]) -> Result<CommandResult, CommandError> {
    Ok(CommandResult::Response(
        RespValue::SimpleString("PONG".to_string()).encode(),
    ))
}
