use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::Server,
};

/// INFO reports the replication section regardless of the requested
/// section name; that is the only section this server has.
pub async fn info(
    server: &Arc<RwLock<Server>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() > 1 {
        return Err(CommandError::WrongNumberOfArguments("INFO"));
    }

    let server_guard = server.read().await;
    let body = format!(
        "# Replication\r\nrole:{}\r\nmaster_replid:{}\r\nmaster_repl_offset:{}\r\n",
        server_guard.role.as_str(),
        server_guard.repl_id,
        server_guard.repl_offset,
    );

    Ok(CommandResult::Response(RespValue::BulkString(body).encode()))
}
