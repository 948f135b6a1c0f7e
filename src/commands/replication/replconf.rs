use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::Server,
};

/// Handles REPLCONF on a connection the server accepted.
///
/// `listening-port` is the registration step of the handshake: the reply is
/// `+OK` and the connection worker records this connection as a replica
/// sink. `ACK <offset>` from a replica updates the sink's acked offset and
/// gets no reply. Every other form is acknowledged with `+OK`.
///
/// (`GETACK` only ever arrives over a replica's master link and is answered
/// there, with the replica's processed-byte offset.)
pub async fn replconf(
    server: &Arc<RwLock<Server>>,
    client_address: &str,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("REPLCONF"));
    }

    match arguments[0].to_lowercase().as_str() {
        "listening-port" => {
            // The port is validated but the sink is keyed by the peer
            // address of this connection, which is where frames are sent.
            arguments
                .get(1)
                .and_then(|raw| raw.parse::<u32>().ok())
                .filter(|port| (1..=65535).contains(port))
                .ok_or(CommandError::InvalidPortNumber)?;

            Ok(CommandResult::RegisterReplica(
                RespValue::SimpleString("OK".to_string()).encode(),
            ))
        }
        "ack" => {
            let offset = arguments
                .get(1)
                .and_then(|raw| raw.parse::<u64>().ok())
                .ok_or(CommandError::WrongNumberOfArguments("REPLCONF"))?;

            let mut server_guard = server.write().await;
            if let Some(replicas) = &mut server_guard.replicas {
                if let Some(sink) = replicas.get_mut(client_address) {
                    sink.ack_offset = offset;
                }
            }

            Ok(CommandResult::NoResponse)
        }
        _ => Ok(CommandResult::Response(
            RespValue::SimpleString("OK".to_string()).encode(),
        )),
    }
}
