use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::{Server, ServerRole},
};

/// Answers `PSYNC ? -1` with the full-resync header; the connection worker
/// follows it with the snapshot bulk. Only a primary can serve a resync.
pub async fn psync(
    server: &Arc<RwLock<Server>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 2 {
        return Err(CommandError::WrongNumberOfArguments("PSYNC"));
    }

    let server_guard = server.read().await;

    if server_guard.role != ServerRole::Primary {
        return Err(CommandError::PsyncNotSupported);
    }

    if arguments[0] != "?" && arguments[0] != server_guard.repl_id {
        return Err(CommandError::InvalidPsyncReplicationId);
    }

    if arguments[1].parse::<i64>().is_err() {
        return Err(CommandError::InvalidPsyncOffset);
    }

    Ok(CommandResult::FullResync(
        RespValue::SimpleString(format!(
            "FULLRESYNC {} {}",
            server_guard.repl_id, server_guard.repl_offset
        ))
        .encode(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_psync_full_resync() {
        let server = Arc::new(RwLock::new(Server::new(vec!["coral".to_string()]).unwrap()));
        let repl_id = server.read().await.repl_id.clone();

        let result = psync(&server, &args(&["?", "-1"])).await.unwrap();
        assert_eq!(
            result,
            CommandResult::FullResync(format!("+FULLRESYNC {} 0\r\n", repl_id))
        );
    }

    #[tokio::test]
    async fn test_psync_rejects_unknown_replication_id() {
        let server = Arc::new(RwLock::new(Server::new(vec!["coral".to_string()]).unwrap()));

        assert_eq!(
            psync(&server, &args(&["someotherreplicationid", "-1"])).await,
            Err(CommandError::InvalidPsyncReplicationId)
        );
        assert_eq!(
            psync(&server, &args(&["?", "soon"])).await,
            Err(CommandError::InvalidPsyncOffset)
        );
        assert_eq!(
            psync(&server, &args(&["?"])).await,
            Err(CommandError::WrongNumberOfArguments("PSYNC"))
        );
    }

    #[tokio::test]
    async fn test_psync_rejected_on_replica() {
        let server = Arc::new(RwLock::new(
            Server::new(
                ["coral", "--replicaof", "127.0.0.1 6379"]
                    .iter()
                    .map(|s| s.to_string()),
            )
            .unwrap(),
        ));

        assert_eq!(
            psync(&server, &args(&["?", "-1"])).await,
            Err(CommandError::PsyncNotSupported)
        );
    }
}
