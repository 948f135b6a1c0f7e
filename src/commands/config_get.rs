use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::Server,
};

/// `CONFIG GET pattern`: replies the recognised snapshot settings (`dir`
/// and `dbfilename`) as an alternating name/value array. The pattern is
/// matched literally, with `*` selecting both; anything else matches
/// nothing. Other CONFIG subcommands are not supported.
pub async fn config_get(
    server: &Arc<RwLock<Server>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let Some(subcommand) = arguments.first() else {
        return Err(CommandError::WrongNumberOfArguments("CONFIG"));
    };

    if !subcommand.eq_ignore_ascii_case("get") {
        return Err(CommandError::UnknownConfigSubcommand);
    }

    if arguments.len() != 2 {
        return Err(CommandError::WrongNumberOfArguments("CONFIG GET"));
    }

    let pattern = arguments[1].as_str();
    let server_guard = server.read().await;
    let mut response = Vec::new();

    if pattern == "*" || pattern == "dir" {
        response.push(RespValue::BulkString("dir".to_string()));
        response.push(RespValue::BulkString(server_guard.rdb_dir.clone()));
    }
    if pattern == "*" || pattern == "dbfilename" {
        response.push(RespValue::BulkString("dbfilename".to_string()));
        response.push(RespValue::BulkString(server_guard.rdb_filename.clone()));
    }

    Ok(CommandResult::Response(RespValue::Array(response).encode()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    async fn server_with_snapshot_config() -> Arc<RwLock<Server>> {
        Arc::new(RwLock::new(
            Server::new(
                ["coral", "--dir", "/data", "--dbfilename", "dump.rdb"]
                    .iter()
                    .map(|s| s.to_string()),
            )
            .unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_config_get_single_name() {
        let server = server_with_snapshot_config().await;

        let result = config_get(&server, &args(&["GET", "dir"])).await.unwrap();
        assert_eq!(
            result,
            CommandResult::Response("*2\r\n$3\r\ndir\r\n$5\r\n/data\r\n".to_string())
        );
    }

    #[tokio::test]
    async fn test_config_get_wildcard() {
        let server = server_with_snapshot_config().await;

        let result = config_get(&server, &args(&["get", "*"])).await.unwrap();
        assert_eq!(
            result,
            CommandResult::Response(
                "*4\r\n$3\r\ndir\r\n$5\r\n/data\r\n$10\r\ndbfilename\r\n$8\r\ndump.rdb\r\n"
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_config_get_unknown_name() {
        let server = server_with_snapshot_config().await;

        let result = config_get(&server, &args(&["GET", "maxmemory"]))
            .await
            .unwrap();
        assert_eq!(result, CommandResult::Response("*0\r\n".to_string()));
    }

    #[tokio::test]
    async fn test_config_errors() {
        let server = server_with_snapshot_config().await;

        assert_eq!(
            config_get(&server, &[]).await,
            Err(CommandError::WrongNumberOfArguments("CONFIG"))
        );
        assert_eq!(
            config_get(&server, &args(&["SET", "dir", "/tmp"])).await,
            Err(CommandError::UnknownConfigSubcommand)
        );
        assert_eq!(
            config_get(&server, &args(&["GET"])).await,
            Err(CommandError::WrongNumberOfArguments("CONFIG GET"))
        );
    }
}
