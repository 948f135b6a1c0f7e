use std::path::Path;
use std::sync::Arc;

use globset::Glob;
use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    rdb::read_snapshot_key,
    resp::RespValue,
    server::Server,
};

/// KEYS is a deliberately narrow snapshot probe on this surface: it reads
/// the configured snapshot file, extracts the single key name stored after
/// the hash-table-size marker, and returns it when the glob pattern
/// matches. A missing or malformed snapshot is an empty array, not an
/// error; the in-memory keyspace is never consulted.
pub async fn keys(
    server: &Arc<RwLock<Server>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("KEYS"));
    }

    let matcher = Glob::new(&arguments[0])
        .map_err(|e| CommandError::InvalidGlobPattern(e.to_string()))?
        .compile_matcher();

    let snapshot_path = {
        let server_guard = server.read().await;
        Path::new(&server_guard.rdb_dir).join(&server_guard.rdb_filename)
    };

    let Ok(snapshot) = tokio::fs::read(&snapshot_path).await else {
        return Ok(CommandResult::Response(RespValue::Array(Vec::new()).encode()));
    };

    let response = match read_snapshot_key(&snapshot) {
        Some(key) if matcher.is_match(&key) => vec![RespValue::BulkString(key)],
        _ => Vec::new(),
    };

    Ok(CommandResult::Response(RespValue::Array(response).encode()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    async fn server_with_snapshot(dir: &Path, filename: &str) -> Arc<RwLock<Server>> {
        Arc::new(RwLock::new(
            Server::new(
                [
                    "coral",
                    "--dir",
                    dir.to_str().unwrap(),
                    "--dbfilename",
                    filename,
                ]
                .iter()
                .map(|s| s.to_string()),
            )
            .unwrap(),
        ))
    }

    fn snapshot_with_key(key: &str) -> Vec<u8> {
        let mut bytes = b"REDIS0011".to_vec();
        bytes.extend_from_slice(&[0xFB, 0x01, 0x00, 0x00, key.len() as u8]);
        bytes.extend_from_slice(key.as_bytes());
        bytes.extend_from_slice(&[0xFF, 0, 0, 0, 0, 0, 0, 0, 0]);
        bytes
    }

    #[tokio::test]
    async fn test_keys_reads_snapshot_key() {
        let dir = std::env::temp_dir().join("coral-keys-test-match");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("dump.rdb"), snapshot_with_key("orange"))
            .await
            .unwrap();

        let server = server_with_snapshot(&dir, "dump.rdb").await;

        let result = keys(&server, &args(&["*"])).await.unwrap();
        assert_eq!(
            result,
            CommandResult::Response("*1\r\n$6\r\norange\r\n".to_string())
        );

        // A non-matching pattern filters the key out.
        let result = keys(&server, &args(&["apple*"])).await.unwrap();
        assert_eq!(result, CommandResult::Response("*0\r\n".to_string()));

        let result = keys(&server, &args(&["or*"])).await.unwrap();
        assert_eq!(
            result,
            CommandResult::Response("*1\r\n$6\r\norange\r\n".to_string())
        );
    }

    #[tokio::test]
    async fn test_keys_without_snapshot_is_empty() {
        let dir = std::env::temp_dir().join("coral-keys-test-missing");
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let server = server_with_snapshot(&dir, "no-such-file.rdb").await;

        let result = keys(&server, &args(&["*"])).await.unwrap();
        assert_eq!(result, CommandResult::Response("*0\r\n".to_string()));
    }

    #[tokio::test]
    async fn test_keys_arity() {
        let dir = std::env::temp_dir();
        let server = server_with_snapshot(&dir, "dump.rdb").await;
        assert_eq!(
            keys(&server, &[]).await,
            Err(CommandError::WrongNumberOfArguments("KEYS"))
        );
    }
}
