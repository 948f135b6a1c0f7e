use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{
    commands::{
        command_error::CommandError,
        command_handler::{CommandHandler, CommandResult},
    },
    key_value_store::KeyValueStore,
    resp::RespValue,
    server::{propagate_to_replicas, Server},
    state::State,
};

/// Leaves queueing mode and hands the queued commands back for execution.
/// An empty queue still produces an (empty) array reply.
pub async fn exec(
    client_address: &str,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if !arguments.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("EXEC"));
    }

    let mut state_guard = state.lock().await;
    let queued = state_guard
        .take_transaction(client_address)
        .map_err(|_| CommandError::ExecWithoutMulti)?;

    if queued.is_empty() {
        return Ok(CommandResult::Response(
            RespValue::Array(Vec::new()).encode(),
        ));
    }

    Ok(CommandResult::Batch(queued))
}

/// Runs an EXEC batch in order and joins the per-command replies into one
/// array. Execution is not atomic against other connections.
///
/// On a primary, each successfully executed write command is fanned out to
/// the replica sinks before the next queued command runs, so replicas see
/// the batch in the same order it was applied locally.
pub async fn run_queued_commands(
    client_address: &str,
    server: &Arc<RwLock<Server>>,
    store: &Arc<Mutex<KeyValueStore>>,
    state: &Arc<Mutex<State>>,
    commands: Vec<CommandHandler>,
) -> String {
    let mut reply = format!("*{}\r\n", commands.len());

    for command in commands {
        match command.execute(server, client_address, store, state).await {
            Ok(result) => {
                reply.push_str(&response_text(&result));

                let should_propagate = {
                    let server_guard = server.read().await;
                    server_guard.replicas.is_some()
                        && server_guard.is_write_command(&command.name)
                };
                if should_propagate {
                    propagate_to_replicas(server, command.frame()).await;
                }
            }
            Err(e) => reply.push_str(&e.as_string()),
        }
    }

    reply
}

fn response_text(result: &CommandResult) -> String {
    match result {
        CommandResult::Response(response)
        | CommandResult::Queued(response)
        | CommandResult::RegisterReplica(response)
        | CommandResult::FullResync(response) => response.clone(),
        // Queued commands with socket-level effects cannot perform them from
        // inside a batch; hold the array shape with a null placeholder.
        CommandResult::NoResponse | CommandResult::Batch(_) => RespValue::NullBulkString.encode(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::transactions::multi;
    use crate::server::Server;

    fn handler(parts: &[&str]) -> CommandHandler {
        CommandHandler::new(parts.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn env() -> (
        Arc<RwLock<Server>>,
        Arc<Mutex<KeyValueStore>>,
        Arc<Mutex<State>>,
    ) {
        (
            Arc::new(RwLock::new(
                Server::new(vec!["coral".to_string()]).unwrap(),
            )),
            Arc::new(Mutex::new(KeyValueStore::new())),
            Arc::new(Mutex::new(State::new())),
        )
    }

    #[tokio::test]
    async fn test_exec_without_multi() {
        let state = Arc::new(Mutex::new(State::new()));
        assert_eq!(
            exec("client", &state, &[]).await,
            Err(CommandError::ExecWithoutMulti)
        );
    }

    #[tokio::test]
    async fn test_exec_empty_transaction() {
        let state = Arc::new(Mutex::new(State::new()));
        multi("client", &state, &[]).await.unwrap();

        let result = exec("client", &state, &[]).await.unwrap();
        assert_eq!(result, CommandResult::Response("*0\r\n".to_string()));
        assert_eq!(state.lock().await.in_transaction("client"), false);
    }

    #[tokio::test]
    async fn test_exec_returns_batch() {
        let state = Arc::new(Mutex::new(State::new()));
        multi("client", &state, &[]).await.unwrap();
        state
            .lock()
            .await
            .queue_command("client", handler(&["INCR", "n"]))
            .unwrap();

        let result = exec("client", &state, &[]).await.unwrap();
        assert!(matches!(result, CommandResult::Batch(commands) if commands.len() == 1));
    }

    #[tokio::test]
    async fn test_run_queued_commands_in_order() {
        let (server, store, state) = env();

        let reply = run_queued_commands(
            "client",
            &server,
            &store,
            &state,
            vec![handler(&["INCR", "n"]), handler(&["INCR", "n"])],
        )
        .await;

        assert_eq!(reply, "*2\r\n:1\r\n:2\r\n");
    }

    #[tokio::test]
    async fn test_run_queued_commands_reports_errors_inline() {
        let (server, store, state) = env();

        let reply = run_queued_commands(
            "client",
            &server,
            &store,
            &state,
            vec![
                handler(&["SET", "k", "v"]),
                handler(&["NONSENSE"]),
                handler(&["GET", "k"]),
            ],
        )
        .await;

        assert_eq!(
            reply,
            "*3\r\n+OK\r\n-ERR unknown command\r\n$1\r\nv\r\n"
        );
    }
}
