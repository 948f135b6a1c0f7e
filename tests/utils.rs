//! Shared helpers for the integration tests: an in-process environment that
//! drives commands through the same dispatch path a connection worker uses.

use std::collections::HashMap;
use std::sync::Arc;

use coral::commands::{run_queued_commands, CommandHandler, CommandResult};
use coral::key_value_store::KeyValueStore;
use coral::server::Server;
use coral::state::State;
use tokio::sync::{Mutex, RwLock};

pub struct TestEnv {
    pub server: Arc<RwLock<Server>>,
    pub store: Arc<Mutex<KeyValueStore>>,
    pub state: Arc<Mutex<State>>,
}

impl TestEnv {
    pub fn new_primary() -> Self {
        Self::with_args(&["coral"])
    }

    pub fn with_args(args: &[&str]) -> Self {
        Self::from_vec(args.iter().map(|s| s.to_string()).collect())
    }

    pub fn from_vec(args: Vec<String>) -> Self {
        Self {
            server: Arc::new(RwLock::new(Server::new(args).unwrap())),
            store: Arc::new(Mutex::new(HashMap::new())),
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    pub fn clone_handles(&self) -> Self {
        Self {
            server: Arc::clone(&self.server),
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
        }
    }

    /// Runs one command through the full client dispatch path and returns
    /// the encoded reply exactly as it would reach the wire. `client`
    /// stands in for the peer address that identifies the connection.
    pub async fn exec(&self, client: &str, parts: &[&str]) -> String {
        let handler =
            match CommandHandler::new(parts.iter().map(|s| s.to_string()).collect::<Vec<_>>()) {
                Ok(handler) => handler,
                Err(e) => return e.as_string(),
            };

        match handler
            .handle_for_client(&self.server, client, &self.store, &self.state)
            .await
        {
            Ok(CommandResult::Response(reply))
            | Ok(CommandResult::Queued(reply))
            | Ok(CommandResult::RegisterReplica(reply))
            | Ok(CommandResult::FullResync(reply)) => reply,
            Ok(CommandResult::NoResponse) => String::new(),
            Ok(CommandResult::Batch(commands)) => {
                run_queued_commands(client, &self.server, &self.store, &self.state, commands).await
            }
            Err(e) => e.as_string(),
        }
    }

    /// Convenience wrapper asserting the reply in one step.
    pub async fn exec_expect(&self, client: &str, parts: &[&str], expected: &str) {
        let reply = self.exec(client, parts).await;
        assert_eq!(reply, expected, "running {:?}", parts);
    }
}
