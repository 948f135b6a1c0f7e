use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{
    commands::{
        blpop::blpop,
        command_error::CommandError,
        config_get::config_get,
        del::del,
        echo::echo,
        get::get,
        incr::incr,
        info::info,
        keys::keys,
        llen::llen,
        lpop::lpop,
        lrange::lrange,
        ping::ping,
        replication::{psync, replconf},
        rpush_and_lpush::{lpush, rpush},
        set::set,
        transactions::{discard, exec, multi},
        type_command::type_command,
        xadd::xadd,
        xrange::xrange,
        xread::xread,
    },
    key_value_store::KeyValueStore,
    resp::RespValue,
    server::Server,
    state::State,
};

/// What a handler asks the connection worker to do beyond (or instead of)
/// writing a plain reply.
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Nothing is written; used for frames that are consumed silently.
    NoResponse,
    /// An encoded reply to write back.
    Response(String),
    /// `+QUEUED`: the command was staged inside MULTI, not executed, so it
    /// must not be fanned out to replicas yet.
    Queued(String),
    /// EXEC: the queued commands to run in order, replies collected into
    /// one array.
    Batch(Vec<CommandHandler>),
    /// REPLCONF listening-port on a primary: write the reply, then register
    /// this connection's writer as a replica sink.
    RegisterReplica(String),
    /// PSYNC: write the reply, then stream the snapshot bulk.
    FullResync(String),
}

const TRANSACTION_CONTROL_COMMANDS: [&str; 3] = ["MULTI", "EXEC", "DISCARD"];

/// A parsed request frame: upper-cased command name, its arguments, and the
/// original argv kept verbatim for replica propagation.
#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    pub name: String,
    pub arguments: Vec<String>,
    raw: Vec<String>,
}

impl CommandHandler {
    pub fn new(args: Vec<String>) -> Result<Self, CommandError> {
        let Some(name) = args.first() else {
            return Err(CommandError::UnknownCommand);
        };

        Ok(Self {
            name: name.to_uppercase(),
            arguments: args[1..].to_vec(),
            raw: args,
        })
    }

    /// The original argv, re-encoded as-is when fanning out to replicas.
    pub fn frame(&self) -> &[String] {
        &self.raw
    }

    /// Full client path: inside MULTI everything except the transaction
    /// controls is queued unexecuted and answered `+QUEUED`; otherwise the
    /// command executes immediately.
    pub async fn handle_for_client(
        &self,
        server: &Arc<RwLock<Server>>,
        client_address: &str,
        store: &Arc<Mutex<KeyValueStore>>,
        state: &Arc<Mutex<State>>,
    ) -> Result<CommandResult, CommandError> {
        if !TRANSACTION_CONTROL_COMMANDS.contains(&self.name.as_str()) {
            let mut state_guard = state.lock().await;
            if state_guard.in_transaction(client_address)
                && state_guard
                    .queue_command(client_address, self.clone())
                    .is_ok()
            {
                return Ok(CommandResult::Queued(
                    RespValue::SimpleString("QUEUED".to_string()).encode(),
                ));
            }
        }

        self.execute(server, client_address, store, state).await
    }

    /// Dispatches to the handler for this command name. `client_address`
    /// identifies the connection for transaction and blocking state.
    pub async fn execute(
        &self,
        server: &Arc<RwLock<Server>>,
        client_address: &str,
        store: &Arc<Mutex<KeyValueStore>>,
        state: &Arc<Mutex<State>>,
    ) -> Result<CommandResult, CommandError> {
        match self.name.as_str() {
            "PING" => ping(&self.arguments),
            "ECHO" => echo(&self.arguments),
            "SET" => set(store, &self.arguments).await,
            "GET" => get(store, &self.arguments).await,
            "INCR" => incr(store, &self.arguments).await,
            "DEL" => del(store, &self.arguments).await,
            "TYPE" => type_command(store, &self.arguments).await,
            "RPUSH" => rpush(store, state, &self.arguments).await,
            "LPUSH" => lpush(store, state, &self.arguments).await,
            "LRANGE" => lrange(store, &self.arguments).await,
            "LLEN" => llen(store, &self.arguments).await,
            "LPOP" => lpop(store, &self.arguments).await,
            "BLPOP" => blpop(client_address, store, state, &self.arguments).await,
            "XADD" => xadd(store, state, &self.arguments).await,
            "XRANGE" => xrange(store, &self.arguments).await,
            "XREAD" => xread(client_address, store, state, &self.arguments).await,
            "MULTI" => multi(client_address, state, &self.arguments).await,
            "EXEC" => exec(client_address, state, &self.arguments).await,
            "DISCARD" => discard(client_address, state, &self.arguments).await,
            "INFO" => info(server, &self.arguments).await,
            "CONFIG" => config_get(server, &self.arguments).await,
            "KEYS" => keys(server, &self.arguments).await,
            "REPLCONF" => replconf(server, client_address, &self.arguments).await,
            "PSYNC" => psync(server, &self.arguments).await,
            _ => Err(CommandError::UnknownCommand),
        }
    }

    /// Applies a frame received over the master link. Replies are
    /// suppressed; only `REPLCONF GETACK` produces a frame to send back,
    /// carrying the replica's processed-byte offset.
    pub async fn handle_for_master_link(
        &self,
        server: &Arc<RwLock<Server>>,
        master_address: &str,
        store: &Arc<Mutex<KeyValueStore>>,
        state: &Arc<Mutex<State>>,
    ) -> Result<Option<String>, CommandError> {
        if self.name == "REPLCONF"
            && self
                .arguments
                .first()
                .is_some_and(|arg| arg.eq_ignore_ascii_case("getack"))
        {
            let server_guard = server.read().await;
            return Ok(Some(RespValue::encode_array_from_strings(vec![
                "REPLCONF".to_string(),
                "ACK".to_string(),
                server_guard.repl_offset.to_string(),
            ])));
        }

        self.execute(server, master_address, store, state).await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::CommandHandler;
    use crate::commands::CommandError;

    #[test]
    fn test_new_uppercases_name_and_keeps_raw() {
        let handler = CommandHandler::new(vec![
            "set".to_string(),
            "Key".to_string(),
            "Value".to_string(),
        ])
        .unwrap();

        assert_eq!(handler.name, "SET");
        assert_eq!(handler.arguments, vec!["Key", "Value"]);
        assert_eq!(handler.frame(), ["set", "Key", "Value"]);
    }

    #[test]
    fn test_new_empty_frame() {
        assert_eq!(
            CommandHandler::new(Vec::new()),
            Err(CommandError::UnknownCommand)
        );
    }
}
