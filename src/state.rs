//! Per-server mutable state that is not the keyspace itself: blocked-client
//! wakeup channels and per-connection transaction queues.
//!
//! Connections are identified by their peer address string, which is unique
//! for the lifetime of the connection.

use std::collections::{HashMap, VecDeque};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::commands::CommandHandler;

#[derive(Error, Debug, PartialEq)]
pub enum StateError {
    #[error("MULTI calls can not be nested")]
    TransactionAlreadyStarted,
    #[error("no transaction in progress")]
    TransactionNotStarted,
}

/// A client parked in BLPOP, waiting for a push on one list key.
#[derive(Debug)]
pub struct ListWaiter {
    pub client_address: String,
    pub sender: oneshot::Sender<()>,
}

/// A client parked in XREAD BLOCK, waiting for an append on one stream key.
#[derive(Debug)]
pub struct StreamWaiter {
    pub client_address: String,
    pub sender: mpsc::Sender<()>,
}

#[derive(Debug, Default)]
pub struct State {
    pub list_waiters: HashMap<String, VecDeque<ListWaiter>>,
    pub stream_waiters: HashMap<String, Vec<StreamWaiter>>,
    pub transactions: HashMap<String, Vec<CommandHandler>>,
}

impl State {
    pub fn new() -> Self {
        State::default()
    }

    /// Enters queueing mode for the connection. Fails when the connection is
    /// already inside MULTI.
    pub fn begin_transaction(&mut self, client_address: String) -> Result<(), StateError> {
        if self.transactions.contains_key(&client_address) {
            return Err(StateError::TransactionAlreadyStarted);
        }

        self.transactions.insert(client_address, Vec::new());
        Ok(())
    }

    pub fn in_transaction(&self, client_address: &str) -> bool {
        self.transactions.contains_key(client_address)
    }

    pub fn queue_command(
        &mut self,
        client_address: &str,
        command: CommandHandler,
    ) -> Result<(), StateError> {
        let Some(queue) = self.transactions.get_mut(client_address) else {
            return Err(StateError::TransactionNotStarted);
        };

        queue.push(command);
        Ok(())
    }

    /// Leaves queueing mode and hands back the queued commands, in receipt
    /// order. Used by both EXEC (execute) and DISCARD (drop).
    pub fn take_transaction(
        &mut self,
        client_address: &str,
    ) -> Result<Vec<CommandHandler>, StateError> {
        self.transactions
            .remove(client_address)
            .ok_or(StateError::TransactionNotStarted)
    }

    pub fn add_list_waiter(&mut self, key: String, waiter: ListWaiter) {
        self.list_waiters.entry(key).or_default().push_back(waiter);
    }

    pub fn remove_list_waiter(&mut self, key: &str, client_address: &str) {
        if let Some(waiters) = self.list_waiters.get_mut(key) {
            waiters.retain(|waiter| waiter.client_address != client_address);
            if waiters.is_empty() {
                self.list_waiters.remove(key);
            }
        }
    }

    /// Wakes the longest-waiting live BLPOP client for `key`, skipping
    /// waiters whose connection is already gone.
    pub fn notify_list_waiter(&mut self, key: &str) {
        let Some(waiters) = self.list_waiters.get_mut(key) else {
            return;
        };

        while let Some(waiter) = waiters.pop_front() {
            if waiter.sender.send(()).is_ok() {
                break;
            }
        }

        if waiters.is_empty() {
            self.list_waiters.remove(key);
        }
    }

    pub fn add_stream_waiter(&mut self, key: String, waiter: StreamWaiter) {
        self.stream_waiters.entry(key).or_default().push(waiter);
    }

    pub fn remove_stream_waiter(&mut self, key: &str, client_address: &str) {
        if let Some(waiters) = self.stream_waiters.get_mut(key) {
            waiters.retain(|waiter| waiter.client_address != client_address);
            if waiters.is_empty() {
                self.stream_waiters.remove(key);
            }
        }
    }

    /// Wakes every XREAD client blocked on `key`; each one re-checks the
    /// stream on its own.
    pub fn notify_stream_waiters(&mut self, key: &str) {
        if let Some(waiters) = self.stream_waiters.get(key) {
            for waiter in waiters {
                let _ = waiter.sender.try_send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::{mpsc, oneshot};

    use super::{ListWaiter, State, StateError, StreamWaiter};
    use crate::commands::CommandHandler;

    fn command(parts: &[&str]) -> CommandHandler {
        CommandHandler::new(parts.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_transaction_lifecycle() {
        let mut state = State::new();
        let client = "127.0.0.1:50000";

        assert_eq!(state.in_transaction(client), false);
        assert_eq!(state.begin_transaction(client.to_string()), Ok(()));
        assert_eq!(
            state.begin_transaction(client.to_string()),
            Err(StateError::TransactionAlreadyStarted)
        );

        state
            .queue_command(client, command(&["SET", "k", "v"]))
            .unwrap();
        state.queue_command(client, command(&["INCR", "n"])).unwrap();

        let queued = state.take_transaction(client).unwrap();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].name, "SET");
        assert_eq!(queued[1].name, "INCR");
        assert_eq!(state.in_transaction(client), false);
        assert_eq!(
            state.take_transaction(client),
            Err(StateError::TransactionNotStarted)
        );
    }

    #[test]
    fn test_queue_command_outside_transaction() {
        let mut state = State::new();
        assert_eq!(
            state.queue_command("127.0.0.1:50001", command(&["PING"])),
            Err(StateError::TransactionNotStarted)
        );
    }

    #[tokio::test]
    async fn test_notify_list_waiter_is_fifo() {
        let mut state = State::new();
        let (first_tx, mut first_rx) = oneshot::channel();
        let (second_tx, mut second_rx) = oneshot::channel();

        state.add_list_waiter(
            "queue".to_string(),
            ListWaiter {
                client_address: "client-1".to_string(),
                sender: first_tx,
            },
        );
        state.add_list_waiter(
            "queue".to_string(),
            ListWaiter {
                client_address: "client-2".to_string(),
                sender: second_tx,
            },
        );

        state.notify_list_waiter("queue");
        assert_eq!(first_rx.try_recv().is_ok(), true);
        assert_eq!(second_rx.try_recv().is_ok(), false);

        state.notify_list_waiter("queue");
        assert_eq!(second_rx.try_recv().is_ok(), true);
        assert_eq!(state.list_waiters.contains_key("queue"), false);
    }

    #[tokio::test]
    async fn test_notify_list_waiter_skips_dropped_receivers() {
        let mut state = State::new();
        let (dead_tx, dead_rx) = oneshot::channel();
        drop(dead_rx);
        let (live_tx, mut live_rx) = oneshot::channel();

        state.add_list_waiter(
            "queue".to_string(),
            ListWaiter {
                client_address: "gone".to_string(),
                sender: dead_tx,
            },
        );
        state.add_list_waiter(
            "queue".to_string(),
            ListWaiter {
                client_address: "here".to_string(),
                sender: live_tx,
            },
        );

        state.notify_list_waiter("queue");
        assert_eq!(live_rx.try_recv().is_ok(), true);
    }

    #[tokio::test]
    async fn test_notify_stream_waiters_wakes_everyone() {
        let mut state = State::new();
        let (first_tx, mut first_rx) = mpsc::channel(4);
        let (second_tx, mut second_rx) = mpsc::channel(4);

        state.add_stream_waiter(
            "events".to_string(),
            StreamWaiter {
                client_address: "client-1".to_string(),
                sender: first_tx,
            },
        );
        state.add_stream_waiter(
            "events".to_string(),
            StreamWaiter {
                client_address: "client-2".to_string(),
                sender: second_tx,
            },
        );

        state.notify_stream_waiters("events");
        assert_eq!(first_rx.try_recv().is_ok(), true);
        assert_eq!(second_rx.try_recv().is_ok(), true);

        state.remove_stream_waiter("events", "client-1");
        state.remove_stream_waiter("events", "client-2");
        assert_eq!(state.stream_waiters.contains_key("events"), false);
    }
}
