mod blpop;
mod command_error;
mod command_handler;
mod config_get;
mod del;
mod echo;
mod get;
mod incr;
mod info;
mod keys;
mod llen;
mod lpop;
mod lrange;
mod ping;
mod replication;
mod rpush_and_lpush;
mod set;
mod stream_utils;
mod transactions;
mod type_command;
mod xadd;
mod xrange;
mod xread;

pub use command_error::CommandError;
pub use command_handler::{CommandHandler, CommandResult};
pub use transactions::run_queued_commands;
