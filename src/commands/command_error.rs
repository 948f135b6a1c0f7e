use thiserror::Error;

use crate::resp::RespValue;

/// Semantic command failures. Every variant's display text is the wire
/// message after the `ERR ` prefix; the connection stays open.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("unknown command")]
    UnknownCommand,
    #[error("wrong number of arguments for '{0}'")]
    WrongNumberOfArguments(&'static str),
    #[error("syntax error")]
    SyntaxError,
    #[error("invalid expiry value")]
    InvalidExpiryValue,
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("invalid number of turns")]
    InvalidPopCount,
    #[error("timeout is not a float or out of range")]
    InvalidTimeout,
    #[error("timeout is not an integer or out of range")]
    InvalidBlockDuration,
    #[error("invalid data type for key")]
    WrongDataType,
    #[error("{0}")]
    InvalidStreamId(String),
    #[error("MULTI calls can not be nested")]
    MultiNested,
    #[error("EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("unknown subcommand for 'CONFIG'")]
    UnknownConfigSubcommand,
    #[error("invalid port number")]
    InvalidPortNumber,
    #[error("psync is only supported in master mode")]
    PsyncNotSupported,
    #[error("invalid PSYNC replication ID")]
    InvalidPsyncReplicationId,
    #[error("invalid PSYNC offset")]
    InvalidPsyncOffset,
    #[error("write commands not allowed against a replica")]
    WriteNotAllowedOnReplica,
    #[error("invalid glob pattern: {0}")]
    InvalidGlobPattern(String),
}

impl CommandError {
    /// Renders the error as a RESP error reply.
    pub fn as_string(&self) -> String {
        RespValue::Error(format!("ERR {}", self)).encode()
    }
}
