//! Frame-level input: reading RESP request frames from a socket and the
//! replica side of the replication handshake.
//!
//! Framing errors are fatal to a connection because the byte stream can no
//! longer be trusted; everything else is reported as an error reply and the
//! connection carries on.

use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::resp::RespValue;

#[derive(Error, Debug)]
pub enum CommandReadError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Protocol error")]
    Protocol,
    #[error("Invalid UTF-8 sequence")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("Invalid response from master")]
    InvalidResponseFromMaster,
}

impl CommandReadError {
    /// Fatal errors terminate the connection; the rest produce an error
    /// reply and leave it open.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CommandReadError::Io(_) | CommandReadError::ConnectionClosed | CommandReadError::Protocol
        )
    }

    pub fn as_string(&self) -> String {
        match self {
            CommandReadError::Protocol => RespValue::Error("ERR Protocol error".to_string()).encode(),
            other => RespValue::Error(format!("ERR {}", other)).encode(),
        }
    }
}

/// One decoded request frame plus the number of raw bytes it occupied on the
/// wire. The byte count feeds replication offset accounting.
#[derive(Debug, PartialEq)]
pub struct Frame {
    pub args: Vec<String>,
    pub byte_len: usize,
}

async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    byte_len: &mut usize,
) -> Result<String, CommandReadError> {
    let mut buf = Vec::new();
    let read = reader
        .read_until(b'\n', &mut buf)
        .await
        .map_err(|e| CommandReadError::Io(e.to_string()))?;

    if read == 0 {
        return Err(CommandReadError::ConnectionClosed);
    }

    *byte_len += read;
    Ok(String::from_utf8(buf)?)
}

/// Reads one `*<N>` array-of-bulk-strings frame.
///
/// Returns [`CommandReadError::Protocol`] when the leading byte is not `*`,
/// the element count does not parse, or a bulk header is not `$<n>`. Header
/// lines tolerate surrounding whitespace; the terminators themselves must be
/// CRLF-framed lines.
pub async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Frame, CommandReadError> {
    let mut byte_len = 0;

    let header = read_line(reader, &mut byte_len).await?;
    let header = header.trim();
    let Some(count) = header.strip_prefix('*') else {
        return Err(CommandReadError::Protocol);
    };
    let count = count
        .trim()
        .parse::<usize>()
        .map_err(|_| CommandReadError::Protocol)?;

    let mut args = Vec::with_capacity(count);

    for _ in 0..count {
        let bulk_header = read_line(reader, &mut byte_len).await?;
        let bulk_header = bulk_header.trim();
        let Some(length) = bulk_header.strip_prefix('$') else {
            return Err(CommandReadError::Protocol);
        };
        let length = length
            .trim()
            .parse::<usize>()
            .map_err(|_| CommandReadError::Protocol)?;

        let mut payload = vec![0u8; length + 2];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => CommandReadError::ConnectionClosed,
                _ => CommandReadError::Io(e.to_string()),
            })?;
        byte_len += length + 2;

        payload.truncate(length);
        args.push(String::from_utf8(payload)?);
    }

    Ok(Frame { args, byte_len })
}

fn is_valid_replication_id(repl_id: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9]{40}$").unwrap();
    re.is_match(repl_id)
}

async fn send_handshake_command(
    reader: &mut tokio::io::BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
    parts: Vec<String>,
) -> Result<String, CommandReadError> {
    writer
        .write_all(RespValue::encode_array_from_strings(parts).as_bytes())
        .await
        .map_err(|e| CommandReadError::Io(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| CommandReadError::Io(e.to_string()))?;

    let mut ignored = 0;
    let line = read_line(reader, &mut ignored).await?;
    Ok(line.trim().to_string())
}

/// Performs the replica side of the replication handshake:
/// PING, REPLCONF listening-port, REPLCONF capa psync2, PSYNC ? -1, then
/// consumes (and discards) the snapshot bulk the primary streams back.
///
/// Any deviation from the expected reply sequence is fatal to the replica.
pub async fn handshake(
    reader: &mut tokio::io::BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
    own_port: u32,
) -> Result<(), CommandReadError> {
    let response = send_handshake_command(reader, writer, vec!["PING".to_string()]).await?;
    if response != "+PONG" {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    let response = send_handshake_command(
        reader,
        writer,
        vec![
            "REPLCONF".to_string(),
            "listening-port".to_string(),
            own_port.to_string(),
        ],
    )
    .await?;
    if response != "+OK" {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    let response = send_handshake_command(
        reader,
        writer,
        vec![
            "REPLCONF".to_string(),
            "capa".to_string(),
            "psync2".to_string(),
        ],
    )
    .await?;
    if response != "+OK" {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    let response = send_handshake_command(
        reader,
        writer,
        vec!["PSYNC".to_string(), "?".to_string(), "-1".to_string()],
    )
    .await?;

    let parts = response.split_whitespace().collect::<Vec<&str>>();
    if parts.len() != 3
        || parts[0] != "+FULLRESYNC"
        || !is_valid_replication_id(parts[1])
        || parts[2].parse::<u64>().is_err()
    {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    // The snapshot bulk has no trailing CRLF: exactly the advertised length.
    let mut ignored = 0;
    let snapshot_header = read_line(reader, &mut ignored).await?;
    let snapshot_header = snapshot_header.trim();
    let Some(length) = snapshot_header.strip_prefix('$') else {
        return Err(CommandReadError::InvalidResponseFromMaster);
    };
    let length = length
        .parse::<usize>()
        .map_err(|_| CommandReadError::InvalidResponseFromMaster)?;

    let mut snapshot = vec![0u8; length];
    reader
        .read_exact(&mut snapshot)
        .await
        .map_err(|e| CommandReadError::Io(e.to_string()))?;

    Ok(())
}
