//! Per-connection workers: one for each accepted client, plus the replica's
//! link to its primary.
//!
//! A worker owns its buffered reader and a shared handle to the write half.
//! Replies are written sequentially from the owning task, so partial replies
//! never interleave.

use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};

use crate::commands::{run_queued_commands, CommandError, CommandHandler, CommandResult};
use crate::input::{read_frame, CommandReadError};
use crate::key_value_store::KeyValueStore;
use crate::rdb::empty_snapshot;
use crate::server::{propagate_to_replicas, ReplicaSink, Server, ServerRole};
use crate::state::State;

/// Serves one client connection until it closes or desynchronises.
///
/// Framing errors are answered with a protocol error and terminate the
/// worker; semantic errors are answered and the loop continues. When the
/// connection was registered as a replica sink, closing it unregisters the
/// sink.
pub async fn handle_client_connection(
    stream: TcpStream,
    server: Arc<RwLock<Server>>,
    client_address: String,
    store: Arc<Mutex<KeyValueStore>>,
    state: Arc<Mutex<State>>,
) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let writer = Arc::new(RwLock::new(write_half));

    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(CommandReadError::Protocol) => {
                let error = CommandReadError::Protocol.as_string();
                let _ = write_to_stream(Arc::clone(&writer), error.as_bytes()).await;
                break;
            }
            Err(CommandReadError::ConnectionClosed) | Err(CommandReadError::Io(_)) => break,
            Err(e) => {
                if let Err(e) =
                    write_to_stream(Arc::clone(&writer), e.as_string().as_bytes()).await
                {
                    eprintln!("Error writing to client {}: {}", client_address, e);
                }
                continue;
            }
        };

        if frame.args.is_empty() {
            continue;
        }

        let handler = match CommandHandler::new(frame.args) {
            Ok(handler) => handler,
            Err(e) => {
                if let Err(e) =
                    write_to_stream(Arc::clone(&writer), e.as_string().as_bytes()).await
                {
                    eprintln!("Error writing to client {}: {}", client_address, e);
                }
                continue;
            }
        };

        if is_write_from_client_forbidden(&server, &handler).await {
            let error = CommandError::WriteNotAllowedOnReplica.as_string();
            if let Err(e) = write_to_stream(Arc::clone(&writer), error.as_bytes()).await {
                eprintln!("Error writing to client {}: {}", client_address, e);
            }
            continue;
        }

        let result = handler
            .handle_for_client(&server, &client_address, &store, &state)
            .await;

        let write_result = match result {
            Ok(CommandResult::Response(response)) => {
                let written =
                    write_to_stream(Arc::clone(&writer), response.as_bytes()).await;
                maybe_propagate(&server, &handler).await;
                written
            }
            Ok(CommandResult::Queued(response)) => {
                write_to_stream(Arc::clone(&writer), response.as_bytes()).await
            }
            Ok(CommandResult::NoResponse) => Ok(()),
            Ok(CommandResult::Batch(commands)) => {
                let reply =
                    run_queued_commands(&client_address, &server, &store, &state, commands).await;
                write_to_stream(Arc::clone(&writer), reply.as_bytes()).await
            }
            Ok(CommandResult::RegisterReplica(response)) => {
                let written =
                    write_to_stream(Arc::clone(&writer), response.as_bytes()).await;

                let mut server_guard = server.write().await;
                if let Some(replicas) = &mut server_guard.replicas {
                    replicas.insert(
                        client_address.clone(),
                        ReplicaSink {
                            writer: Arc::clone(&writer),
                            ack_offset: 0,
                        },
                    );
                }
                written
            }
            Ok(CommandResult::FullResync(response)) => {
                // The snapshot bulk carries no trailing CRLF, only the
                // advertised number of raw bytes.
                let snapshot = empty_snapshot();
                let mut payload = response.into_bytes();
                payload.extend_from_slice(format!("${}\r\n", snapshot.len()).as_bytes());
                payload.extend_from_slice(&snapshot);
                write_to_stream(Arc::clone(&writer), &payload).await
            }
            Err(e) => write_to_stream(Arc::clone(&writer), e.as_string().as_bytes()).await,
        };

        if let Err(e) = write_result {
            eprintln!("Error writing to client {}: {}", client_address, e);
        }
    }

    // The connection is gone: drop its replica sink and any open
    // transaction so neither outlives the peer.
    {
        let mut server_guard = server.write().await;
        if let Some(replicas) = &mut server_guard.replicas {
            replicas.remove(&client_address);
        }
    }
    let mut state_guard = state.lock().await;
    state_guard.transactions.remove(&client_address);
}

/// Applies the replicated command stream on a replica.
///
/// Every frame advances the replica's offset by its wire length before it
/// is applied. Replies are suppressed; only `REPLCONF GETACK` sends a frame
/// back to the primary.
pub async fn handle_master_connection(
    mut reader: BufReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    master_address: &str,
    server: Arc<RwLock<Server>>,
    store: Arc<Mutex<KeyValueStore>>,
    state: Arc<Mutex<State>>,
) {
    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(e) => {
                if e.is_fatal() {
                    eprintln!("Connection to master lost: {}", e);
                    break;
                }
                continue;
            }
        };

        {
            let mut server_guard = server.write().await;
            server_guard.repl_offset += frame.byte_len as u64;
        }

        if frame.args.is_empty() {
            continue;
        }

        let handler = match CommandHandler::new(frame.args) {
            Ok(handler) => handler,
            Err(_) => continue,
        };

        match handler
            .handle_for_master_link(&server, master_address, &store, &state)
            .await
        {
            Ok(Some(reply)) => {
                if let Err(e) = writer.write_all(reply.as_bytes()).await {
                    eprintln!("Error writing to master: {}", e);
                    break;
                }
                if let Err(e) = writer.flush().await {
                    eprintln!("Error writing to master: {}", e);
                    break;
                }
            }
            Ok(None) => (),
            Err(e) => {
                eprintln!("Failed to apply replicated command {}: {}", handler.name, e);
            }
        }
    }
}

pub async fn write_to_stream(
    writer: Arc<RwLock<OwnedWriteHalf>>,
    response: &[u8],
) -> tokio::io::Result<()> {
    let mut writer_guard = writer.write().await;
    writer_guard.write_all(response).await?;
    writer_guard.flush().await?;

    Ok(())
}

/// A replica applies writes only from its master link; clients asking for
/// one of the propagated commands are turned away.
async fn is_write_from_client_forbidden(
    server: &Arc<RwLock<Server>>,
    handler: &CommandHandler,
) -> bool {
    let server_guard = server.read().await;

    matches!(server_guard.role, ServerRole::Replica(_))
        && server_guard.is_write_command(&handler.name)
}

async fn maybe_propagate(server: &Arc<RwLock<Server>>, handler: &CommandHandler) {
    let should_propagate = {
        let server_guard = server.read().await;
        server_guard.replicas.is_some() && server_guard.is_write_command(&handler.name)
    };

    if should_propagate {
        propagate_to_replicas(server, handler.frame()).await;
    }
}
