//! Server configuration and the main run loop.
//!
//! A server is either a primary ("master") that fans mutating commands out
//! to its replicas, or a replica ("slave") that performs the handshake with
//! its primary and then applies whatever the primary sends. The role is
//! fixed at startup by the command line.

use std::{collections::HashMap, sync::Arc};

use rand::distr::{Alphanumeric, SampleString};
use regex::Regex;
use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Mutex, RwLock},
};

use crate::connection::{handle_client_connection, handle_master_connection, write_to_stream};
use crate::input::handshake;
use crate::key_value_store::KeyValueStore;
use crate::resp::RespValue;
use crate::state::State;

/// Errors from command-line argument parsing.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("Invalid command line flag")]
    InvalidCommandLineFlag,
    #[error("Invalid port flag value")]
    InvalidPortFlagValue,
    #[error("Invalid master address")]
    InvalidMasterAddress,
    #[error("Invalid master port")]
    InvalidMasterPort,
}

/// Fatal startup failures. Each one maps to a non-zero process exit.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind TCP listener: {0}")]
    Bind(String),
    #[error("failed to connect to master: {0}")]
    MasterUnreachable(String),
    #[error("replication handshake failed: {0}")]
    Handshake(String),
}

#[derive(Debug, PartialEq, Clone)]
pub enum ServerRole {
    Primary,
    /// A replica connected to the primary at (host, port).
    Replica((String, u32)),
}

impl ServerRole {
    /// Wire-facing name of the role, using the protocol's historical terms.
    pub fn as_str(&self) -> &str {
        match self {
            ServerRole::Primary => "master",
            ServerRole::Replica(_) => "slave",
        }
    }
}

/// An outbound replica link held by a primary, keyed by the peer address of
/// the connection the replica registered on.
#[derive(Debug)]
pub struct ReplicaSink {
    pub writer: Arc<RwLock<OwnedWriteHalf>>,
    pub ack_offset: u64,
}

#[derive(Debug)]
pub struct Server {
    pub port: u32,
    pub role: ServerRole,
    /// 40-character alphanumeric replication id generated at startup.
    pub repl_id: String,
    /// Bytes of mutating traffic: frames fanned out (primary) or frames
    /// applied from the master link (replica).
    pub repl_offset: u64,
    /// Replica sinks; `None` unless this server is a primary.
    pub replicas: Option<HashMap<String, ReplicaSink>>,
    /// Commands propagated to replicas and refused from clients of a replica.
    pub write_commands: Vec<&'static str>,
    pub rdb_dir: String,
    pub rdb_filename: String,
}

impl Server {
    /// Builds a server record from command-line arguments.
    ///
    /// Supported flags: `--port <n>`, `--replicaof "<host> <port>"`,
    /// `--dir <path>`, `--dbfilename <name>`.
    pub fn new<I: IntoIterator<Item = String>>(command_line_args: I) -> Result<Self, CliError> {
        let mut iter = command_line_args.into_iter().skip(1);
        let mut port: Option<u32> = None;
        let mut role: Option<ServerRole> = None;
        let mut rdb_dir: Option<String> = None;
        let mut rdb_filename: Option<String> = None;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--port" => {
                    let Some(port_str) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    port = Some(validate_port(&port_str, CliError::InvalidPortFlagValue)?);
                }
                "--replicaof" => {
                    let Some(master_address) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    role = Some(ServerRole::Replica(validate_master_address(
                        &master_address,
                    )?));
                }
                "--dir" => {
                    let Some(dir) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    rdb_dir = Some(dir);
                }
                "--dbfilename" => {
                    let Some(filename) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    rdb_filename = Some(filename);
                }
                _ => return Err(CliError::InvalidCommandLineFlag),
            }
        }

        let role = role.unwrap_or(ServerRole::Primary);
        let replicas = if role == ServerRole::Primary {
            Some(HashMap::new())
        } else {
            None
        };

        Ok(Server {
            port: port.unwrap_or(6379),
            role,
            repl_id: Alphanumeric.sample_string(&mut rand::rng(), 40),
            repl_offset: 0,
            replicas,
            write_commands: Vec::from([
                "SET", "RPUSH", "LPUSH", "XADD", "INCR", "DEL", "LPUSHX", "RPUSHX",
            ]),
            rdb_dir: rdb_dir.unwrap_or_else(|| ".".to_string()),
            rdb_filename: rdb_filename.unwrap_or_else(|| "dump.rdb".to_string()),
        })
    }

    pub fn is_write_command(&self, name: &str) -> bool {
        self.write_commands.contains(&name)
    }

    /// Runs the server until the process exits.
    ///
    /// A replica first dials its primary and completes the handshake (any
    /// failure is fatal), then applies the replicated stream in a background
    /// task. Both roles accept client connections, one task per client.
    pub async fn run(self) -> Result<(), ServerError> {
        let port = self.port;
        let role = self.role.clone();

        let store: Arc<Mutex<KeyValueStore>> = Arc::new(Mutex::new(HashMap::new()));
        let state: Arc<Mutex<State>> = Arc::new(Mutex::new(State::new()));
        let server: Arc<RwLock<Server>> = Arc::new(RwLock::new(self));

        if let ServerRole::Replica((address, master_port)) = role {
            let master_address = format!("{}:{}", address, master_port);

            let stream = TcpStream::connect(&master_address)
                .await
                .map_err(|e| ServerError::MasterUnreachable(e.to_string()))?;

            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            handshake(&mut reader, &mut write_half, port)
                .await
                .map_err(|e| ServerError::Handshake(e.to_string()))?;

            let server_clone = Arc::clone(&server);
            let store_clone = Arc::clone(&store);
            let state_clone = Arc::clone(&state);

            tokio::spawn(async move {
                handle_master_connection(
                    reader,
                    write_half,
                    &master_address,
                    server_clone,
                    store_clone,
                    state_clone,
                )
                .await;
            });
        }

        let listener = TcpListener::bind(format!("127.0.0.1:{}", port))
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        loop {
            match listener.accept().await {
                Ok((stream, client_address)) => {
                    let server_clone = Arc::clone(&server);
                    let store_clone = Arc::clone(&store);
                    let state_clone = Arc::clone(&state);

                    tokio::spawn(async move {
                        handle_client_connection(
                            stream,
                            server_clone,
                            client_address.to_string(),
                            store_clone,
                            state_clone,
                        )
                        .await;
                    });
                }
                Err(e) => {
                    eprintln!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Writes an executed write-command frame to every replica sink and advances
/// the primary's replication offset by the frame's encoded length.
///
/// Sinks are snapshotted under the guard but written outside it; a sink that
/// fails the write is dropped from the set without retry.
pub async fn propagate_to_replicas(server: &Arc<RwLock<Server>>, frame: &[String]) {
    let payload = RespValue::encode_array_from_strings(frame.to_vec());

    let sinks: Vec<(String, Arc<RwLock<OwnedWriteHalf>>)> = {
        let server_guard = server.read().await;
        match &server_guard.replicas {
            Some(replicas) => replicas
                .iter()
                .map(|(address, sink)| (address.clone(), Arc::clone(&sink.writer)))
                .collect(),
            None => return,
        }
    };

    let mut failed = Vec::new();
    for (address, writer) in sinks {
        if let Err(e) = write_to_stream(writer, payload.as_bytes()).await {
            eprintln!("Dropping replica {}: {}", address, e);
            failed.push(address);
        }
    }

    let mut server_guard = server.write().await;
    server_guard.repl_offset += payload.len() as u64;
    if let Some(replicas) = &mut server_guard.replicas {
        for address in failed {
            replicas.remove(&address);
        }
    }
}

fn validate_port(port: &str, error: CliError) -> Result<u32, CliError> {
    let port_number = port.parse::<u32>().map_err(|_| error.clone())?;

    if port_number < 1 || port_number > 65535 {
        return Err(error);
    }

    Ok(port_number)
}

/// Parses a `"host port"` pair. The host must look like an IPv4 address or
/// a plain hostname.
fn validate_master_address(master_address: &str) -> Result<(String, u32), CliError> {
    let ipv4_regex = Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").unwrap();
    let hostname_regex = Regex::new(r"^[a-zA-Z0-9\-\.]+$").unwrap();

    let split_address = master_address.split_whitespace().collect::<Vec<&str>>();
    if split_address.len() != 2 {
        return Err(CliError::InvalidMasterAddress);
    }

    let address = split_address[0];

    let valid_address = if let Some(caps) = ipv4_regex.captures(address) {
        caps.iter().skip(1).all(|octet| {
            octet
                .map(|m| m.as_str().parse::<u16>().map(|v| v <= 255).unwrap_or(false))
                .unwrap_or(false)
        })
    } else {
        hostname_regex.is_match(address)
    };

    if !valid_address {
        return Err(CliError::InvalidMasterAddress);
    }

    let port = validate_port(split_address[1], CliError::InvalidMasterPort)?;

    Ok((address.to_string(), port))
}
