use coral::server::Server;

/// Entry point: parse the command line into a server record and run it.
///
/// Exits non-zero when the command line is malformed, the listening port
/// cannot be bound or, in replica mode, the primary is unreachable.
#[tokio::main]
async fn main() {
    let server = match Server::new(std::env::args()) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to configure server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
