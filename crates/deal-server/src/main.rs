//! Server implementation

#![warn(missing_docs)]

mod http;

use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use deal_core::{Config, IdScheme, RequestHandler};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Command line options
#[derive(Parser, Debug)]
#[command(about = "In-memory registry of claimable deals served over HTTP")]
struct Opts {
    /// Host for the HTTP server to listen on
    #[arg(long, env = "DEAL_HOST", default_value = "127.0.0.1")]
    host: String,
    /// Port for the HTTP server to listen on
    #[arg(long, env = "DEAL_PORT", default_value_t = 8082)]
    port: u16,
    /// Number of HTTP worker threads
    #[arg(long, env = "DEAL_HTTP_THREADS", default_value_t = 16)]
    threads: u32,

    /// Identifier scheme for new deals (`uuid` or `sequential`)
    #[arg(long, env = "DEAL_ID_SCHEME", default_value = "uuid")]
    id_scheme: IdScheme,

    /// Emit logs as JSON lines
    #[arg(long, env = "DEAL_LOG_JSON")]
    log_json: bool,
}

impl Opts {
    fn config(&self) -> Config {
        Config {
            id_scheme: self.id_scheme,
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Serve requests until the server is unblocked or stops accepting connections
fn http_loop<H: RequestHandler>(server: &tiny_http::Server, handler: &H) {
    loop {
        match server.recv() {
            Ok(rq) => {
                if let Some(rq) = http::parse(rq) {
                    handler.handle(rq);
                }
            }
            Err(e) => {
                debug!(error = %e, "stopping HTTP worker");
                return;
            }
        }
    }
}

/// Block until the process receives Ctrl-C
fn wait_for_shutdown_signal() -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the signal runtime")?;
    rt.block_on(tokio::signal::ctrl_c())
        .context("failed to listen for the shutdown signal")?;
    info!("received shutdown signal");
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let opts = Opts::parse();
    init_logging(opts.log_json);

    let addr = (opts.host.as_str(), opts.port);
    let server = tiny_http::Server::http(addr)
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("failed to listen on {}:{}", opts.host, opts.port))?;

    let service = deal_registry::launch(&opts.config());
    info!(
        host = %opts.host,
        port = opts.port,
        threads = opts.threads,
        id_scheme = ?opts.id_scheme,
        "deal server listening"
    );

    let workers = opts.threads.max(1);
    thread::scope(|s| -> Result<()> {
        let spawned = (0..workers).try_for_each(|i| {
            thread::Builder::new()
                .name(format!("http_{i}"))
                .spawn_scoped(s, || http_loop(&server, &service))
                .map(drop)
        });
        let result = match spawned {
            Ok(()) => wait_for_shutdown_signal(),
            Err(e) => Err(e).context("failed to spawn HTTP worker"),
        };
        // Each unblock makes exactly one pending `recv` return an error
        for _ in 0..workers {
            server.unblock();
        }
        result
    })?;

    service.shutdown();
    Ok(())
}
