use anyhow::Result;
use clap::Parser;
use search_server::build_app;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// Serve ranked queries over HTTP from a saved index file.
#[derive(Parser)]
#[command(name = "search-server", version)]
struct ServeArgs {
    /// Index file written by `search_engine index`
    #[arg(long, default_value = "./index.dat")]
    index: String,
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,
    #[arg(long, default_value_t = 5000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = ServeArgs::parse();
    let app = build_app(&args.index)?;

    let listener = TcpListener::bind(SocketAddr::new(args.host, args.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, index = %args.index, "accepting search requests");
    axum::serve(listener, app).with_graceful_shutdown(ctrl_c()).await?;
    tracing::info!("shut down");
    Ok(())
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
