//! docflow CLI - draft official documents from the terminal or serve the
//! HTTP gateway.
//!
//! # Usage
//!
//! ```bash
//! # Draft one document
//! docflow-cli -e "Unpermitted sand mining on the east bank" --corpus ./corpus
//!
//! # Resume paused sessions automatically and save the result
//! docflow-cli -e "..." --auto-approve -o notice.txt
//!
//! # JSON event lines for scripting
//! docflow-cli -f inputs.txt --json | jq .
//!
//! # Read the input from stdin
//! cat report.txt | docflow-cli
//!
//! # Serve the SSE gateway
//! docflow-cli --server --port 4001
//! ```

use anyhow::Result;
use clap::Parser;

use docflow_lib::cli::{execute_batch, execute_once, execute_stdin, initialize, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let ctx = initialize(&args).await?;

    #[cfg(feature = "server")]
    if args.server {
        return serve(&ctx).await;
    }

    if let Some(ref raw_input) = args.execute {
        execute_once(&ctx, raw_input).await.map(|_| ())
    } else if let Some(ref file) = args.file {
        execute_batch(&ctx, file).await
    } else {
        execute_stdin(&ctx).await
    }
}

#[cfg(feature = "server")]
async fn serve(ctx: &docflow_lib::cli::CliContext) -> Result<()> {
    use docflow_lib::cli::server::start_server;
    use docflow_lib::settings::DEFAULT_PORT;

    let port = match ctx.args.port {
        Some(port) => port,
        None if ctx.settings.server.port == DEFAULT_PORT => std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT),
        None => ctx.settings.server.port,
    };

    let (addr, shutdown) = start_server(port, ctx.engine.clone()).await?;
    eprintln!("docflow gateway listening on http://{}", addr);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    shutdown.cancel();
    Ok(())
}
