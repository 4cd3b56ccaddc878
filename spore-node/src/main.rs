use std::path::Path;

use clap::Parser;
use spore_node::cli::Args;
use spore_node::setup::DEFAULT_LOG_FILTER;
use spore_node::{Config, NodeRuntime};
use tracing::{error, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    std::panic::set_hook(Box::new(|info| {
        let msg = match info.payload().downcast_ref::<&'static str>() {
            Some(s) => *s,
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => &s[..],
                None => "Box<Any>",
            },
        };
        let location = match info.location() {
            Some(l) => format!("at {}:{}:{}", l.file(), l.line(), l.column()),
            None => "unknown location".to_string(),
        };
        eprintln!("CRASH: {} {}", msg, location);
    }));

    let mut config = if args.config.exists() {
        Config::load_from_file(&args.config)?
    } else {
        Config::default()
    };
    args.apply(&mut config);
    config.validate()?;

    if args.write_config {
        config.save_to_file(&args.config)?;
        println!("config written to {}", args.config.display());
        return Ok(());
    }

    // The guard flushes the file writer on drop, so it lives until main returns.
    let log_file = config
        .log_file
        .as_deref()
        .filter(|path| path.as_os_str() != "none");
    let (file_layer, _guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "spore.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );

    tracing_subscriber::registry().with(file_layer).with(stdout_layer).init();

    info!("--- starting spore node ---");
    info!("config: {}", args.config.display());

    let (runtime, server) = match NodeRuntime::build_tcp(&config).await {
        Ok(built) => built,
        Err(e) => {
            error!("failed to start node: {}", e);
            return Err(e.into());
        }
    };
    info!(address = %runtime.env.address, "node started, Ctrl+C to stop");

    let listener = runtime.serve(server);
    let refresh = runtime.start_background().await;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    runtime.shutdown();
    let _ = listener.await;
    let _ = refresh.await;
    Ok(())
}
