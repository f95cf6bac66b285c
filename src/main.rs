use std::io::{self, BufRead};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herald::cli;
use herald::dispatcher::Dispatcher;
use herald::registry::CategoryRegistry;
use herald::sink::LogSink;
use herald::HeraldError;

fn main() -> anyhow::Result<()> {
    // Parse args and env vars
    let args = cli::Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "herald=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let settings = args.settings()?;
    let dispatcher = Dispatcher::new(CategoryRegistry::from_settings(&settings)?, LogSink);
    info!(
        categories = ?dispatcher.categories(),
        "Herald ready; reading notifications from stdin"
    );

    for (number, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        let request = match cli::parse_request(&line) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(err) => {
                warn!(line = number + 1, err = %err, "Skipping malformed request");
                continue;
            }
        };

        match dispatcher.send(request.category, &request.recipient, &request.message) {
            Ok(()) => println!("sent {} to {}", request.category, request.recipient),
            Err(HeraldError::RateLimited { retry_after, .. }) => println!(
                "rate limited {} to {} (retry in {:.1}s)",
                request.category,
                request.recipient,
                retry_after.as_secs_f64()
            ),
            Err(err) => println!("failed {} to {}: {}", request.category, request.recipient, err),
        }
    }

    Ok(())
}
