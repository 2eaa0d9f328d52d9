//! `function-invoker`: read one request from stdin, answer on stdout

use anyhow::Context;
use clap::Parser;
use function_adapter::{samples, telemetry, FunctionInvoker, InvokerConfig};
use function_types::Headers;
use serde_json::Value;

/// Function invoker CLI
#[derive(Parser)]
#[command(name = "function-invoker")]
#[command(about = "Invoke a registered function with a request read from stdin")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "INVOKER_CONFIG")]
    config: Option<String>,

    /// Function definition, overrides configuration (e.g. "uppercase|split")
    #[arg(short, long)]
    definition: Option<String>,

    /// Transport header as key=value, repeatable
    #[arg(long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Log level, overrides configuration
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = InvokerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(definition) = cli.definition {
        config.function.definition = definition;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    telemetry::init_tracing(&config.logging)?;

    let registry = samples::sample_registry()?;
    let invoker = FunctionInvoker::start(&registry, &config.function, config.drain.clone())
        .context("starting function invoker")?;

    let metadata: Headers = cli
        .headers
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    if let Err(e) = invoker
        .handle_stream(tokio::io::stdin(), tokio::io::stdout(), metadata)
        .await
    {
        tracing::error!(error = %e, "Invocation failed");
        return Err(e.into());
    }

    Ok(())
}
