use clap::{builder::RangedU64ValueParser, Parser};
use code_judge_server::{create_app, run_server, ServerConfig};
use std::net::{Ipv4Addr, SocketAddr};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (all interfaces)
    #[arg(short, long, env = "PORT", default_value = "10000")]
    port: u16,

    /// Wall-clock limit per test case in milliseconds
    #[arg(long, env = "TIMEOUT_MS", default_value = "2000", value_parser = RangedU64ValueParser::<u64>::new().range(1..))]
    timeout_ms: u64,

    /// Maximum captured stdout/stderr per test case, in characters
    #[arg(long, env = "MAX_OUTPUT_CHARS", default_value = "20000", value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    max_output_chars: usize,

    /// Shared secret callers must send in X-RUNNER-SECRET
    #[arg(long, env = "RUNNER_SECRET", hide_env_values = true)]
    runner_secret: Option<String>,

    /// Maximum number of concurrent evaluations
    #[arg(short, long, env = "MAX_CONCURRENT", default_value = "8", value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    max_concurrent: usize,

    /// Extra allowed CORS origins (regular expressions, comma separated)
    #[arg(long = "allowed-origin", env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    /// Python interpreter
    #[arg(long, env = "PYTHON_BIN")]
    python_bin: Option<String>,

    /// Node.js interpreter
    #[arg(long, env = "NODE_BIN")]
    node_bin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.port));

    let config = ServerConfig {
        timeout_ms: args.timeout_ms,
        max_output_chars: args.max_output_chars,
        runner_secret: args.runner_secret,
        max_concurrent: args.max_concurrent,
        allowed_origins: args.allowed_origins,
        python_bin: args.python_bin,
        node_bin: args.node_bin,
    };
    tracing::info!(
        timeout_ms = config.timeout_ms,
        max_output_chars = config.max_output_chars,
        max_concurrent = config.max_concurrent,
        "Runner configured"
    );

    let app = create_app(config).await?;
    run_server(app, addr).await?;

    Ok(())
}
