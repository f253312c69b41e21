use clap::Parser;
use libris_rs::config::{Config, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "libris-server")]
#[command(about = "Book catalog server with favorites and recommendations", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "libris-server.yaml")]
    config: String,

    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    config.debug_logs = args.debug;

    let default_filter = if args.debug {
        "libris_rs=debug,tower_http=debug"
    } else {
        "libris_rs=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    match config.logformat {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Using config file: {}", args.config);

    if let Err(e) = libris_rs::run(config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
