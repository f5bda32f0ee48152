use clap::Parser;
use quizroom::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = quizroom::run(config).await {
        tracing::error!(error = %err, "server exited with an unrecoverable error");
        std::process::exit(1);
    }
}
