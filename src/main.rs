use clap::Parser;
use log::error;
use section_scheduler::server::{self, ServerConfig};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();

    if let Err(e) = server::run_server(config).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
