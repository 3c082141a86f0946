use log::{error, info};
use std::env;
use std::process;
use tokio::io::BufReader;
use tokio::net::TcpStream;

use sight_snake::bot::Bot;
use sight_snake::config::Config;
use sight_snake::debug_logger::DebugLogger;
use sight_snake::session;

#[tokio::main]
async fn main() {
    // We default to 'info' level logging. But if the `RUST_LOG` environment variable is set,
    // we keep that value instead.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    let server = env::var("SERVER").unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let name = env::var("NAME")
        .or_else(|_| env::var("USER"))
        .unwrap_or_else(|_| "student".to_string());
    let address = format!("{}:{}", server, port);

    // Load configuration once at startup
    let config = Config::load_or_default();
    let logger = DebugLogger::new(config.debug.enabled, &config.debug.log_file_path).await;
    let mut bot = Bot::new(config);

    info!("Connecting to {} as '{}'", address, name);
    let stream = match TcpStream::connect(&address).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Could not connect to {}: {}", address, e);
            process::exit(1);
        }
    };
    let (reader, writer) = stream.into_split();

    match session::run(BufReader::new(reader), writer, &name, &mut bot, &logger).await {
        Ok(moves) => info!("Session finished after {} moves", moves),
        Err(e) => {
            error!("Session failed: {}", e);
            process::exit(1);
        }
    }
}
