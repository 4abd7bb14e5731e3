use clap::Parser;
use log::info;
use server::config::{ServerConfig, DEFAULT_OUTBOUND_QUEUE};
use server::network::Server;
use shared::{TICK_RATE, TIME_LIMIT_SECONDS};

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative two-player air hockey server", long_about = None)]
struct Args {
    /// TCP port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Interface to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Simulation ticks per second
    #[arg(short, long, default_value_t = TICK_RATE, value_parser = clap::value_parser!(u32).range(1..=1000))]
    tick_rate: u32,

    /// Match length in seconds
    #[arg(short, long, default_value_t = TIME_LIMIT_SECONDS, value_parser = parse_seconds)]
    match_seconds: f32,

    /// State lines a client may fall behind before it is dropped
    #[arg(short, long, default_value_t = DEFAULT_OUTBOUND_QUEUE)]
    queue: usize,
}

fn parse_seconds(value: &str) -> Result<f32, String> {
    let seconds: f32 = value.parse().map_err(|e| format!("{}", e))?;
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err("match length must be a positive number of seconds".to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Argument errors exit here, before any socket is opened.
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        tick_rate: args.tick_rate,
        match_duration: args.match_seconds,
        outbound_queue: args.queue,
    };
    info!(
        "Starting server: {} Hz, {:.0}s matches",
        config.tick_rate, config.match_duration
    );

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
