//! Headless bot for exercising a running server without a renderer.
//!
//! Connects, follows the ball with whichever paddle the server assigned and
//! logs the snapshots it receives.

use clap::Parser;
use log::{debug, info, warn};
use shared::{decode_state, encode_input, Direction, StateMessage, PADDLE_SPEED};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless air hockey bot", long_about = None)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Paddle this bot expects to control (1 or 2)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    slot: u8,

    /// Stop after this many snapshots; 0 runs until the match is over
    #[arg(short, long, default_value_t = 0)]
    ticks: u64,
}

/// Direction that brings the paddle toward the ball, with a dead zone of
/// one paddle step so the bot does not jitter.
fn chase(paddle_y: f32, ball_y: f32) -> Direction {
    if ball_y < paddle_y - PADDLE_SPEED {
        Direction::Up
    } else if ball_y > paddle_y + PADDLE_SPEED {
        Direction::Down
    } else {
        Direction::Still
    }
}

fn own_paddle(state: &StateMessage, slot: u8) -> f32 {
    if slot == 1 {
        state.paddle1_y
    } else {
        state.paddle2_y
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let stream = TcpStream::connect(&args.server).await?;
    stream.set_nodelay(true)?;
    info!("Connected to {}", args.server);

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let mut received: u64 = 0;
    let mut last_sent = None;

    while let Some(line) = lines.next_line().await? {
        let state = match decode_state(&line) {
            Ok(state) => state,
            Err(e) => {
                warn!("Skipping undecodable snapshot: {}", e);
                continue;
            }
        };
        received += 1;

        if received % 60 == 1 {
            info!(
                "Score {} x {}, {:.0}s left, ball at ({:.0}, {:.0}){}",
                state.score1,
                state.score2,
                state.time_remaining,
                state.ball_x,
                state.ball_y,
                if state.started { "" } else { ", waiting" }
            );
        }

        if state.over {
            info!(
                "Match over: {} x {}, winner {:?}",
                state.score1, state.score2, state.winner
            );
            break;
        }

        let direction = if state.started {
            chase(own_paddle(&state, args.slot), state.ball_y)
        } else {
            Direction::Still
        };
        if last_sent != Some(direction) {
            debug!("Sending direction {:?}", direction);
            write_half.write_all(encode_input(direction)?.as_bytes()).await?;
            last_sent = Some(direction);
        }

        if args.ticks > 0 && received >= args.ticks {
            info!("Received {} snapshots, disconnecting", received);
            break;
        }
    }

    if received == 0 {
        warn!("Server closed the connection without sending state, match is probably full");
    }

    Ok(())
}
