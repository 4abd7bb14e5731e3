//! Server network layer: TCP admission, per-session I/O tasks and the tick loop

use crate::client_manager::{ClientManager, SessionId};
use crate::config::{ServerConfig, MAX_TICK_DELTA};
use crate::game::{MatchEvent, MatchState, PlayerInputs, Slot};
use log::{debug, error, info, warn};
use shared::{decode_input, encode_state, DecodeError, Direction, Winner, MAX_LINE_BYTES};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Capacity of the channel from reader tasks to the tick loop.
const INPUT_CHANNEL_CAPACITY: usize = 1024;

/// A decoded direction from one session, on its way to the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputCommand {
    pub session: SessionId,
    pub direction: Direction,
}

/// Authoritative match server
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    clients: Arc<RwLock<ClientManager>>,

    // Communication channels
    input_tx: mpsc::Sender<InputCommand>,
    input_rx: mpsc::Receiver<InputCommand>,
    state_tx: watch::Sender<MatchState>,
}

impl Server {
    /// Binds the listening socket. Failing to bind is fatal for the caller.
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let (state_tx, _) = watch::channel(MatchState::new(config.match_duration));

        Ok(Server {
            listener,
            config,
            clients: Arc::new(RwLock::new(ClientManager::new())),
            input_tx,
            input_rx,
            state_tx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Receiver that always holds the latest committed snapshot.
    pub fn subscribe(&self) -> watch::Receiver<MatchState> {
        self.state_tx.subscribe()
    }

    /// Runs the acceptor and the tick loop. Only returns on shutdown of the
    /// runtime.
    pub async fn run(self) -> io::Result<()> {
        let Server {
            listener,
            config,
            clients,
            input_tx,
            input_rx,
            state_tx,
        } = self;

        tokio::spawn(accept_connections(
            listener,
            Arc::clone(&clients),
            input_tx,
            config.queue_capacity(),
        ));

        info!("Waiting for two players");
        run_tick_loop(&config, &clients, input_rx, &state_tx).await;
        Ok(())
    }
}

/// Accepts connections forever, admitting at most two at a time.
async fn accept_connections(
    listener: TcpListener,
    clients: Arc<RwLock<ClientManager>>,
    input_tx: mpsc::Sender<InputCommand>,
    queue_capacity: usize,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                admit(stream, addr, &clients, &input_tx, queue_capacity).await;
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Registers a new connection and spawns its reader and writer, or closes it
/// straight away when both slots are taken.
async fn admit(
    stream: TcpStream,
    addr: SocketAddr,
    clients: &Arc<RwLock<ClientManager>>,
    input_tx: &mpsc::Sender<InputCommand>,
    queue_capacity: usize,
) {
    let (outbound_tx, outbound_rx) = mpsc::channel(queue_capacity);
    let (stop_tx, stop_rx) = watch::channel(());

    let admitted = {
        let mut clients = clients.write().await;
        clients.add_client(addr, outbound_tx, stop_tx)
    };

    let Some((session, _slot)) = admitted else {
        warn!("Match is full, rejecting connection from {}", addr);
        drop(stream);
        return;
    };

    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle for session {}: {}", session, e);
    }

    let (read_half, write_half) = stream.into_split();
    tokio::spawn(read_inputs(
        session,
        read_half,
        input_tx.clone(),
        Arc::clone(clients),
        stop_rx.clone(),
    ));
    tokio::spawn(write_states(
        session,
        write_half,
        outbound_rx,
        Arc::clone(clients),
        stop_rx,
    ));
}

/// Outcome of reading one input line.
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    /// A line (possibly the unterminated last one) is in the buffer.
    Line,
    /// The line exceeded the limit and was discarded; holds its length.
    Oversized(usize),
    Eof,
}

/// Reads one line, buffering at most `MAX_LINE_BYTES + 1` bytes of it.
///
/// The remainder of an oversized line is consumed and thrown away, so a peer
/// that never sends a newline cannot grow the buffer.
async fn read_line_bounded<B>(reader: &mut B, line: &mut Vec<u8>) -> io::Result<LineRead>
where
    B: AsyncBufRead + Unpin,
{
    line.clear();
    let limit = (MAX_LINE_BYTES + 1) as u64;
    if (&mut *reader).take(limit).read_until(b'\n', line).await? == 0 {
        return Ok(LineRead::Eof);
    }
    if line.ends_with(b"\n") || line.len() <= MAX_LINE_BYTES {
        return Ok(LineRead::Line);
    }

    let mut discarded = line.len();
    line.clear();
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            break;
        }
        match buf.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                discarded += end + 1;
                break;
            }
            None => {
                let len = buf.len();
                reader.consume(len);
                discarded += len;
            }
        }
    }
    Ok(LineRead::Oversized(discarded))
}

/// Reads newline-delimited input records until the peer goes away or the
/// session is removed.
///
/// Undecodable and oversized lines are logged and dropped; only transport
/// errors and end of stream end the session.
async fn read_inputs<R>(
    session: SessionId,
    read_half: R,
    input_tx: mpsc::Sender<InputCommand>,
    clients: Arc<RwLock<ClientManager>>,
    mut stop: watch::Receiver<()>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(read_half);
    let mut line = Vec::with_capacity(64);

    loop {
        let read = tokio::select! {
            result = read_line_bounded(&mut reader, &mut line) => result,
            _ = stop.changed() => {
                debug!("Session {} reader stopped by server", session);
                break;
            }
        };

        match read {
            Ok(LineRead::Eof) => {
                debug!("Session {} reached end of stream", session);
                break;
            }
            Ok(LineRead::Oversized(len)) => {
                warn!(
                    "Dropping input from session {}: {}",
                    session,
                    DecodeError::TooLong(len)
                );
            }
            Ok(LineRead::Line) => {
                let content = line.strip_suffix(b"\n").unwrap_or(&line[..]);
                match decode_input(content) {
                    Ok(Some(direction)) => {
                        let command = InputCommand { session, direction };
                        if input_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Dropping input from session {}: {}", session, e),
                }
            }
            Err(e) => {
                warn!("Error reading from session {}: {}", session, e);
                break;
            }
        }
    }

    clients.write().await.remove_client(&session);
}

/// Drains a session's outbound queue onto its socket.
///
/// Removal of the session stops the writer at once, even mid-write; lines
/// still queued for a removed session are dropped.
async fn write_states<W>(
    session: SessionId,
    mut write_half: W,
    mut outbound: mpsc::Receiver<Arc<str>>,
    clients: Arc<RwLock<ClientManager>>,
    mut stop: watch::Receiver<()>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let line = tokio::select! {
            biased;
            _ = stop.changed() => break,
            line = outbound.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        let written = tokio::select! {
            biased;
            _ = stop.changed() => break,
            result = write_half.write_all(line.as_bytes()) => result,
        };
        if let Err(e) = written {
            warn!("Error writing to session {}: {}", session, e);
            break;
        }
    }

    clients.write().await.remove_client(&session);
    debug!("Session {} writer stopped", session);
    let _ = write_half.shutdown().await;
}

/// Fixed-rate simulation: apply inputs, step the match, publish, broadcast.
async fn run_tick_loop(
    config: &ServerConfig,
    clients: &RwLock<ClientManager>,
    mut input_rx: mpsc::Receiver<InputCommand>,
    state_tx: &watch::Sender<MatchState>,
) {
    let mut tick_interval = interval(config.tick_duration());
    // A slow tick is absorbed, never made up with a burst.
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut state = MatchState::new(config.match_duration);
    let mut inputs = PlayerInputs::default();
    let mut last_tick = Instant::now();
    let mut tick: u64 = 0;

    loop {
        tick_interval.tick().await;

        let now = Instant::now();
        let delta_time = (now - last_tick).as_secs_f32().min(MAX_TICK_DELTA);
        last_tick = now;

        let sessions = {
            let clients = clients.read().await;
            apply_inputs(&clients, &mut input_rx, &mut inputs);
            clients.len()
        };

        let (next, events) = state.step(&inputs, sessions, delta_time);
        for event in &events {
            log_event(event);
        }
        state = next;
        state_tx.send_replace(state);

        broadcast_state(clients, &state).await;

        tick += 1;
        if tick % 600 == 0 {
            debug!(
                "Tick {}: {} sessions, {:.1}Hz, {:.1}s left",
                tick,
                sessions,
                1.0 / delta_time.max(f32::EPSILON),
                state.time_remaining
            );
        }
    }
}

/// Folds every queued command into the per-slot inputs, newest last.
///
/// Commands from sessions that are no longer registered are dropped, and
/// a slot without a session is reset so its next owner starts still.
fn apply_inputs(
    clients: &ClientManager,
    input_rx: &mut mpsc::Receiver<InputCommand>,
    inputs: &mut PlayerInputs,
) {
    while let Ok(command) = input_rx.try_recv() {
        if let Some(slot) = clients.slot_of(command.session) {
            inputs.set(slot, command.direction);
        }
    }
    for slot in Slot::ALL {
        if !clients.is_slot_taken(slot) {
            inputs.clear(slot);
        }
    }
}

/// Queues the snapshot for every session.
///
/// A session whose queue is full or closed is removed once the pass is
/// over, so a slow peer never holds up the tick loop or the other player.
async fn broadcast_state(clients: &RwLock<ClientManager>, state: &MatchState) {
    let line: Arc<str> = match encode_state(&state.to_message()) {
        Ok(line) => line.into(),
        Err(e) => {
            error!("Failed to encode match state: {}", e);
            return;
        }
    };

    let queues = clients.read().await.outbound_queues();

    let mut dropped = Vec::new();
    for (session, queue) in queues {
        match queue.try_send(Arc::clone(&line)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Session {} is not keeping up, disconnecting", session);
                dropped.push(session);
            }
            Err(TrySendError::Closed(_)) => dropped.push(session),
        }
    }

    if !dropped.is_empty() {
        let mut clients = clients.write().await;
        for session in dropped {
            clients.remove_client(&session);
        }
    }
}

fn log_event(event: &MatchEvent) {
    match event {
        MatchEvent::Started => info!("Two players connected, match started"),
        MatchEvent::Paused => info!("Match paused, waiting for two players"),
        MatchEvent::Goal {
            scorer,
            score1,
            score2,
        } => info!(
            "Goal for player {}! Score: {} x {}",
            scorer.number(),
            score1,
            score2
        ),
        MatchEvent::BallRescued => warn!("Ball left the field, serving again from center"),
        MatchEvent::GameOver {
            winner,
            score1,
            score2,
        } => match winner {
            Winner::None => info!("Match over, draw at {} x {}", score1, score2),
            Winner::Player1 | Winner::Player2 => info!(
                "Match over, player {} wins {} x {}",
                u8::from(*winner),
                score1,
                score2
            ),
        },
    }
}
