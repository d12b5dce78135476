//! Server network layer: TCP transport tasks and the fixed-rate game loop

use crate::config::ServerConfig;
use crate::game::{Batch, ServerGame};
use crate::utils::new_id;
use log::{debug, error, info, warn};
use shared::codec::{read_frame, write_frame};
use shared::{ClientMessage, Clock, ConnectionId, ServerMessage, SystemClock, TickScheduler};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Delay before the first tick after startup
pub const STARTUP_DELAY_MS: u64 = 200;

/// Events sent from transport tasks to the game loop
#[derive(Debug)]
pub enum TransportEvent {
    Connected {
        connection_id: ConnectionId,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Vec<ServerMessage>>,
    },
    Message {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
}

/// Authoritative server owning the listener and the game state
pub struct Server {
    listener: TcpListener,
    game: ServerGame<SystemClock>,
    writers: HashMap<ConnectionId, mpsc::UnboundedSender<Vec<ServerMessage>>>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> std::io::Result<Self> {
        let address = config.address();
        let listener = TcpListener::bind(&address).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut game = ServerGame::new(config, SystemClock);
        game.init();

        Ok(Server {
            listener,
            game,
            writers: HashMap::new(),
            events_tx,
            events_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main server loop: accepts connections and runs ticks until the transport closes
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Server {
            listener,
            mut game,
            mut writers,
            events_tx,
            mut events_rx,
        } = self;

        let accept_task = tokio::spawn(accept_loop(listener, events_tx));

        let clock = SystemClock;
        let mut scheduler =
            TickScheduler::new(game.config().tick_ms, clock.now_ms(), STARTUP_DELAY_MS);

        info!("Server started successfully");

        loop {
            let delay = scheduler.delay_until_next(clock.now_ms());

            tokio::select! {
                event = events_rx.recv() => {
                    match event {
                        Some(event) => handle_event(&mut game, &mut writers, event),
                        None => {
                            info!("Transport closed, shutting down");
                            break;
                        }
                    }
                },

                _ = tokio::time::sleep(Duration::from_millis(delay)) => {
                    let start = scheduler.begin_tick(clock.now_ms());
                    if scheduler.is_late(start.elapsed_ms) {
                        warn!(
                            "Tick {} started {} ms after the previous one (interval {} ms)",
                            start.index,
                            start.elapsed_ms,
                            scheduler.interval_ms()
                        );
                    }

                    let elapsed = start.elapsed_ms as f64;
                    if let Some(batches) = run_guarded(start.index, || game.server_tick(elapsed)) {
                        send_batches(&mut writers, batches);
                    }

                    let processing = scheduler.finish_tick(clock.now_ms());
                    debug!("Tick {} took {} ms", start.index, processing);
                },
            }
        }

        accept_task.abort();
        Ok(())
    }
}

/// Runs one tick, containing a panic so the loop can keep going
fn run_guarded<F>(index: u64, tick: F) -> Option<Vec<Batch>>
where
    F: FnOnce() -> Vec<Batch>,
{
    match catch_unwind(AssertUnwindSafe(tick)) {
        Ok(batches) => Some(batches),
        Err(panic) => {
            error!("Tick {} panicked: {:?}", index, panic);
            None
        }
    }
}

fn handle_event(
    game: &mut ServerGame<SystemClock>,
    writers: &mut HashMap<ConnectionId, mpsc::UnboundedSender<Vec<ServerMessage>>>,
    event: TransportEvent,
) {
    match event {
        TransportEvent::Connected {
            connection_id,
            addr,
            outbound,
        } => {
            info!("Connection {} opened from {}", connection_id, addr);
            writers.insert(connection_id, outbound);
        }
        TransportEvent::Message {
            connection_id,
            message,
        } => game.enqueue(&connection_id, message),
        TransportEvent::Disconnected { connection_id } => {
            info!("Connection {} closed", connection_id);
            writers.remove(&connection_id);
            game.client_leave(&connection_id);
        }
    }
}

fn send_batches(
    writers: &mut HashMap<ConnectionId, mpsc::UnboundedSender<Vec<ServerMessage>>>,
    batches: Vec<Batch>,
) {
    for (connection_id, messages) in batches {
        match writers.get(&connection_id) {
            Some(writer) => {
                if writer.send(messages).is_err() {
                    warn!("Writer for connection {} is gone", connection_id);
                }
            }
            None => debug!("No writer for connection {}", connection_id),
        }
    }
}

async fn accept_loop(listener: TcpListener, events_tx: mpsc::UnboundedSender<TransportEvent>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => spawn_connection(stream, addr, events_tx.clone()),
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Splits a stream into a reader task feeding the game loop and a writer task draining batches
fn spawn_connection(
    stream: TcpStream,
    addr: SocketAddr,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to disable Nagle for {}: {}", addr, e);
    }
    let connection_id = new_id();
    let (reader, writer) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    let connected = TransportEvent::Connected {
        connection_id: connection_id.clone(),
        addr,
        outbound: outbound_tx,
    };
    if events_tx.send(connected).is_err() {
        return;
    }

    tokio::spawn(write_loop(connection_id.clone(), writer, outbound_rx));
    tokio::spawn(read_loop(connection_id, reader, events_tx));
}

async fn read_loop(
    connection_id: ConnectionId,
    mut reader: OwnedReadHalf,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    loop {
        match read_frame::<_, ClientMessage>(&mut reader).await {
            Ok(Some(message)) => {
                let event = TransportEvent::Message {
                    connection_id: connection_id.clone(),
                    message,
                };
                if events_tx.send(event).is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Closing connection {}: {}", connection_id, e);
                break;
            }
        }
    }
    let _ = events_tx.send(TransportEvent::Disconnected { connection_id });
}

async fn write_loop(
    connection_id: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut outbound_rx: mpsc::UnboundedReceiver<Vec<ServerMessage>>,
) {
    while let Some(batch) = outbound_rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &batch).await {
            warn!("Failed to send to connection {}: {}", connection_id, e);
            break;
        }
    }
}
