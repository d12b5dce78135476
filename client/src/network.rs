//! Client transport: one TCP session at a time driving a [`ClientGame`]

use crate::game::ClientGame;
use log::{debug, error, info, warn};
use shared::codec::{read_frame, write_frame};
use shared::{Clock, Controls, ServerMessage, SystemClock, SERVER_TICK_MS};
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

/// Render cadence, roughly 60 Hz
pub const RENDER_INTERVAL_MS: u64 = 16;
/// Wait between reconnect attempts
pub const RECONNECT_DELAY_MS: u64 = 1000;
/// Game ticks between position reports
const REPORT_EVERY_TICKS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: String,
    pub tick_ms: u64,
    pub controls: Controls,
    /// Stop after this long; run until disconnected when absent
    pub duration: Option<Duration>,
    pub reconnect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:8080".to_string(),
            tick_ms: SERVER_TICK_MS,
            controls: Controls::default(),
            duration: None,
            reconnect: false,
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Disconnected,
    TimeUp,
}

pub struct Client {
    config: ClientConfig,
    game: ClientGame,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let mut game = ClientGame::with_interpolation_delay(config.tick_ms);
        game.input_mut().set_held(config.controls);
        Self { config, game }
    }

    pub fn game(&self) -> &ClientGame {
        &self.game
    }

    /// Runs sessions until time is up, or until a disconnect when reconnecting is off
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let deadline = self.config.duration.map(|d| Instant::now() + d);

        loop {
            info!("Connecting to {}", self.config.server);
            let stream = match TcpStream::connect(&self.config.server).await {
                Ok(stream) => stream,
                Err(e) if self.config.reconnect => {
                    warn!("Connect failed: {}", e);
                    sleep(Duration::from_millis(RECONNECT_DELAY_MS)).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            stream.set_nodelay(true)?;

            let end = self.session(stream, deadline).await?;
            self.game.on_disconnect();

            if end == SessionEnd::TimeUp || !self.config.reconnect {
                break;
            }
            self.game.reconnect();
            sleep(Duration::from_millis(RECONNECT_DELAY_MS)).await;
        }

        Ok(())
    }

    async fn session(
        &mut self,
        stream: TcpStream,
        deadline: Option<Instant>,
    ) -> Result<SessionEnd, Box<dyn std::error::Error>> {
        let (reader, mut writer) = stream.into_split();
        let (batch_tx, mut batch_rx) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(read_loop(reader, batch_tx));

        self.game.on_open();
        if !self.flush(&mut writer).await {
            reader_task.abort();
            return Ok(SessionEnd::Disconnected);
        }

        let clock = SystemClock;
        let mut render_interval = interval(Duration::from_millis(RENDER_INTERVAL_MS));
        let mut game_interval = interval(Duration::from_millis(self.config.tick_ms));
        game_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_game_tick = Instant::now();
        let mut game_ticks: u64 = 0;
        let time_up = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(time_up);

        let end = loop {
            tokio::select! {
                batch = batch_rx.recv() => {
                    match batch {
                        Some(batch) => self.game.process_messages(batch, clock.now_ms()),
                        None => break SessionEnd::Disconnected,
                    }
                },

                _ = render_interval.tick() => {
                    self.game.render_tick(clock.now_ms());
                },

                _ = game_interval.tick() => {
                    let now = Instant::now();
                    let duration = now.duration_since(last_game_tick);
                    last_game_tick = now;

                    self.game.game_tick(duration.as_secs_f64() * 1000.0);
                    if !self.flush(&mut writer).await {
                        break SessionEnd::Disconnected;
                    }

                    game_ticks += 1;
                    if game_ticks % REPORT_EVERY_TICKS == 0 {
                        self.report();
                    }
                },

                _ = &mut time_up => break SessionEnd::TimeUp,
            }
        };

        reader_task.abort();
        Ok(end)
    }

    /// Sends queued messages; false when the connection is gone
    async fn flush(&mut self, writer: &mut OwnedWriteHalf) -> bool {
        for message in self.game.take_outbox() {
            if let Err(e) = write_frame(writer, &message).await {
                error!("Error sending message: {}", e);
                return false;
            }
        }
        true
    }

    fn report(&self) {
        match self.game.local_entity() {
            Some(avatar) => info!(
                "Avatar at ({:.1}, {:.1}), acked up to {}, {} inputs pending, {} entities known",
                avatar.x,
                avatar.y,
                self.game.last_acknowledged(),
                self.game.pending_inputs().len(),
                self.game.world().len()
            ),
            None => debug!("Waiting for join"),
        }
    }
}

async fn read_loop(mut reader: OwnedReadHalf, batch_tx: mpsc::UnboundedSender<Vec<ServerMessage>>) {
    loop {
        match read_frame::<_, Vec<ServerMessage>>(&mut reader).await {
            Ok(Some(batch)) => {
                if batch_tx.send(batch).is_err() {
                    return;
                }
            }
            Ok(None) => {
                info!("Server closed the connection");
                return;
            }
            Err(e) => {
                warn!("Dropping connection: {}", e);
                return;
            }
        }
    }
}
