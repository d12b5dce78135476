//! Authoritative game state and the per-tick server procedure

use crate::client_manager::ConnectionManager;
use crate::config::ServerConfig;
use crate::utils::{new_id, random_spawn, random_wave_x};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    ClientMessage, Clock, ConnectionId, Entity, EntityId, EntitySnapshot, ServerMessage, Vector2,
    World, ENEMY_START_HEALTH, WALL_HEIGHT, WALL_WIDTH, WALL_X, WALL_Y, WAVE_SIZE, WAVE_SPAWN_Y,
};
use std::collections::VecDeque;

/// Message waiting to be flushed; `None` targets every joined connection
type Outbound = (Option<ConnectionId>, ServerMessage);

/// Outgoing batch for one connection
pub type Batch = (ConnectionId, Vec<ServerMessage>);

pub struct ServerGame<C: Clock> {
    world: World,
    connections: ConnectionManager,
    inbound: VecDeque<(ConnectionId, ClientMessage)>,
    outbound: Vec<Outbound>,
    config: ServerConfig,
    clock: C,
    rng: StdRng,
    tick_index: u64,
}

impl<C: Clock> ServerGame<C> {
    pub fn new(config: ServerConfig, clock: C) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            world: World::new(),
            connections: ConnectionManager::new(),
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            config,
            clock,
            rng,
            tick_index: 0,
        }
    }

    /// Places the static level geometry
    pub fn init(&mut self) {
        let wall = Entity::wall(new_id(), WALL_X, WALL_Y, WALL_WIDTH, WALL_HEIGHT);
        info!("Placed wall {} at ({}, {})", wall.id, WALL_X, WALL_Y);
        self.world.spawn(wall);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    pub fn queued_len(&self) -> usize {
        self.inbound.len()
    }

    /// Queues a client message for the next tick
    pub fn enqueue(&mut self, connection_id: &str, message: ClientMessage) {
        self.inbound.push_back((connection_id.to_string(), message));
    }

    /// Drops a connection, its avatar and anything it still had queued
    pub fn client_leave(&mut self, connection_id: &str) {
        self.inbound.retain(|(id, _)| id != connection_id);
        if let Some(record) = self.connections.remove(connection_id) {
            self.world.remove(&record.avatar_entity_id);
        }
    }

    /// Runs one authoritative tick and returns the batches to send
    pub fn server_tick(&mut self, duration_ms: f64) -> Vec<Batch> {
        self.tick_index += 1;

        self.drain_inbound();

        if self.config.wave_interval_ticks > 0
            && self.tick_index % self.config.wave_interval_ticks == 0
        {
            self.spawn_wave();
        }

        self.world.tick_all(duration_ms);
        self.world.check_collisions();

        let entities = self.snapshot();
        self.broadcast(ServerMessage::WorldState { entities });
        self.world.purge_destroyed();

        if self.tick_index % 50 == 0 {
            debug!(
                "Tick {}: {} connections, {} entities, {} queued",
                self.tick_index,
                self.connections.len(),
                self.world.len(),
                self.inbound.len()
            );
        }

        self.flush()
    }

    /// Processes queued messages in arrival order until the budget runs out
    ///
    /// Returns the number of messages processed. Anything left over stays
    /// at the front of the queue for the next tick.
    pub fn drain_inbound(&mut self) -> usize {
        let started = self.clock.now_ms();
        let mut processed = 0;

        while !self.inbound.is_empty() {
            let elapsed = self.clock.now_ms().saturating_sub(started);
            if elapsed > self.config.drain_budget_ms {
                warn!(
                    "Drain budget exceeded after {} messages, {} remaining",
                    processed,
                    self.inbound.len()
                );
                break;
            }
            let Some((connection_id, message)) = self.inbound.pop_front() else {
                break;
            };
            self.handle_message(&connection_id, message);
            processed += 1;
        }
        processed
    }

    fn handle_message(&mut self, connection_id: &str, message: ClientMessage) {
        match message {
            ClientMessage::Join => self.client_join(connection_id),
            ClientMessage::PlayerInput { .. } => {
                let Some(avatar) = self.connections.avatar_of(connection_id).cloned() else {
                    return;
                };
                let Some(input) = message.to_pending_input() else {
                    return;
                };
                if let Some(origin) = self.world.apply_input(&avatar, &input) {
                    self.spawn_shot(origin);
                }
                self.world.check_collisions();
            }
        }
    }

    fn client_join(&mut self, connection_id: &str) {
        let spawn = random_spawn(&mut self.rng);
        let avatar = Entity::player(new_id(), spawn.x, spawn.y);
        let entity_id = avatar.id.clone();
        self.world.spawn(avatar);

        if let Some(previous) = self.connections.add(connection_id, &entity_id) {
            self.world.remove(&previous);
        }

        self.send_to(
            connection_id,
            ServerMessage::Joined {
                client_id: connection_id.to_string(),
                entity_id,
                x: spawn.x,
                y: spawn.y,
            },
        );
    }

    fn spawn_shot(&mut self, origin: Vector2) -> EntityId {
        let shot = Entity::shot(new_id(), origin.x, origin.y);
        self.create_entity(shot)
    }

    /// Spawns one wave of enemies; every member starts at the same point
    pub fn spawn_wave(&mut self) -> Vec<EntityId> {
        let x = random_wave_x(&mut self.rng);
        info!("Spawning wave of {} at x={:.1}", WAVE_SIZE, x);
        (0..WAVE_SIZE)
            .map(|_| {
                let enemy = Entity::swooping_enemy(new_id(), x, WAVE_SPAWN_Y, ENEMY_START_HEALTH);
                self.create_entity(enemy)
            })
            .collect()
    }

    /// Adds an entity and announces it to every joined connection
    fn create_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id.clone();
        let snapshot = EntitySnapshot::from(&entity);
        self.world.spawn(entity);
        self.broadcast(ServerMessage::CreateEntity(snapshot));
        id
    }

    /// Every entity still in the arena, destroyed-this-tick ones included
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.world.entities().map(EntitySnapshot::from).collect()
    }

    fn send_to(&mut self, connection_id: &str, message: ServerMessage) {
        self.outbound.push((Some(connection_id.to_string()), message));
    }

    fn broadcast(&mut self, message: ServerMessage) {
        self.outbound.push((None, message));
    }

    /// One batch per joined connection with its broadcasts and targeted messages
    fn flush(&mut self) -> Vec<Batch> {
        let outbound = std::mem::take(&mut self.outbound);
        self.connections
            .connection_ids()
            .into_iter()
            .filter_map(|connection_id| {
                let messages: Vec<ServerMessage> = outbound
                    .iter()
                    .filter(|(target, _)| match target {
                        Some(target) => *target == connection_id,
                        None => true,
                    })
                    .map(|(_, message)| message.clone())
                    .collect();
                (!messages.is_empty()).then_some((connection_id, messages))
            })
            .collect()
    }
}
