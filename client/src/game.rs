//! Client-side world: local prediction, reconciliation and remote interpolation

use crate::input::InputManager;
use crate::interpolation::PositionBuffer;
use crate::prediction::Predictor;
use log::{info, warn};
use shared::{
    ClientMessage, ConnectionId, Entity, EntityId, EntitySnapshot, EntityState, KindState,
    PendingInput, ServerMessage, World, SERVER_TICK_MS,
};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

pub struct ClientGame {
    world: World,
    local_entity_id: Option<EntityId>,
    client_id: Option<ConnectionId>,
    state: ConnectionState,
    input: InputManager,
    predictor: Predictor,
    buffers: HashMap<EntityId, PositionBuffer>,
    outbox: Vec<ClientMessage>,
    interpolation_delay_ms: u64,
}

impl ClientGame {
    pub fn new() -> Self {
        Self::with_interpolation_delay(SERVER_TICK_MS)
    }

    pub fn with_interpolation_delay(interpolation_delay_ms: u64) -> Self {
        Self {
            world: World::new(),
            local_entity_id: None,
            client_id: None,
            state: ConnectionState::Connecting,
            input: InputManager::new(),
            predictor: Predictor::new(),
            buffers: HashMap::new(),
            outbox: Vec::new(),
            interpolation_delay_ms,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn input_mut(&mut self) -> &mut InputManager {
        &mut self.input
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn local_entity_id(&self) -> Option<&EntityId> {
        self.local_entity_id.as_ref()
    }

    pub fn client_id(&self) -> Option<&ConnectionId> {
        self.client_id.as_ref()
    }

    /// True once the server has assigned an avatar
    pub fn is_bound(&self) -> bool {
        self.local_entity_id.is_some()
    }

    pub fn local_entity(&self) -> Option<&Entity> {
        self.local_entity_id
            .as_deref()
            .and_then(|id| self.world.get(id))
    }

    pub fn pending_inputs(&self) -> &[PendingInput] {
        self.predictor.unacknowledged()
    }

    /// Highest input sequence the server has confirmed
    pub fn last_acknowledged(&self) -> u32 {
        self.predictor.last_acknowledged()
    }

    pub fn position_buffer(&self, id: &str) -> Option<&PositionBuffer> {
        self.buffers.get(id)
    }

    /// Transport opened: ask to join
    pub fn on_open(&mut self) {
        self.state = ConnectionState::Connected;
        self.outbox.push(ClientMessage::Join);
    }

    pub fn on_disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            warn!("Disconnected from server");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Forgets everything learned from the previous session
    ///
    /// The next `on_open` starts a fresh join handshake.
    pub fn reconnect(&mut self) {
        info!("Resetting client state for reconnect");
        self.world.clear();
        self.local_entity_id = None;
        self.client_id = None;
        self.predictor.clear();
        self.buffers.clear();
        self.outbox.clear();
        self.input.reset_sequence();
        self.state = ConnectionState::Connecting;
    }

    /// Messages waiting to be sent, oldest first
    pub fn take_outbox(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub fn process_messages(&mut self, messages: Vec<ServerMessage>, now_ms: u64) {
        for message in messages {
            match message {
                ServerMessage::Joined {
                    client_id,
                    entity_id,
                    x,
                    y,
                } => {
                    info!(
                        "Joined as {} controlling {} at ({:.1}, {:.1})",
                        client_id, entity_id, x, y
                    );
                    self.world.spawn(Entity::player(entity_id.clone(), x, y));
                    self.local_entity_id = Some(entity_id);
                    self.client_id = Some(client_id);
                }
                ServerMessage::CreateEntity(snapshot) => {
                    if !self.world.contains(&snapshot.entity_id) {
                        self.world.spawn(snapshot.instantiate());
                    }
                }
                ServerMessage::WorldState { entities } => self.apply_world_state(entities, now_ms),
            }
        }
    }

    fn apply_world_state(&mut self, entities: Vec<EntitySnapshot>, now_ms: u64) {
        let reported: BTreeSet<EntityId> = entities.iter().map(|e| e.entity_id.clone()).collect();

        for snapshot in entities {
            if !self.world.contains(&snapshot.entity_id) {
                self.world.spawn(snapshot.instantiate());
            }

            if self.local_entity_id.as_deref() == Some(snapshot.entity_id.as_str()) {
                self.reconcile(&snapshot);
            } else {
                self.sync_remote_state(&snapshot);
                self.buffers
                    .entry(snapshot.entity_id.clone())
                    .or_default()
                    .push(now_ms, snapshot.x, snapshot.y);
            }
        }

        let stale: Vec<EntityId> = self
            .world
            .ids()
            .into_iter()
            .filter(|id| !reported.contains(id) && self.local_entity_id.as_ref() != Some(id))
            .collect();
        for id in stale {
            self.world.remove(&id);
            self.buffers.remove(&id);
        }
    }

    /// Snaps the avatar to the server and replays what the server has not seen yet
    fn reconcile(&mut self, snapshot: &EntitySnapshot) {
        let id = snapshot.entity_id.as_str();
        let acknowledged = match snapshot.state {
            KindState::Player {
                last_processed_input_sequence_number,
            } => last_processed_input_sequence_number,
            _ => 0,
        };

        self.world.set_position(id, snapshot.x, snapshot.y);
        let cooldown = match self.world.get_mut(id).map(|e| &mut e.state) {
            Some(EntityState::Player(player)) => {
                player.last_processed_input = acknowledged;
                player.shot_cooldown
            }
            _ => 0,
        };

        self.predictor.acknowledge(acknowledged);
        for input in self.predictor.unacknowledged() {
            self.world.apply_input(id, input);
            self.world.resolve_collisions_for(id);
        }

        // Replay moves the avatar only; the cooldown already counted these inputs.
        if let Some(EntityState::Player(player)) = self.world.get_mut(id).map(|e| &mut e.state) {
            player.shot_cooldown = cooldown;
        }
    }

    fn sync_remote_state(&mut self, snapshot: &EntitySnapshot) {
        if let KindState::Shot {
            mark_to_destroy: true,
        } = snapshot.state
        {
            self.world.destroy(&snapshot.entity_id);
            return;
        }
        let Some(entity) = self.world.get_mut(&snapshot.entity_id) else {
            return;
        };
        match (&mut entity.state, &snapshot.state) {
            (EntityState::SwoopingEnemy(enemy), KindState::SwoopingEnemy { health }) => {
                enemy.health = *health;
            }
            (
                EntityState::Player(player),
                KindState::Player {
                    last_processed_input_sequence_number,
                },
            ) => {
                player.last_processed_input = *last_processed_input_sequence_number;
            }
            _ => {}
        }
    }

    /// Fixed-rate step: sample input, predict, send
    pub fn game_tick(&mut self, duration_ms: f64) {
        let Some(id) = self.local_entity_id.clone() else {
            return;
        };

        if let Some(input) = self.input.next_input(duration_ms) {
            self.world.apply_input(&id, &input);
            self.world.resolve_collisions_for(&id);
            self.outbox.push(ClientMessage::from(&input));
            self.predictor.record(input);
        }
        self.world.tick_entity(&id, duration_ms);
    }

    /// Moves every remote entity to its interpolated position
    pub fn render_tick(&mut self, now_ms: u64) {
        let render_timestamp = now_ms.saturating_sub(self.interpolation_delay_ms);
        let local = self.local_entity_id.as_deref();

        let mut moves = Vec::new();
        for (id, buffer) in self.buffers.iter_mut() {
            if Some(id.as_str()) == local {
                continue;
            }
            if let Some((x, y)) = buffer.interpolate(render_timestamp) {
                moves.push((id.clone(), x, y));
            }
        }
        for (id, x, y) in moves {
            self.world.set_position(&id, x, y);
        }
    }
}

impl Default for ClientGame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Controls, EntityKind};

    fn joined_game() -> ClientGame {
        let mut game = ClientGame::new();
        game.on_open();
        game.process_messages(
            vec![ServerMessage::Joined {
                client_id: "c1".into(),
                entity_id: "me".into(),
                x: 500.0,
                y: 500.0,
            }],
            0,
        );
        game.take_outbox();
        game
    }

    fn player_snapshot(id: &str, x: f64, y: f64, ack: u32) -> EntitySnapshot {
        EntitySnapshot {
            entity_id: id.into(),
            x,
            y,
            state: KindState::Player {
                last_processed_input_sequence_number: ack,
            },
        }
    }

    fn hold_right(game: &mut ClientGame) {
        game.input_mut().set_held(Controls {
            right: true,
            ..Controls::default()
        });
    }

    #[test]
    fn test_open_queues_join() {
        let mut game = ClientGame::new();
        assert_eq!(game.connection_state(), ConnectionState::Connecting);
        game.on_open();
        assert_eq!(game.connection_state(), ConnectionState::Connected);
        assert_eq!(game.take_outbox(), vec![ClientMessage::Join]);
        assert!(game.take_outbox().is_empty());
    }

    #[test]
    fn test_input_before_join_has_no_effect() {
        let mut game = ClientGame::new();
        game.on_open();
        game.take_outbox();
        hold_right(&mut game);

        game.game_tick(100.0);
        assert!(game.take_outbox().is_empty());
        assert!(game.pending_inputs().is_empty());
        assert!(!game.is_bound());
    }

    #[test]
    fn test_joined_binds_avatar() {
        let game = joined_game();
        assert!(game.is_bound());
        assert_eq!(game.client_id(), Some(&"c1".to_string()));
        let avatar = game.local_entity().unwrap();
        assert_eq!((avatar.x, avatar.y), (500.0, 500.0));
        assert_eq!(avatar.kind(), EntityKind::Player);
    }

    #[test]
    fn test_prediction_applies_immediately_and_sends() {
        let mut game = joined_game();
        hold_right(&mut game);

        game.game_tick(100.0);

        assert_eq!(game.local_entity().unwrap().x, 520.0);
        assert_eq!(game.pending_inputs().len(), 1);
        match game.take_outbox().as_slice() {
            [ClientMessage::PlayerInput {
                input_sequence_number,
                right,
                ..
            }] => {
                assert_eq!(*input_sequence_number, 1);
                assert!(*right);
            }
            other => panic!("Unexpected outbox: {:?}", other),
        }
    }

    #[test]
    fn test_reconcile_replays_unacknowledged_inputs() {
        let mut game = joined_game();
        hold_right(&mut game);
        game.game_tick(100.0);
        game.game_tick(100.0);
        game.game_tick(100.0);
        assert_eq!(game.local_entity().unwrap().x, 560.0);

        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![player_snapshot("me", 520.0, 500.0, 1)],
            }],
            100,
        );

        assert_eq!(game.local_entity().unwrap().x, 560.0);
        let remaining: Vec<u32> = game
            .pending_inputs()
            .iter()
            .map(|i| i.sequence_number)
            .collect();
        assert_eq!(remaining, vec![2, 3]);
    }

    #[test]
    fn test_reconcile_adopts_server_correction() {
        let mut game = joined_game();
        hold_right(&mut game);
        game.game_tick(100.0);
        game.game_tick(100.0);

        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![player_snapshot("me", 400.0, 450.0, 1)],
            }],
            100,
        );

        let avatar = game.local_entity().unwrap();
        assert_eq!((avatar.x, avatar.y), (420.0, 450.0));
    }

    #[test]
    fn test_remote_entities_are_buffered_not_snapped() {
        let mut game = joined_game();
        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![
                    player_snapshot("me", 500.0, 500.0, 0),
                    player_snapshot("other", 100.0, 100.0, 0),
                ],
            }],
            1000,
        );
        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![
                    player_snapshot("me", 500.0, 500.0, 0),
                    player_snapshot("other", 200.0, 100.0, 0),
                ],
            }],
            1100,
        );

        assert_eq!(game.world().get("other").unwrap().x, 100.0);
        assert_eq!(game.position_buffer("other").unwrap().len(), 2);
        assert!(game.position_buffer("me").is_none());

        game.render_tick(1150);
        assert_eq!(game.world().get("other").unwrap().x, 150.0);

        game.render_tick(1500);
        assert_eq!(game.world().get("other").unwrap().x, 150.0);
    }

    #[test]
    fn test_missing_entities_are_removed() {
        let mut game = joined_game();
        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![
                    player_snapshot("me", 500.0, 500.0, 0),
                    player_snapshot("other", 100.0, 100.0, 0),
                ],
            }],
            1000,
        );
        assert!(game.world().contains("other"));

        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![player_snapshot("me", 500.0, 500.0, 0)],
            }],
            1100,
        );
        assert!(!game.world().contains("other"));
        assert!(game.position_buffer("other").is_none());
        assert!(game.world().contains("me"));
    }

    #[test]
    fn test_create_entity_instantiates_mirror() {
        let mut game = joined_game();
        game.process_messages(
            vec![ServerMessage::CreateEntity(EntitySnapshot {
                entity_id: "enemy".into(),
                x: 300.0,
                y: -100.0,
                state: KindState::SwoopingEnemy { health: 10 },
            })],
            0,
        );
        assert_eq!(
            game.world().get("enemy").unwrap().kind(),
            EntityKind::SwoopingEnemy
        );
    }

    #[test]
    fn test_remote_health_follows_server() {
        let mut game = joined_game();
        let enemy = |health| EntitySnapshot {
            entity_id: "enemy".into(),
            x: 300.0,
            y: 100.0,
            state: KindState::SwoopingEnemy { health },
        };
        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![enemy(10)],
            }],
            0,
        );
        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![enemy(7)],
            }],
            100,
        );

        match &game.world().get("enemy").unwrap().state {
            EntityState::SwoopingEnemy(state) => assert_eq!(state.health, 7),
            other => panic!("Unexpected state: {:?}", other),
        }
    }

    #[test]
    fn test_fire_does_not_fabricate_shots() {
        let mut game = joined_game();
        game.input_mut().press_fire();
        game.game_tick(100.0);

        assert_eq!(game.world().len(), 1);
        assert_eq!(game.pending_inputs().len(), 1);
    }

    #[test]
    fn test_marked_shot_in_snapshot_stays_out_of_collisions() {
        let mut game = joined_game();
        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![
                    player_snapshot("me", 500.0, 500.0, 0),
                    EntitySnapshot {
                        entity_id: "s".into(),
                        x: 500.0,
                        y: 500.0,
                        state: KindState::Shot {
                            mark_to_destroy: true,
                        },
                    },
                ],
            }],
            100,
        );

        assert!(game.world().get("s").unwrap().marked_for_destruction);
        assert!(game.world().is_consistent());
        assert!(game.world().potentials("me").is_empty());
    }

    #[test]
    fn test_known_shot_marked_later_leaves_collisions() {
        let mut game = joined_game();
        let shot = |marked: bool| EntitySnapshot {
            entity_id: "s".into(),
            x: 500.0,
            y: 500.0,
            state: KindState::Shot {
                mark_to_destroy: marked,
            },
        };
        game.process_messages(vec![ServerMessage::CreateEntity(shot(false))], 0);
        assert_eq!(game.world().potentials("me"), vec!["s".to_string()]);

        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![player_snapshot("me", 500.0, 500.0, 0), shot(true)],
            }],
            100,
        );

        assert!(game.world().get("s").unwrap().marked_for_destruction);
        assert!(game.world().is_consistent());
        assert!(game.world().potentials("me").is_empty());
    }

    #[test]
    fn test_replay_keeps_shot_cooldown() {
        let mut game = joined_game();
        game.input_mut().press_fire();
        game.game_tick(100.0);
        game.game_tick(100.0);

        let cooldown = |game: &ClientGame| match &game.local_entity().unwrap().state {
            EntityState::Player(player) => player.shot_cooldown,
            other => panic!("Unexpected state: {:?}", other),
        };
        assert_eq!(cooldown(&game), 3);

        game.process_messages(
            vec![ServerMessage::WorldState {
                entities: vec![player_snapshot("me", 500.0, 500.0, 0)],
            }],
            100,
        );

        assert_eq!(game.pending_inputs().len(), 2);
        assert_eq!(cooldown(&game), 3);
    }

    #[test]
    fn test_reconnect_resets_session() {
        let mut game = joined_game();
        hold_right(&mut game);
        game.game_tick(100.0);
        game.on_disconnect();
        assert_eq!(game.connection_state(), ConnectionState::Disconnected);

        game.reconnect();
        assert_eq!(game.connection_state(), ConnectionState::Connecting);
        assert!(!game.is_bound());
        assert!(game.world().is_empty());
        assert!(game.pending_inputs().is_empty());
        assert!(game.take_outbox().is_empty());

        game.on_open();
        assert_eq!(game.take_outbox(), vec![ClientMessage::Join]);
        assert!(game.input_mut().held().right);
        assert_eq!(game.input_mut().next_sequence(), 1);
    }
}
