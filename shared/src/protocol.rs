//! Wire messages exchanged between clients and the authoritative server

use crate::entity::{Entity, EntityKind, EntityState};
use crate::{ConnectionId, EntityId};
use serde::{Deserialize, Serialize};

/// Controls held during one client game tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}

impl Controls {
    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right || self.fire
    }
}

/// One locally captured input, kept until the server acknowledges it
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInput {
    pub sequence_number: u32,
    pub controls: Controls,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    Join,
    PlayerInput {
        press_time: f64,
        input_sequence_number: u32,
        left: bool,
        right: bool,
        up: bool,
        down: bool,
        shoot: bool,
    },
}

impl From<&PendingInput> for ClientMessage {
    fn from(input: &PendingInput) -> Self {
        ClientMessage::PlayerInput {
            press_time: input.elapsed_seconds,
            input_sequence_number: input.sequence_number,
            left: input.controls.left,
            right: input.controls.right,
            up: input.controls.up,
            down: input.controls.down,
            shoot: input.controls.fire,
        }
    }
}

impl ClientMessage {
    /// Input carried by a `PlayerInput` message
    pub fn to_pending_input(&self) -> Option<PendingInput> {
        match *self {
            ClientMessage::Join => None,
            ClientMessage::PlayerInput {
                press_time,
                input_sequence_number,
                left,
                right,
                up,
                down,
                shoot,
            } => Some(PendingInput {
                sequence_number: input_sequence_number,
                controls: Controls {
                    up,
                    down,
                    left,
                    right,
                    fire: shoot,
                },
                elapsed_seconds: press_time,
            }),
        }
    }
}

/// Kind tag plus the fields only that kind carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KindState {
    Player {
        last_processed_input_sequence_number: u32,
    },
    Wall {
        width: f64,
        height: f64,
    },
    Shot {
        mark_to_destroy: bool,
    },
    SwoopingEnemy {
        health: i32,
    },
}

impl KindState {
    pub fn kind(&self) -> EntityKind {
        match self {
            KindState::Player { .. } => EntityKind::Player,
            KindState::Wall { .. } => EntityKind::Wall,
            KindState::Shot { .. } => EntityKind::Shot,
            KindState::SwoopingEnemy { .. } => EntityKind::SwoopingEnemy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: EntityId,
    pub x: f64,
    pub y: f64,
    pub state: KindState,
}

impl From<&Entity> for EntitySnapshot {
    fn from(entity: &Entity) -> Self {
        let state = match &entity.state {
            EntityState::Player(player) => KindState::Player {
                last_processed_input_sequence_number: player.last_processed_input,
            },
            EntityState::Wall(wall) => KindState::Wall {
                width: wall.width,
                height: wall.height,
            },
            EntityState::Shot(_) => KindState::Shot {
                mark_to_destroy: entity.marked_for_destruction,
            },
            EntityState::SwoopingEnemy(enemy) => KindState::SwoopingEnemy {
                health: enemy.health,
            },
        };

        EntitySnapshot {
            entity_id: entity.id.clone(),
            x: entity.x,
            y: entity.y,
            state,
        }
    }
}

impl EntitySnapshot {
    /// Builds a local mirror of a server entity
    pub fn instantiate(&self) -> Entity {
        let id = self.entity_id.clone();
        match &self.state {
            KindState::Player {
                last_processed_input_sequence_number,
            } => {
                let mut entity = Entity::player(id, self.x, self.y);
                if let EntityState::Player(player) = &mut entity.state {
                    player.last_processed_input = *last_processed_input_sequence_number;
                }
                entity
            }
            KindState::Wall { width, height } => Entity::wall(id, self.x, self.y, *width, *height),
            KindState::Shot { mark_to_destroy } => {
                let mut entity = Entity::shot(id, self.x, self.y);
                entity.marked_for_destruction = *mark_to_destroy;
                entity
            }
            KindState::SwoopingEnemy { health } => {
                Entity::swooping_enemy(id, self.x, self.y, *health)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Joined {
        client_id: ConnectionId,
        entity_id: EntityId,
        x: f64,
        y: f64,
    },
    CreateEntity(EntitySnapshot),
    WorldState {
        entities: Vec<EntitySnapshot>,
    },
}
