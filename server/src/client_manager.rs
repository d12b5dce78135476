//! Connection bookkeeping for the authoritative server
//!
//! This module tracks which transport connections have joined the game and
//! which player entity each of them controls:
//! - Record creation on `Join` and removal on disconnect
//! - Avatar lookup for incoming player input
//! - The list of joined connections used for broadcasting
//!
//! A connection that is open at the transport level but has not sent `Join`
//! has no record here and receives no broadcasts.

use log::info;
use shared::{ConnectionId, EntityId};
use std::collections::BTreeMap;

/// A joined connection and the player entity it drives
///
/// Exactly one record exists per joined connection. The record is dropped
/// together with its avatar when the connection goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    /// Server-assigned transport identifier
    pub connection_id: ConnectionId,
    /// Player entity owned by this connection
    pub avatar_entity_id: EntityId,
}

/// Registry of joined connections
///
/// Records are keyed by connection id and iterated in id order so that
/// broadcast batches are produced in a stable order.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    records: BTreeMap<ConnectionId, ConnectionRecord>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's avatar
    ///
    /// Returns the avatar of a previous record for the same connection, if
    /// any, so the caller can remove that entity. A connection never owns
    /// more than one player.
    pub fn add(&mut self, connection_id: &str, avatar_entity_id: &str) -> Option<EntityId> {
        let record = ConnectionRecord {
            connection_id: connection_id.to_string(),
            avatar_entity_id: avatar_entity_id.to_string(),
        };
        info!(
            "Connection {} joined with avatar {}",
            connection_id, avatar_entity_id
        );
        self.records
            .insert(connection_id.to_string(), record)
            .map(|previous| previous.avatar_entity_id)
    }

    /// Drops a connection's record
    ///
    /// Returns the removed record so the caller can destroy the avatar.
    /// Unknown connections (never joined or already removed) yield `None`.
    pub fn remove(&mut self, connection_id: &str) -> Option<ConnectionRecord> {
        let record = self.records.remove(connection_id)?;
        info!(
            "Connection {} left, releasing avatar {}",
            connection_id, record.avatar_entity_id
        );
        Some(record)
    }

    /// Avatar driven by the given connection
    pub fn avatar_of(&self, connection_id: &str) -> Option<&EntityId> {
        self.records
            .get(connection_id)
            .map(|record| &record.avatar_entity_id)
    }

    /// Every joined connection, in id order
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
