use crate::state::entity::{StateUpdate, TrackedEntity};
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// In-memory registry of entity states shared by every scanner
pub struct StateRegistry {
    /// Lock-free concurrent map for fast reads
    entities: DashMap<String, TrackedEntity>,

    /// Broadcast channel for state change events
    state_tx: broadcast::Sender<StateUpdate>,
}

impl StateRegistry {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(1000);

        Self {
            entities: DashMap::new(),
            state_tx,
        }
    }

    /// Overwrite an entity's state and attributes (last write wins)
    pub fn set(
        &self,
        entity_id: &str,
        state: impl Into<String>,
        attributes: Map<String, Value>,
    ) -> StateUpdate {
        let new_state = TrackedEntity {
            entity_id: entity_id.to_string(),
            state: state.into(),
            attributes,
            last_updated: Utc::now(),
        };

        let old_state = self
            .entities
            .insert(entity_id.to_string(), new_state.clone());

        debug!(entity_id = %entity_id, state = %new_state.state, "Entity state set");

        let update = StateUpdate {
            entity_id: entity_id.to_string(),
            old_state,
            new_state,
        };

        // No receivers is not an error
        let _ = self.state_tx.send(update.clone());

        update
    }

    pub fn get(&self, entity_id: &str) -> Option<TrackedEntity> {
        self.entities.get(entity_id).map(|e| e.clone())
    }

    pub fn all(&self) -> Vec<TrackedEntity> {
        self.entities.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Subscribe to state updates
    pub fn subscribe(&self) -> broadcast::Receiver<StateUpdate> {
        self.state_tx.subscribe()
    }

    /// Replace all state with restored entities. Nothing is broadcast.
    pub fn load_entities(&self, entities: HashMap<String, TrackedEntity>) {
        self.entities.clear();

        for (id, entity) in entities {
            self.entities.insert(id, entity);
        }

        info!(entities = self.entities.len(), "Loaded entity states");
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
