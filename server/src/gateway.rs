use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use disaster_shared::protocol::{PersonDeltaWire, ShapeWire};

use crate::world::{ConnectionId, PersonUpdate, ShapeEntity, WorldState};

/// Inbound side of every connection: stamps updates with their sender and
/// applies them to the world. Effects reach peers on the next broadcast tick.
pub struct ConnectionGateway {
    world: Arc<WorldState>,
    next_conn_id: AtomicU64,
}

impl ConnectionGateway {
    pub fn new(world: Arc<WorldState>) -> Self {
        Self {
            world,
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Allocate an identity for a newly opened connection.
    pub fn open_connection(&self) -> ConnectionId {
        ConnectionId(self.next_conn_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn submit_shape_update(&self, from: ConnectionId, shape: ShapeWire) {
        let inserted = self.world.insert_or_ignore_shape(ShapeEntity {
            id: shape.id,
            x: shape.left,
            y: shape.top,
            full: shape.full,
            last_updated_by: from,
        });
        if inserted {
            tracing::debug!(conn = %from, "New shape registered");
        }
    }

    pub fn submit_person_update(&self, from: ConnectionId, person: PersonDeltaWire) {
        let found = self.world.upsert_person_visibility(PersonUpdate {
            id: person.id,
            visible: person.visible,
            last_updated_by: from,
        });
        if !found {
            tracing::debug!(conn = %from, "Person update for unknown id");
        }
    }
}
