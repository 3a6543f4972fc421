//! Shared world: the durable shape and person sets plus the latest pending
//! update of each kind awaiting broadcast.
//!
//! Each of the four pieces sits behind its own mutex. No operation holds two
//! of them at once.

use std::fmt;
use std::sync::Mutex;

use disaster_shared::protocol::{PersonDeltaWire, PersonWire, ShapeWire};

/// Identity of one live client connection. Never sent to peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeEntity {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub full: bool,
    pub last_updated_by: ConnectionId,
}

impl ShapeEntity {
    pub fn to_wire(&self) -> ShapeWire {
        ShapeWire {
            id: self.id.clone(),
            left: self.x,
            top: self.y,
            full: self.full,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonEntity {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub visible: bool,
    /// `None` until some connection touches this person.
    pub last_updated_by: Option<ConnectionId>,
}

impl PersonEntity {
    pub fn to_wire(&self) -> PersonWire {
        PersonWire {
            id: self.id.clone(),
            left: self.x,
            top: self.y,
            visible: self.visible,
        }
    }
}

/// A visibility change for one person, stamped with its sender.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonUpdate {
    pub id: String,
    pub visible: bool,
    pub last_updated_by: ConnectionId,
}

impl PersonUpdate {
    pub fn to_wire(&self) -> PersonDeltaWire {
        PersonDeltaWire {
            id: self.id.clone(),
            visible: self.visible,
        }
    }
}

/// Latest value plus dirty flag. Draining clears the flag but keeps the value.
#[derive(Debug)]
struct Pending<T> {
    latest: Option<T>,
    dirty: bool,
}

impl<T: Clone> Pending<T> {
    fn empty() -> Self {
        Self {
            latest: None,
            dirty: false,
        }
    }

    fn replace(&mut self, value: T) {
        self.latest = Some(value);
        self.dirty = true;
    }

    fn drain(&mut self) -> Option<T> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        self.latest.clone()
    }
}

pub struct WorldState {
    shapes: Mutex<Vec<ShapeEntity>>,
    people: Mutex<Vec<PersonEntity>>,
    pending_shape: Mutex<Pending<ShapeEntity>>,
    pending_person: Mutex<Pending<PersonUpdate>>,
}

impl WorldState {
    /// Build a world around a fixed, already seeded population.
    pub fn new(people: Vec<PersonEntity>) -> Self {
        Self {
            shapes: Mutex::new(Vec::new()),
            people: Mutex::new(people),
            pending_shape: Mutex::new(Pending::empty()),
            pending_person: Mutex::new(Pending::empty()),
        }
    }

    /// Adds the shape if its id is new. The pending broadcast value is
    /// replaced either way. Returns whether the durable set grew.
    ///
    /// A known id keeps its originally stored coordinates: the durable set
    /// only records existence.
    pub fn insert_or_ignore_shape(&self, shape: ShapeEntity) -> bool {
        let inserted = {
            let mut shapes = self.shapes.lock().unwrap();
            if shapes.iter().any(|s| s.id == shape.id) {
                false
            } else {
                shapes.push(shape.clone());
                true
            }
        };

        self.pending_shape.lock().unwrap().replace(shape);
        inserted
    }

    /// Overwrites `visible` on the matching person, if any. The pending
    /// broadcast value is replaced either way. Returns whether a person matched.
    pub fn upsert_person_visibility(&self, update: PersonUpdate) -> bool {
        let found = {
            let mut people = self.people.lock().unwrap();
            match people.iter_mut().find(|p| p.id == update.id) {
                Some(person) => {
                    person.visible = update.visible;
                    person.last_updated_by = Some(update.last_updated_by);
                    true
                }
                None => false,
            }
        };

        self.pending_person.lock().unwrap().replace(update);
        found
    }

    pub fn drain_pending_shape(&self) -> Option<ShapeEntity> {
        self.pending_shape.lock().unwrap().drain()
    }

    pub fn drain_pending_person(&self) -> Option<PersonUpdate> {
        self.pending_person.lock().unwrap().drain()
    }

    /// Sender of the most recent shape update, drained or not.
    pub fn last_shape_updater(&self) -> Option<ConnectionId> {
        self.pending_shape
            .lock()
            .unwrap()
            .latest
            .as_ref()
            .map(|s| s.last_updated_by)
    }

    pub fn snapshot_shapes(&self) -> Vec<ShapeEntity> {
        self.shapes.lock().unwrap().clone()
    }

    pub fn snapshot_people(&self) -> Vec<PersonEntity> {
        self.people.lock().unwrap().clone()
    }
}
