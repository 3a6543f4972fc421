use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::broadcast::{Broadcast, BroadcastHandles, Broadcaster};
use crate::clock::GameClock;
use crate::config::{PersonEchoExclusion, ServerConfig};
use crate::gateway::ConnectionGateway;
use crate::seed::seed_people;
use crate::world::WorldState;

/// One countdown and the world it plays out in.
pub struct Session {
    pub world: Arc<WorldState>,
    pub clock: Arc<GameClock>,
    pub gateway: Arc<ConnectionGateway>,
    pub broadcast_tx: broadcast::Sender<Broadcast>,
    interval: Duration,
    person_echo: PersonEchoExclusion,
}

impl Session {
    /// Seed the world and start the clock.
    pub fn new(config: &ServerConfig) -> Self {
        let world = Arc::new(WorldState::new(seed_people(&config.impact_points)));
        let clock = Arc::new(GameClock::new(config.session_length_secs));
        let gateway = Arc::new(ConnectionGateway::new(Arc::clone(&world)));
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_capacity);

        Self {
            world,
            clock,
            gateway,
            broadcast_tx,
            interval: config.broadcast_interval(),
            person_echo: config.person_echo,
        }
    }

    pub fn spawn_broadcasts(&self) -> BroadcastHandles {
        tracing::info!(
            people = self.world.snapshot_people().len(),
            length_secs = self.clock.total().as_secs(),
            "Session started"
        );
        Broadcaster::new(
            Arc::clone(&self.world),
            Arc::clone(&self.clock),
            self.broadcast_tx.clone(),
            self.person_echo,
        )
        .spawn(self.interval)
    }
}
