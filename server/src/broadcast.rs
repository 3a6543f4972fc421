use std::sync::Arc;
use std::time::Duration;

use disaster_shared::protocol::{ServerMsg, SessionEndedMsg, TimeUpdateMsg};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::clock::{GameClock, OutcomeSummary};
use crate::config::PersonEchoExclusion;
use crate::world::{ConnectionId, WorldState};

/// Who a broadcast is meant for. Each connection task filters on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    All,
    AllExcept(ConnectionId),
}

impl Recipients {
    pub fn includes(&self, conn: ConnectionId) -> bool {
        match self {
            Recipients::All => true,
            Recipients::AllExcept(excluded) => *excluded != conn,
        }
    }
}

/// Broadcasts from the periodic tasks to every connection task
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub recipients: Recipients,
    pub msg: ServerMsg,
}

/// Result of one time tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeTick {
    Live(u32),
    Ended(OutcomeSummary),
    /// Time ran out and the outcome was already sent by someone else.
    AlreadyEnded,
}

/// Samples the world and clock and pushes deltas onto the broadcast channel.
#[derive(Clone)]
pub struct Broadcaster {
    world: Arc<WorldState>,
    clock: Arc<GameClock>,
    broadcast_tx: broadcast::Sender<Broadcast>,
    person_echo: PersonEchoExclusion,
}

impl Broadcaster {
    pub fn new(
        world: Arc<WorldState>,
        clock: Arc<GameClock>,
        broadcast_tx: broadcast::Sender<Broadcast>,
        person_echo: PersonEchoExclusion,
    ) -> Self {
        Self {
            world,
            clock,
            broadcast_tx,
            person_echo,
        }
    }

    fn publish(&self, recipients: Recipients, msg: ServerMsg) {
        // No subscribers is not an error: nobody is connected right now.
        let _ = self.broadcast_tx.send(Broadcast { recipients, msg });
    }

    /// Pushes the pending shape, if any. Returns whether anything was sent.
    pub fn shape_tick(&self) -> bool {
        let Some(shape) = self.world.drain_pending_shape() else {
            return false;
        };
        self.publish(
            Recipients::AllExcept(shape.last_updated_by),
            ServerMsg::ShapeChanged(shape.to_wire()),
        );
        true
    }

    /// Pushes the pending person change, if any. Returns whether anything was sent.
    pub fn person_tick(&self) -> bool {
        let Some(update) = self.world.drain_pending_person() else {
            return false;
        };
        let recipients = match self.person_echo {
            PersonEchoExclusion::PersonOriginator => Recipients::AllExcept(update.last_updated_by),
            PersonEchoExclusion::ShapeOriginator => match self.world.last_shape_updater() {
                Some(conn) => Recipients::AllExcept(conn),
                None => Recipients::All,
            },
        };
        self.publish(recipients, ServerMsg::PersonChanged(update.to_wire()));
        true
    }

    pub fn time_tick(&self) -> TimeTick {
        let remaining = self.clock.remaining();
        if remaining >= 0 {
            let seconds_remaining = u32::try_from(remaining).unwrap_or(u32::MAX);
            self.publish(
                Recipients::All,
                ServerMsg::TimeUpdate(TimeUpdateMsg { seconds_remaining }),
            );
            return TimeTick::Live(seconds_remaining);
        }

        let people = self.world.snapshot_people();
        match self.clock.check_and_fire_outcome(&people) {
            Some(outcome) => {
                tracing::info!(
                    survivors = outcome.survivor_count,
                    victims = outcome.victim_count,
                    "Session ended"
                );
                self.publish(
                    Recipients::All,
                    ServerMsg::SessionEnded(SessionEndedMsg {
                        survivor_count: outcome.survivor_count,
                        victim_count: outcome.victim_count,
                    }),
                );
                TimeTick::Ended(outcome)
            }
            None => TimeTick::AlreadyEnded,
        }
    }

    /// Start the three periodic tasks. They share a cadence but tick independently.
    pub fn spawn(&self, interval: Duration) -> BroadcastHandles {
        let shape = {
            let this = self.clone();
            tokio::spawn(async move {
                let mut ticker = new_ticker(interval);
                loop {
                    ticker.tick().await;
                    this.shape_tick();
                }
            })
        };

        let person = {
            let this = self.clone();
            tokio::spawn(async move {
                let mut ticker = new_ticker(interval);
                loop {
                    ticker.tick().await;
                    this.person_tick();
                }
            })
        };

        let time = {
            let this = self.clone();
            tokio::spawn(async move {
                let mut ticker = new_ticker(interval);
                loop {
                    ticker.tick().await;
                    if !matches!(this.time_tick(), TimeTick::Live(_)) {
                        break;
                    }
                }
                tracing::debug!("Time broadcast stopped");
            })
        };

        BroadcastHandles {
            shape,
            person,
            time,
        }
    }
}

fn new_ticker(period: Duration) -> tokio::time::Interval {
    // First firing one period from now, not immediately.
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker
}

pub struct BroadcastHandles {
    pub shape: JoinHandle<()>,
    pub person: JoinHandle<()>,
    pub time: JoinHandle<()>,
}

impl BroadcastHandles {
    pub fn abort(&self) {
        self.shape.abort();
        self.person.abort();
        self.time.abort();
    }
}
