//! Initial person population, clustered around impact points.

use uuid::Uuid;

use crate::world::PersonEntity;

/// Where a disaster struck and how hard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactPoint {
    pub x: f64,
    pub y: f64,
    pub severity: u32,
}

impl ImpactPoint {
    pub fn new(x: f64, y: f64, severity: u32) -> Self {
        Self { x, y, severity }
    }

    /// 2 people up to severity 2, 5 up to severity 5, 6 beyond.
    pub fn people_count(&self) -> usize {
        if self.severity > 5 {
            6
        } else if self.severity > 2 {
            5
        } else {
            2
        }
    }
}

/// Offsets from the impact point, filled in order.
const CLUSTER_OFFSETS: [(f64, f64); 6] = [
    (0.0, 0.0),
    (-8.0, -23.0),
    (-18.0, -12.0),
    (7.0, -17.0),
    (20.0, -25.0),
    (22.0, 7.0),
];

pub fn seed_people(points: &[ImpactPoint]) -> Vec<PersonEntity> {
    points
        .iter()
        .flat_map(|point| {
            CLUSTER_OFFSETS[..point.people_count()]
                .iter()
                .map(move |(dx, dy)| PersonEntity {
                    id: Uuid::new_v4().to_string(),
                    x: point.x + dx,
                    y: point.y + dy,
                    visible: true,
                    last_updated_by: None,
                })
        })
        .collect()
}
