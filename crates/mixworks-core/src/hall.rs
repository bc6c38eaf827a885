//! Halls: named zones that group machines and carry a weather location.

use crate::id::{HallId, MachineId};
use crate::weather::GeoPoint;
use serde::{Deserialize, Serialize};

/// Where a hall's weather is observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HallLocation {
    /// The device's own position, asked of the location provider.
    Local,
    Fixed(GeoPoint),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hall {
    id: HallId,
    name: String,
    location: HallLocation,
    machines: Vec<MachineId>,
}

impl Hall {
    pub fn new(id: HallId, name: impl Into<String>, location: HallLocation) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            machines: Vec::new(),
        }
    }

    pub fn id(&self) -> HallId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> HallLocation {
        self.location
    }

    /// Machine ids in creation order.
    pub fn machines(&self) -> &[MachineId] {
        &self.machines
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub(crate) fn push_machine(&mut self, machine: MachineId) {
        self.machines.push(machine);
    }
}

/// The two halls every session starts with, in id order.
pub fn default_halls() -> Vec<Hall> {
    vec![
        Hall::new(HallId(1), "Hall A", HallLocation::Local),
        Hall::new(
            HallId(2),
            "Hall B",
            HallLocation::Fixed(GeoPoint::new(24.7136, 46.6753)),
        ),
    ]
}
