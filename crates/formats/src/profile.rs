use serde::{Deserialize, Serialize};

/// Costing model sent to the routing service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    Bicycle,
    Pedestrian,
    Car,
    Truck,
    Bus,
    MotorScooter,
    Motorcycle,
}

impl Profile {
    pub const ALL: [Profile; 7] = [
        Profile::Bicycle,
        Profile::Pedestrian,
        Profile::Car,
        Profile::Truck,
        Profile::Bus,
        Profile::MotorScooter,
        Profile::Motorcycle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Bicycle => "bicycle",
            Profile::Pedestrian => "pedestrian",
            Profile::Car => "car",
            Profile::Truck => "truck",
            Profile::Bus => "bus",
            Profile::MotorScooter => "motor_scooter",
            Profile::Motorcycle => "motorcycle",
        }
    }

    /// The costing name on the wire. `car` is called `auto` by the service.
    pub fn costing(self) -> &'static str {
        match self {
            Profile::Car => "auto",
            other => other.as_str(),
        }
    }
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profile::ALL
            .into_iter()
            .find(|p| p.as_str() == s || p.costing() == s)
            .ok_or_else(|| format!("unknown profile: {s}"))
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
