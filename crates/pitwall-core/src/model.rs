//! Telemetry records distributed through the hub.
//!
//! Every record implements `Default`; that value stands in for "no data
//! yet" whenever a consumer reads before the first publish.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session state reported by a game server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
    pub server_name: String,
    pub track_name: String,
    pub session: String,
    pub current_event_time: f64,
    pub end_event_time: f64,
    pub maximum_laps: i64,
    pub lap_distance: f64,
    pub number_of_vehicles: i64,
    pub raining: f64,
    pub min_path_wetness: f64,
    pub max_path_wetness: f64,
    pub track_temp: f64,
    pub ambient_temp: f64,
    pub web_socket_running: bool,
    pub receiving_data: bool,
    pub live_map_domain: String,
    pub live_map_path: String,
}

impl SessionInfo {
    /// Seconds left in the session, never negative.
    pub fn time_left(&self) -> f64 {
        (self.end_event_time - self.current_event_time).max(0.0)
    }

    pub fn live_map_url(&self) -> String {
        format!("{}{}/live", self.live_map_domain, self.live_map_path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSessionInfoData {
    pub server_id: String,
    pub server_name: String,
    pub session_info: SessionInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverStanding {
    pub driver_name: String,
    pub car_class: String,
    pub vehicle_name: String,
    pub laps_completed: i64,
    pub best_lap: i64,
    pub best_lap_time: f64,
    pub last_lap_time: f64,
    pub current_sector_time1: f64,
    pub current_sector_time2: f64,
    pub last_sector_time1: f64,
    pub last_sector_time2: f64,
    pub best_sector_time1: f64,
    pub best_sector_time2: f64,
    pub best_sector_time3: f64,
    pub best_lap_sector_time1: f64,
    pub best_lap_sector_time2: f64,
    pub top_speed_per_lap: HashMap<i64, f64>,
    pub in_garage_stall: bool,
    pub pitting: bool,
}

/// Grid order for one server. Drivers are sorted by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveStandingData {
    pub server_id: String,
    pub server_name: String,
    pub drivers: Vec<DriverStanding>,
}

/// One completed lap of one driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandingHistoryDriverData {
    pub driver_name: String,
    pub car_class: String,
    pub vehicle_name: String,
    pub car_id: String,
    pub lap_time: f64,
    pub sector_time1: f64,
    pub sector_time2: f64,
    pub top_speed: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveStandingHistoryData {
    pub server_id: String,
    pub server_name: String,
    pub driver_names: Vec<String>,
    pub drivers_data: HashMap<String, Vec<StandingHistoryDriverData>>,
}

/// Binary resource such as a track thumbnail or car image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl Resource {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerStarted {
    pub server_id: String,
    pub server_name: String,
    pub session_type: String,
    pub track_name: String,
    pub started_at: Option<DateTime<Utc>>,
}

impl fmt::Display for ServerStarted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.server_name, self.session_type)?;
        if !self.track_name.is_empty() {
            write!(f, " ({})", self.track_name)?;
        }
        if let Some(started_at) = self.started_at {
            write!(f, " @ {}", started_at.format("%Y-%m-%d %H:%M UTC"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectedSessionData {
    pub server_id: String,
    pub session_type: String,
    pub track_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarPosition {
    pub driver_name: String,
    pub car_class: String,
    pub place: i64,
    pub x: f64,
    pub z: f64,
}
