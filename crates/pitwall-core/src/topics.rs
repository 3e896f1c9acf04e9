//! Topic naming and the set of brokers shared by producers and apps.
//!
//! A topic is a stream-kind prefix followed by a server id, e.g.
//! `sessionInfo-S1`. Consumers never parse topics; they only build them.

use crate::broker::Broker;
use crate::model::{
    CarPosition, LiveSessionInfoData, LiveStandingData, LiveStandingHistoryData, Resource,
    SelectedSessionData, ServerStarted,
};

pub const SESSION_INFO: &str = "sessionInfo-";
pub const DRIVERS_SESSION: &str = "driversSession-";
pub const STINT_DATA: &str = "stintData-";
pub const THUMBNAIL: &str = "thumbnail_";
pub const SESSION_STARTED: &str = "sessionStarted_";
pub const FIRST_DRIVER_ENTERED: &str = "firstDriverEntered_";
pub const SESSION_STOPPED: &str = "sessionStopped_";
pub const SELECTED_SESSION_DATA: &str = "selectedSessionData_";
pub const CARS_POSITION: &str = "carsPosition_";

pub fn topic(prefix: &str, server_id: &str) -> String {
    format!("{prefix}{server_id}")
}

/// One broker per distributed value type.
///
/// Built once at startup and passed by reference to every component, so
/// tests can run against a fresh hub.
#[derive(Clone, Default)]
pub struct Hub {
    pub session_info: Broker<LiveSessionInfoData>,
    pub standings: Broker<LiveStandingData>,
    pub standing_history: Broker<LiveStandingHistoryData>,
    pub track_thumbnail: Broker<Resource>,
    pub session_started: Broker<ServerStarted>,
    pub session_stopped: Broker<String>,
    pub first_driver_entered: Broker<ServerStarted>,
    pub selected_session: Broker<SelectedSessionData>,
    pub cars_position: Broker<Vec<CarPosition>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_session_info(&self, data: LiveSessionInfoData) -> usize {
        let topic = topic(SESSION_INFO, &data.server_id);
        self.session_info.publish(&topic, data)
    }

    pub fn publish_standings(&self, data: LiveStandingData) -> usize {
        let topic = topic(DRIVERS_SESSION, &data.server_id);
        self.standings.publish(&topic, data)
    }

    pub fn publish_standing_history(&self, data: LiveStandingHistoryData) -> usize {
        let topic = topic(STINT_DATA, &data.server_id);
        self.standing_history.publish(&topic, data)
    }

    pub fn publish_track_thumbnail(&self, server_id: &str, thumbnail: Resource) -> usize {
        self.track_thumbnail
            .publish(&topic(THUMBNAIL, server_id), thumbnail)
    }

    /// The first-driver-entered stream is global: every server publishes to
    /// the bare prefix.
    pub fn publish_first_driver_entered(&self, started: ServerStarted) -> usize {
        self.first_driver_entered
            .publish(FIRST_DRIVER_ENTERED, started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_is_prefix_plus_server() {
        assert_eq!(topic(SESSION_INFO, "S1"), "sessionInfo-S1");
        assert_eq!(topic(THUMBNAIL, "S1"), "thumbnail_S1");
    }

    #[tokio::test]
    async fn hub_routes_by_server_id() {
        let hub = Hub::new();
        let mut s1 = hub
            .session_info
            .subscribe(&topic(SESSION_INFO, "S1"))
            .unwrap();

        let delivered = hub.publish_session_info(LiveSessionInfoData {
            server_id: "S2".to_string(),
            ..Default::default()
        });
        assert_eq!(delivered, 0);
        assert!(s1.try_recv().is_none());

        hub.publish_session_info(LiveSessionInfoData {
            server_id: "S1".to_string(),
            server_name: "Sprint".to_string(),
            ..Default::default()
        });
        assert_eq!(s1.recv().await.unwrap().server_name, "Sprint");
    }
}
