//! Game servers known to the bot and their status markers.

use pitwall_core::config::ServerConfig;
use pitwall_core::model::LiveSessionInfoData;

pub const STATUS_ONLINE: &str = "🟢";
pub const STATUS_OFFLINE: &str = "🔴";
pub const STATUS_ONLINE_NO_DATA: &str = "🟡";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Server {
    pub id: String,
    pub url: String,
    pub name: String,
    pub web_socket_running: bool,
    pub receiving_data: bool,
}

impl Server {
    pub fn status(&self) -> &'static str {
        match (self.web_socket_running, self.receiving_data) {
            (false, _) => STATUS_OFFLINE,
            (true, false) => STATUS_ONLINE_NO_DATA,
            (true, true) => STATUS_ONLINE,
        }
    }

    /// Label of the server button in the live menu.
    pub fn status_and_name(&self) -> String {
        format!("{} {}", self.status(), self.name)
    }

    /// Folds a session-info update into the known server state.
    pub fn apply(&mut self, data: &LiveSessionInfoData) {
        if let Some(name) = reported_name(data) {
            self.name = name.to_string();
        }
        self.web_socket_running = data.session_info.web_socket_running;
        self.receiving_data = data.session_info.receiving_data;
    }
}

impl From<&ServerConfig> for Server {
    fn from(config: &ServerConfig) -> Self {
        let name = if config.name.trim().is_empty() {
            config.id.clone()
        } else {
            config.name.clone()
        };
        Self {
            id: config.id.clone(),
            url: config.url.trim_end_matches('/').to_string(),
            name,
            ..Self::default()
        }
    }
}

/// Name the server reports about itself, if any.
pub fn reported_name(data: &LiveSessionInfoData) -> Option<&str> {
    [
        data.server_name.as_str(),
        data.session_info.server_name.as_str(),
    ]
    .into_iter()
    .map(str::trim)
    .find(|name| !name.is_empty())
}

/// Strips a leading status marker from a button label.
pub fn sanitize_server_name(label: &str) -> &str {
    let mut rest = label.trim();
    for marker in [STATUS_ONLINE, STATUS_OFFLINE, STATUS_ONLINE_NO_DATA] {
        if let Some(stripped) = rest.strip_prefix(marker) {
            rest = stripped;
            break;
        }
    }
    rest.trim()
}
