use pitwall_core::ChatTarget;

/// A user event already stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    pub target: ChatTarget,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Command(String),
    Button(String),
    Callback {
        /// Transport id used to acknowledge the callback.
        query_id: String,
        payload: String,
    },
}
