pub(crate) mod context;
pub(crate) mod queue;
pub(crate) mod router;

pub(crate) use context::BotContext;
pub(crate) use queue::{dispatch_event, new_chat_queues};
pub(crate) use router::deny;
