//! Chain-of-responsibility routing of user events.
//!
//! Every menu node implements [`Accepter`]. A node first checks whether an
//! event is its own, then asks its children in registration order, then
//! offers its back affordance. The first node that returns an [`Action`]
//! owns the event; nobody after it is asked.
//!
//! Declining must have no side effects. The returned action is deferred:
//! it runs later, against the chat that produced the event.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use futures_util::future::BoxFuture;

use crate::chat::ChatTarget;

type ActionFn = Box<dyn FnOnce(ChatTarget) -> BoxFuture<'static, Result<()>> + Send>;

/// Deferred unit of work bound to the parameters extracted from an event.
pub struct Action {
    run: ActionFn,
}

impl Action {
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: FnOnce(ChatTarget) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            run: Box::new(move |target| Box::pin(run(target))),
        }
    }

    pub async fn run(self, target: ChatTarget) -> Result<()> {
        (self.run)(target).await
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action")
    }
}

/// The three event kinds a menu node may own.
///
/// Defaults decline, so leaves only implement what they handle.
pub trait Accepter: Send + Sync {
    fn accept_command(&self, _command: &str) -> Option<Action> {
        None
    }

    fn accept_callback(&self, _payload: &str) -> Option<Action> {
        None
    }

    fn accept_button(&self, _label: &str) -> Option<Action> {
        None
    }
}

/// Ordered children of a composite node.
#[derive(Clone, Default)]
pub struct Children(Vec<Arc<dyn Accepter>>);

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, child: Arc<dyn Accepter>) {
        self.0.push(child);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn command(&self, command: &str) -> Option<Action> {
        self.0.iter().find_map(|child| child.accept_command(command))
    }

    pub fn callback(&self, payload: &str) -> Option<Action> {
        self.0.iter().find_map(|child| child.accept_callback(payload))
    }

    pub fn button(&self, label: &str) -> Option<Action> {
        self.0.iter().find_map(|child| child.accept_button(label))
    }
}

impl FromIterator<Arc<dyn Accepter>> for Children {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Accepter>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Colon-delimited callback envelope: `kind:owner:args...`.
///
/// `kind` names the action family of a node type; `owner` is the server or
/// user id used for the cheap accept/reject check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackData<'a> {
    pub kind: &'a str,
    pub owner: &'a str,
    pub args: Vec<&'a str>,
}

impl<'a> CallbackData<'a> {
    /// Returns `None` unless both `kind` and `owner` are present.
    pub fn parse(payload: &'a str) -> Option<Self> {
        let mut parts = payload.split(':');
        let kind = parts.next().filter(|kind| !kind.is_empty())?;
        let owner = parts.next()?;
        Some(Self {
            kind,
            owner,
            args: parts.collect(),
        })
    }

    /// Parses `payload` only if it carries `kind` for `owner`.
    pub fn for_owner(payload: &'a str, kind: &str, owner: &str) -> Option<Self> {
        Self::parse(payload).filter(|data| data.kind == kind && data.owner == owner)
    }

    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).copied()
    }

    pub fn encode(kind: &str, owner: &str, args: &[&str]) -> String {
        let mut payload = format!("{kind}:{owner}");
        for arg in args {
            payload.push(':');
            payload.push_str(arg);
        }
        payload
    }
}
