//! Event registry: reactions keyed by lifecycle event or server op.
//!
//! Reactions are plain closures. Every reaction registered under a key runs
//! for every matching event, in registration order. There is no
//! de-duplication and no removal.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use neohab_protocol::Message;
use parking_lot::RwLock;

use crate::HabitatClient;

/// A registered reaction.
///
/// Receives the client (to send commands or read the mirror) and the
/// message that triggered it. The message is `None` for `connected` and
/// `disconnected`.
pub type Reaction = Arc<dyn Fn(&HabitatClient, Option<&Message>) + Send + Sync>;

/// What a reaction is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// The socket is up and the mirror is empty.
    Connected,
    /// The stream ended.
    Disconnected,
    /// The server introduced the client's own avatar.
    EnteredRegion,
    /// The server deleted an object.
    Delete,
    /// Every inbound message, after its op-specific reactions.
    Msg,
    /// Any other server op, by name.
    Op(String),
}

impl EventKey {
    /// The string the key is stored under.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::EnteredRegion => "enteredRegion",
            Self::Delete => "delete",
            Self::Msg => "msg",
            Self::Op(op) => op,
        }
    }
}

impl From<&str> for EventKey {
    fn from(key: &str) -> Self {
        match key {
            "connected" => Self::Connected,
            "disconnected" => Self::Disconnected,
            "enteredRegion" => Self::EnteredRegion,
            "delete" => Self::Delete,
            "msg" => Self::Msg,
            op => Self::Op(op.to_owned()),
        }
    }
}

impl From<String> for EventKey {
    fn from(key: String) -> Self {
        Self::from(key.as_str())
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
pub(crate) struct EventRegistry {
    reactions: RwLock<HashMap<String, Vec<Reaction>>>,
}

impl EventRegistry {
    pub(crate) fn on(&self, key: EventKey, reaction: Reaction) {
        self.reactions
            .write()
            .entry(key.as_str().to_owned())
            .or_default()
            .push(reaction);
    }

    /// Runs every reaction under `key`.
    ///
    /// The list is snapshotted first so reactions may register further
    /// reactions without deadlocking; those take effect from the next event.
    pub(crate) fn dispatch(
        &self,
        client: &HabitatClient,
        key: &EventKey,
        payload: Option<&Message>,
    ) {
        let snapshot = self.reactions.read().get(key.as_str()).cloned();
        let Some(reactions) = snapshot else {
            return;
        };
        tracing::trace!(%key, count = reactions.len(), "dispatching event");
        for reaction in &reactions {
            reaction(client, payload);
        }
    }

    pub(crate) fn count(&self, key: &EventKey) -> usize {
        self.reactions.read().get(key.as_str()).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_keys_round_trip() {
        for key in ["connected", "disconnected", "enteredRegion", "delete", "msg"] {
            assert_eq!(EventKey::from(key).as_str(), key);
            assert!(!matches!(EventKey::from(key), EventKey::Op(_)));
        }
    }

    #[test]
    fn test_server_op_key() {
        let key = EventKey::from("SPEAK$");
        assert_eq!(key, EventKey::Op("SPEAK$".into()));
        assert_eq!(key.to_string(), "SPEAK$");
    }
}
