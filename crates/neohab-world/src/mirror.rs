//! The object mirror: the client's local copy of the world it can see.
//!
//! The mirror is fed one decoded [`Message`] at a time and keeps four
//! tables in sync:
//!
//! - **names**: alias → canonical ref
//! - **history**: ref → last record that introduced the object
//! - **noids**: numeric object id → record
//! - **avatars**: avatar display name → record
//!
//! All four are derived state: replaying the same introduction and
//! deletion messages into an empty mirror rebuilds them exactly.
//!
//! # Concurrency note
//!
//! `Mirror` is NOT thread-safe by itself. The client owns exactly one per
//! connection behind a lock and never shares it across sessions.

use std::collections::HashMap;

use neohab_protocol::{Command, Message, MessageKind, Mod, OP_DELETE, ObjectRecord};

use crate::alias::{self, GHOST, ME, USER};
use crate::substitute;

/// What applying a message changed that the caller must react to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorUpdate {
    /// The message introduced the client's own avatar; `enteredRegion`
    /// reactions are due.
    pub entered_region: bool,
}

/// Local mirror of remote world state.
#[derive(Debug, Default)]
pub struct Mirror {
    names: HashMap<String, String>,
    history: HashMap<String, ObjectRecord>,
    /// Never pruned on delete: noids are not reused within a session.
    noids: HashMap<u64, ObjectRecord>,
    avatars: HashMap<String, ObjectRecord>,
}

impl Mirror {
    /// Creates an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything. Called when a fresh session starts.
    pub fn clear(&mut self) {
        self.names.clear();
        self.history.clear();
        self.noids.clear();
        self.avatars.clear();
    }

    /// Applies one inbound message.
    pub fn apply(&mut self, msg: &Message) -> MirrorUpdate {
        let mut update = MirrorUpdate::default();

        // A delete's target is about to be released; registering it first
        // would add and remove the same ref in one message.
        if msg.op() != Some(OP_DELETE) {
            if let Some(to) = msg.to() {
                self.register(to);
            }
        }

        let kind = match msg.classify() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(op = ?msg.op(), error = %e, "skipping malformed message");
                return update;
            }
        };

        match kind {
            MessageKind::Make(record) | MessageKind::HereIs(record) => {
                update.entered_region = self.introduce(record, msg.is_you());
            }
            MessageKind::Delete { target } => self.remove(&target),
            MessageKind::Other(_) | MessageKind::Untagged => {}
        }

        update
    }

    /// Resolves an alias to its canonical ref.
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.names.get(alias).map(String::as_str)
    }

    /// Looks up an object by alias or ref.
    pub fn object(&self, alias: &str) -> Option<&ObjectRecord> {
        self.history.get(self.resolve(alias)?)
    }

    /// Looks up an object by numeric id.
    pub fn by_noid(&self, noid: u64) -> Option<&ObjectRecord> {
        self.noids.get(&noid)
    }

    /// Looks up an avatar by display name.
    pub fn avatar_named(&self, name: &str) -> Option<&ObjectRecord> {
        self.avatars.get(name)
    }

    /// The client's own avatar.
    pub fn me(&self) -> Option<&ObjectRecord> {
        self.object(ME)
    }

    /// The client's own avatar's first mod.
    pub fn my_mod(&self) -> Option<&Mod> {
        self.me()?.first_mod()
    }

    /// The ref of the client's ghost, once the server has introduced it.
    pub fn ghost_ref(&self) -> Option<&str> {
        self.resolve(GHOST)
    }

    /// Number of objects currently known.
    pub fn object_count(&self) -> usize {
        self.history.len()
    }

    /// Rewrites a command against current state: `to` through the alias
    /// table, then `$` substitution on every string field.
    pub fn prepare(&self, cmd: &mut Command) {
        substitute::prepare(self, cmd);
    }

    fn register(&mut self, reference: &str) {
        for alias in alias::aliases(reference) {
            self.names.insert(alias, reference.to_owned());
        }
    }

    /// Returns `true` if the record is the client's own avatar.
    fn introduce(&mut self, record: ObjectRecord, you: bool) -> bool {
        let reference = record.reference.clone();
        self.register(&reference);

        if let Some(noid) = record.noid() {
            self.noids.insert(noid, record.clone());
        }

        if you {
            self.names.insert(ME.to_owned(), reference.clone());
            self.names.insert(USER.to_owned(), alias::user_of(&reference));
            tracing::info!(%reference, "entered region");
        }
        if record.is_ghost() {
            self.names.insert(GHOST.to_owned(), reference.clone());
            tracing::debug!(%reference, "ghost introduced");
        }
        if record.is_avatar() {
            self.avatars.insert(record.name.clone(), record.clone());
        }

        tracing::debug!(%reference, name = %record.name, "object introduced");
        self.history.insert(reference, record);
        you
    }

    fn remove(&mut self, target: &str) {
        let Some(reference) = self.resolve(target).map(str::to_owned) else {
            tracing::debug!(target, "delete for unknown object");
            return;
        };
        let Some(record) = self.history.remove(&reference) else {
            tracing::debug!(%reference, "delete for object never introduced");
            self.release(&reference);
            return;
        };

        self.release(&reference);
        if record.is_avatar() {
            self.avatars.remove(&record.name);
        }
        tracing::debug!(%reference, "object deleted");
    }

    /// Drops every alias that still points at `reference`.
    fn release(&mut self, reference: &str) {
        self.names.retain(|_, target| target != reference);
    }
}
