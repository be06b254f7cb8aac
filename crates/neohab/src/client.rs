//! `HabitatClient` builder, shared state, and the public send/read API.
//!
//! This ties the layers together: transport → protocol → world → queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use neohab_protocol::{Codec, Command, JsonCodec, Message, Mod, ObjectRecord};
use neohab_queue::{ActionQueue, Pending};
use neohab_transport::LinkWriter;
use neohab_world::Mirror;
use parking_lot::Mutex;
use serde_json::Value;

use crate::commands::Direction;
use crate::events::{EventKey, EventRegistry};
use crate::{ClientConfig, ClientError};

/// State shared by every clone of a client and by its background tasks.
pub(crate) struct Inner {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) username: Option<String>,
    pub(crate) config: ClientConfig,
    pub(crate) connected: AtomicBool,
    /// The write half of the live socket. Only the dispatch queue writes;
    /// the supervisor installs and removes it.
    pub(crate) link: tokio::sync::Mutex<Option<LinkWriter>>,
    pub(crate) mirror: Mutex<Mirror>,
    pub(crate) events: EventRegistry,
    pub(crate) queue: ActionQueue<ClientError>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring a client.
///
/// # Example
///
/// ```rust,no_run
/// use neohab::prelude::*;
///
/// # async fn run() -> Result<(), ClientError> {
/// let client = HabitatClient::builder("127.0.0.1", 1337)
///     .username("randy")
///     .config(ClientConfig { should_reconnect: false, ..ClientConfig::default() })
///     .build();
/// client.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Creates a builder for `host:port` with default settings.
    ///
    /// An empty host or port `0` counts as unset; `connect()` reports it.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            config: ClientConfig::default(),
        }
    }

    /// Sets the account name used when entering contexts.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the client. Does not connect.
    ///
    /// Must be called from within a Tokio runtime: the dispatch queue's
    /// worker task is spawned here.
    pub fn build(self) -> HabitatClient {
        HabitatClient {
            inner: Arc::new(Inner {
                host: self.host,
                port: self.port,
                username: self.username,
                config: self.config,
                connected: AtomicBool::new(false),
                link: tokio::sync::Mutex::new(None),
                mirror: Mutex::new(Mirror::new()),
                events: EventRegistry::default(),
                queue: ActionQueue::spawn(),
                codec: JsonCodec,
            }),
        }
    }
}

/// A session with one world server.
///
/// Cheap to clone; clones share the connection, the mirror, the event
/// registry, and the dispatch queue.
#[derive(Clone)]
pub struct HabitatClient {
    pub(crate) inner: Arc<Inner>,
}

impl std::fmt::Debug for HabitatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HabitatClient")
            .field("host", &self.inner.host)
            .field("port", &self.inner.port)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl HabitatClient {
    /// Creates a builder.
    pub fn builder(host: impl Into<String>, port: u16) -> ClientBuilder {
        ClientBuilder::new(host, port)
    }

    /// Creates a client with default settings and no username.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ClientBuilder::new(host, port).build()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The account name, if one was given.
    pub fn username(&self) -> Option<&str> {
        self.inner.username.as_deref()
    }

    /// `true` while the socket is up.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Registers a reaction.
    ///
    /// `key` is a built-in (`"connected"`, `"disconnected"`,
    /// `"enteredRegion"`, `"delete"`, `"msg"`) or any server op name.
    pub fn on<F>(&self, key: impl Into<EventKey>, reaction: F)
    where
        F: Fn(&HabitatClient, Option<&Message>) + Send + Sync + 'static,
    {
        self.inner.events.on(key.into(), Arc::new(reaction));
    }

    /// Number of reactions registered under `key`.
    pub fn reaction_count(&self, key: impl Into<EventKey>) -> usize {
        self.inner.events.count(&key.into())
    }

    pub(crate) fn emit(&self, key: &EventKey, payload: Option<&Message>) {
        self.inner.events.dispatch(self, key, payload);
    }

    // -----------------------------------------------------------------------
    // Dispatch queue
    // -----------------------------------------------------------------------

    /// Queues a command with the default pacing delay.
    pub fn send(&self, command: Command) -> Pending<ClientError> {
        self.send_with_delay(command, self.inner.config.send_delay())
    }

    /// Queues a command.
    ///
    /// When the command reaches the front of the queue it is resolved
    /// against the mirror, then held for `delay`, then written, provided
    /// the session is still up.
    pub fn send_with_delay(&self, command: Command, delay: Duration) -> Pending<ClientError> {
        let op = command.op().map(str::to_owned);
        let client = self.clone();
        let pending = self
            .inner
            .queue
            .push(async move { client.transmit(command, delay).await });
        tracing::trace!(?op, depth = self.inner.queue.depth(), "queued command");
        pending
    }

    /// Queues a pause with no network effect.
    pub fn wait(&self, duration: Duration) -> Pending<ClientError> {
        self.inner.queue.wait(duration)
    }

    async fn transmit(&self, mut command: Command, delay: Duration) -> Result<(), ClientError> {
        self.inner.mirror.lock().prepare(&mut command);
        tokio::time::sleep(delay).await;

        if !self.is_connected() {
            tracing::warn!(op = ?command.op(), "dropping command: not connected");
            return Err(ClientError::NotConnected);
        }
        let frame = self.inner.codec.encode_frame(&command)?;

        let mut link = self.inner.link.lock().await;
        let Some(writer) = link.as_mut() else {
            return Err(ClientError::NotConnected);
        };
        writer.send(&frame).await?;
        tracing::debug!(link = %writer.id(), op = ?command.op(), to = ?command.target(), "sent command");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Decodes one frame and hands it to [`handle_message`](Self::handle_message).
    pub(crate) fn handle_frame(&self, frame: &[u8]) {
        match Message::from_frame(frame) {
            Ok(msg) => self.handle_message(&msg),
            Err(e) => {
                tracing::warn!(error = %e, len = frame.len(), "dropping undecodable frame");
            }
        }
    }

    /// Updates the mirror, then runs `enteredRegion`, op, and `msg`
    /// reactions, in that order.
    pub(crate) fn handle_message(&self, msg: &Message) {
        tracing::debug!(op = ?msg.op(), to = ?msg.to(), "received message");
        let update = self.inner.mirror.lock().apply(msg);

        if update.entered_region {
            self.emit(&EventKey::EnteredRegion, Some(msg));
        }
        if let Some(op) = msg.op() {
            self.emit(&EventKey::from(op), Some(msg));
        }
        self.emit(&EventKey::Msg, Some(msg));
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    /// Runs `f` against the mirror.
    ///
    /// The mirror is locked for the duration of `f`; don't send commands or
    /// block from inside it.
    pub fn with_mirror<R>(&self, f: impl FnOnce(&Mirror) -> R) -> R {
        f(&self.inner.mirror.lock())
    }

    /// Resolves an alias to its canonical ref.
    pub fn resolve_alias(&self, alias: &str) -> Option<String> {
        self.with_mirror(|m| m.resolve(alias).map(str::to_owned))
    }

    /// Looks up an object by alias or ref.
    pub fn object(&self, alias: &str) -> Option<ObjectRecord> {
        self.with_mirror(|m| m.object(alias).cloned())
    }

    /// Looks up an avatar in the region by display name.
    pub fn avatar_named(&self, name: &str) -> Option<ObjectRecord> {
        self.with_mirror(|m| m.avatar_named(name).cloned())
    }

    /// The client's own avatar, once the server has introduced it.
    pub fn get_avatar(&self) -> Option<ObjectRecord> {
        let avatar = self.with_mirror(|m| m.me().cloned());
        if avatar.is_none() {
            tracing::debug!("no avatar yet");
        }
        avatar
    }

    /// The client's own avatar's numeric id.
    pub fn get_avatar_noid(&self) -> Option<u64> {
        self.get_avatar()?.noid()
    }

    /// Looks up an object by numeric id.
    pub fn get_noid(&self, noid: u64) -> Option<ObjectRecord> {
        let record = self.with_mirror(|m| m.by_noid(noid).cloned());
        if record.is_none() {
            tracing::warn!(noid, "unknown noid");
        }
        record
    }

    /// The first mod of the object with this numeric id.
    pub fn get_mod(&self, noid: u64) -> Option<Mod> {
        self.get_noid(noid)?.first_mod().cloned()
    }

    /// Which way the avatar has to face to look at `object`.
    ///
    /// `None` if either side has no horizontal position.
    pub fn get_direction(&self, object: &ObjectRecord) -> Option<Direction> {
        let mine = self.get_avatar()?.x()?;
        let theirs = object.x()?;
        Some(if theirs < mine {
            Direction::Left
        } else {
            Direction::Right
        })
    }

    /// [`get_direction`](Self::get_direction) by numeric id.
    pub fn get_direction_of_noid(&self, noid: u64) -> Option<Direction> {
        let object = self.get_noid(noid)?;
        self.get_direction(&object)
    }

    /// `true` if the client's avatar is currently a ghost.
    ///
    /// This reads the avatar's `amAGhost` flag only, so it is `false` before
    /// the avatar has been introduced. [`corporation_state`] answers the
    /// different question of whether the client still needs to corporate,
    /// and reports `GhostedNoGhostRef` in that case.
    ///
    /// [`corporation_state`]: Self::corporation_state
    pub fn is_ghosted(&self) -> bool {
        self.with_mirror(|m| {
            m.my_mod()
                .and_then(|first| first.get("amAGhost"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
    }
}
