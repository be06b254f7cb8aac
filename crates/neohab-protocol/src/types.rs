//! Message types for the world protocol.
//!
//! Messages on this wire are free-form JSON objects interpreted by
//! convention: an `op` names the operation, a `to` names the target, and
//! everything else depends on the op. We keep the full object around (so
//! nothing the server sends is lost to callers) and layer typed views on
//! top of it:
//!
//! - [`Message`]: one inbound message, with accessors for the conventional
//!   fields.
//! - [`MessageKind`]: the handful of ops the client itself understands,
//!   plus catch-alls for everything else.
//! - [`ObjectRecord`]: the object payload carried by introduction ops.
//! - [`Command`]: one outbound message.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Codec, JsonCodec, ProtocolError};

// ---------------------------------------------------------------------------
// Operation names
// ---------------------------------------------------------------------------

/// Creates an object; payload under `obj`.
pub const OP_MAKE: &str = "make";
/// Describes an object already in the region; payload under `object`.
pub const OP_HEREIS: &str = "HEREIS_$";
/// Removes the object named by `to`.
pub const OP_DELETE: &str = "delete";

/// First-mod type tag of an avatar.
pub const MOD_AVATAR: &str = "Avatar";
/// First-mod type tag of a ghost.
pub const MOD_GHOST: &str = "Ghost";

// ---------------------------------------------------------------------------
// ObjectRecord
// ---------------------------------------------------------------------------

/// An attribute set attached to an object.
///
/// The first mod of an object carries its core state: `type`, `noid`,
/// position (`x`, `y`), and for avatars the `amAGhost` flag.
pub type Mod = Map<String, Value>;

/// An object as introduced by the server.
///
/// Fields the client doesn't interpret are kept in `extra` and survive a
/// round trip through [`serde_json::to_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// The object's type tag (e.g. `"item"`).
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Canonical dash-delimited reference, e.g. `user-randy-1234`.
    #[serde(rename = "ref")]
    pub reference: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Ordered attribute sets.
    #[serde(default)]
    pub mods: Vec<Mod>,

    /// Everything else the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObjectRecord {
    /// The first mod, if the object has any.
    pub fn first_mod(&self) -> Option<&Mod> {
        self.mods.first()
    }

    /// The first mod's `type` tag.
    pub fn mod_type(&self) -> Option<&str> {
        self.first_mod()?.get("type")?.as_str()
    }

    /// The first mod's numeric object id.
    pub fn noid(&self) -> Option<u64> {
        self.first_mod()?.get("noid")?.as_u64()
    }

    /// The first mod's horizontal position.
    pub fn x(&self) -> Option<i64> {
        self.first_mod()?.get("x")?.as_i64()
    }

    /// The first mod's vertical position.
    pub fn y(&self) -> Option<i64> {
        self.first_mod()?.get("y")?.as_i64()
    }

    /// `true` if this is an avatar object.
    pub fn is_avatar(&self) -> bool {
        self.mod_type() == Some(MOD_AVATAR)
    }

    /// `true` if this is a ghost object.
    pub fn is_ghost(&self) -> bool {
        self.mod_type() == Some(MOD_GHOST)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// What an inbound message means to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    /// `make`: a new object.
    Make(ObjectRecord),
    /// `HEREIS_$`: an object already present, normalized to the `make` shape.
    HereIs(ObjectRecord),
    /// `delete`: the object at `target` is gone.
    Delete {
        /// The ref or alias from the message's `to`.
        target: String,
    },
    /// Any other op. The payload stays on the [`Message`].
    Other(String),
    /// No `op` at all.
    Untagged,
}

/// One inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    /// Decodes a frame into a message.
    ///
    /// # Errors
    /// `Decode` if the frame isn't JSON, `InvalidMessage` if it is JSON but
    /// not an object.
    pub fn from_frame(frame: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = JsonCodec.decode(frame)?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ProtocolError::InvalidMessage(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// The operation name.
    pub fn op(&self) -> Option<&str> {
        self.0.get("op")?.as_str()
    }

    /// The target ref or alias.
    pub fn to(&self) -> Option<&str> {
        self.0.get("to")?.as_str()
    }

    /// `true` if the server flagged this message as being about the
    /// receiving client's own avatar.
    pub fn is_you(&self) -> bool {
        self.0.get("you").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Looks up any top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Classifies the message by op.
    ///
    /// # Errors
    /// `InvalidMessage` when a known op is missing the fields it needs,
    /// e.g. a `make` whose `obj` is absent or has no `ref`.
    pub fn classify(&self) -> Result<MessageKind, ProtocolError> {
        let Some(op) = self.op() else {
            return Ok(MessageKind::Untagged);
        };
        match op {
            OP_MAKE => self.object_under("obj").map(MessageKind::Make),
            OP_HEREIS => self.object_under("object").map(MessageKind::HereIs),
            OP_DELETE => match self.to() {
                Some(target) => Ok(MessageKind::Delete {
                    target: target.to_owned(),
                }),
                None => Err(ProtocolError::InvalidMessage(
                    "delete without a target".into(),
                )),
            },
            other => Ok(MessageKind::Other(other.to_owned())),
        }
    }

    fn object_under(&self, field: &str) -> Result<ObjectRecord, ProtocolError> {
        let value = self.0.get(field).ok_or_else(|| {
            ProtocolError::InvalidMessage(format!(
                "{} without `{field}`",
                self.op().unwrap_or_default()
            ))
        })?;
        ObjectRecord::deserialize(value).map_err(ProtocolError::Decode)
    }
}

impl From<Map<String, Value>> for Message {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One outbound message.
///
/// Conventionally carries `op` and `to`; any other fields are free-form.
/// Before it goes on the wire, `to` is resolved through the alias table
/// and every string field containing `$` is substituted from world state.
///
/// ```rust
/// use neohab_protocol::Command;
///
/// let cmd = Command::new("WALK").with("to", "ME").with("x", 40).with("y", 120);
/// assert_eq!(cmd.op(), Some("WALK"));
/// assert_eq!(cmd.get("x"), Some(&serde_json::json!(40)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(Map<String, Value>);

impl Command {
    /// Creates a command with the given `op`.
    pub fn new(op: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("op".into(), Value::String(op.into()));
        Self(map)
    }

    /// Sets a field, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Sets the target.
    pub fn to(self, target: impl Into<String>) -> Self {
        self.with("to", Value::String(target.into()))
    }

    /// The operation name.
    pub fn op(&self) -> Option<&str> {
        self.0.get("op")?.as_str()
    }

    /// The target ref or alias.
    pub fn target(&self) -> Option<&str> {
        self.0.get("to")?.as_str()
    }

    /// Looks up any field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The fields, for in-place rewriting before transmission.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// The fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for Command {
    type Error = ProtocolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ProtocolError::InvalidMessage(format!(
                "a command must be a JSON object, got {other}"
            ))),
        }
    }
}
