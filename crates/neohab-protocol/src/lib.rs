//! Wire protocol for neohab.
//!
//! This crate defines the language the client and the world server speak:
//!
//! - **Framing** ([`Deframer`]): how a raw byte stream is cut into
//!   messages ("JSON object, then a blank line").
//! - **Types** ([`Message`], [`MessageKind`], [`ObjectRecord`],
//!   [`Command`]): what travels inside a frame.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how values become frame
//!   bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Message) → World (object mirror)
//! ```

mod codec;
mod deframer;
mod error;
mod types;

pub use codec::{Codec, FRAME_TERMINATOR, JsonCodec};
pub use deframer::Deframer;
pub use error::ProtocolError;
pub use types::{
    Command, MOD_AVATAR, MOD_GHOST, Message, MessageKind, Mod, OP_DELETE,
    OP_HEREIS, OP_MAKE, ObjectRecord,
};
