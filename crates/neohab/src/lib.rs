//! # neohab
//!
//! Session client for persistent multi-user virtual-world servers.
//!
//! A [`HabitatClient`] holds one TCP session with a world server. It keeps a
//! local mirror of every object the server has introduced and resolves
//! friendly aliases (`ME`, `GHOST`, any slice of an object's ref) when
//! commands go out. Outbound commands pass through a single FIFO queue with
//! pacing delays. Inbound messages drive user-registered reactions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use neohab::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let client = HabitatClient::builder("127.0.0.1", 1337)
//!     .username("randy")
//!     .build();
//!
//! client.on("connected", |client, _| {
//!     client.goto_context("context-Downtown_5f");
//! });
//! client.on("enteredRegion", |client, _| {
//!     let client = client.clone();
//!     tokio::spawn(async move {
//!         if client.ensure_corporated().await.is_ok() {
//!             client.say("Hello, world!");
//!         }
//!     });
//! });
//!
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod commands;
mod config;
mod corporation;
mod error;
mod events;
mod supervisor;

pub use client::{ClientBuilder, HabitatClient};
pub use commands::{Direction, Posture, UnknownName};
pub use config::ClientConfig;
pub use corporation::CorporationState;
pub use error::ClientError;
pub use events::{EventKey, Reaction};

pub use neohab_protocol::{Command, Message, MessageKind, Mod, ObjectRecord};
pub use neohab_queue::Pending;
pub use neohab_world::{Mirror, alias};

/// Commonly used types for building a client.
pub mod prelude {
    pub use crate::{
        ClientBuilder, ClientConfig, ClientError, Command, CorporationState, Direction, EventKey,
        HabitatClient, Message, ObjectRecord, Posture,
    };
}
