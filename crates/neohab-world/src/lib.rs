//! World state for neohab.
//!
//! The client mirrors the part of the world it can see so that reactions
//! and outbound commands can refer to objects by short names instead of
//! full refs.
//!
//! # Key types
//!
//! - [`Mirror`]: alias table, object history, noid and avatar indexes
//! - [`MirrorUpdate`]: side effects of applying a message
//! - [`substitute`]: `$path` expansion against a mirror
//! - [`alias`]: alias derivation and the reserved `ME` / `USER` / `GHOST`

pub mod alias;
mod mirror;
mod substitute;

pub use mirror::{Mirror, MirrorUpdate};
pub use substitute::substitute;
