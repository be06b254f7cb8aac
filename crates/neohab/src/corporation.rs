//! Ghost-to-avatar transition.
//!
//! A client that enters a region as a ghost has no body other users can
//! see. Corporating asks the server to give it one: find the ghost object,
//! send it `CORPORATE`, then give other clients time to render the avatar.

use neohab_world::Mirror;
use serde_json::Value;

use crate::{ClientError, HabitatClient};

/// Where the client stands on the way to having a visible avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorporationState {
    /// Ghosted, and the server hasn't introduced the ghost object yet.
    GhostedNoGhostRef,
    /// Ghosted, and the `GHOST` alias resolves.
    GhostedHasGhostRef,
    /// The avatar is embodied.
    Corporated,
}

impl CorporationState {
    /// Reads the state off the mirror.
    ///
    /// Having no avatar at all counts as ghosted: there is nothing to
    /// render yet.
    pub fn of(mirror: &Mirror) -> Self {
        let embodied = mirror
            .my_mod()
            .map(|first| first.get("amAGhost").and_then(Value::as_bool) != Some(true))
            .unwrap_or(false);
        if embodied {
            Self::Corporated
        } else if mirror.ghost_ref().is_some() {
            Self::GhostedHasGhostRef
        } else {
            Self::GhostedNoGhostRef
        }
    }
}

impl HabitatClient {
    /// Current corporation state.
    pub fn corporation_state(&self) -> CorporationState {
        self.with_mirror(CorporationState::of)
    }

    /// Makes sure the client has a visible avatar.
    ///
    /// Does nothing if it already has one. Otherwise polls for the ghost
    /// every `corporation_poll_ms`, up to `corporation_max_polls` times,
    /// then sends `CORPORATE` and waits `corporation_settle_ms`.
    ///
    /// # Errors
    ///
    /// [`ClientError::CorporationFailed`] if the ghost never shows up, or
    /// whatever the `CORPORATE` command fails with.
    pub async fn ensure_corporated(&self) -> Result<(), ClientError> {
        let config = self.config();
        let mut polls = 0;

        loop {
            match self.corporation_state() {
                CorporationState::Corporated => {
                    tracing::debug!("already corporated");
                    return Ok(());
                }
                CorporationState::GhostedHasGhostRef => {
                    tracing::info!(polls, "corporating");
                    self.corporate().await?;
                    tokio::time::sleep(config.corporation_settle()).await;
                    tracing::info!("corporated");
                    return Ok(());
                }
                CorporationState::GhostedNoGhostRef => {
                    if polls >= config.corporation_max_polls {
                        tracing::info!(polls, "gave up waiting for ghost");
                        return Err(ClientError::CorporationFailed { attempts: polls });
                    }
                    polls += 1;
                    tracing::debug!(poll = polls, "waiting for ghost");
                    tokio::time::sleep(config.corporation_poll()).await;
                }
            }
        }
    }
}
