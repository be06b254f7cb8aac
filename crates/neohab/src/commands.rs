//! Convenience commands for common avatar actions.
//!
//! Each one builds a [`Command`] addressed through the alias table and
//! queues it with [`HabitatClient::send`], so it is paced and ordered like
//! any other command.

use std::fmt;
use std::str::FromStr;

use neohab_protocol::Command;
use neohab_queue::Pending;
use neohab_world::alias::{GHOST, ME, USER};

use crate::{ClientError, HabitatClient};

/// Avatar gestures and poses understood by the `POSTURE` op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Posture {
    SitFloor,
    SitChair,
    BendOver,
    BendBack,
    Point,
    Throw,
    Jump,
    Punch,
    Wave,
    Frown,
    StandUp,
    HandOut,
    SitFront,
}

impl Posture {
    const ALL: [Posture; 13] = [
        Self::SitFloor,
        Self::SitChair,
        Self::BendOver,
        Self::BendBack,
        Self::Point,
        Self::Throw,
        Self::Jump,
        Self::Punch,
        Self::Wave,
        Self::Frown,
        Self::StandUp,
        Self::HandOut,
        Self::SitFront,
    ];

    /// The numeric pose code sent on the wire.
    pub fn code(self) -> u8 {
        match self {
            Self::SitFloor => 132,
            Self::SitChair => 133,
            Self::BendOver => 134,
            Self::BendBack => 135,
            Self::Point => 136,
            Self::Throw => 137,
            Self::Jump => 139,
            Self::Punch => 140,
            Self::Wave => 141,
            Self::Frown => 142,
            Self::StandUp => 146,
            Self::HandOut => 151,
            Self::SitFront => 157,
        }
    }

    /// Upper-case name, as used in scripts (`"SIT_FLOOR"`).
    pub fn name(self) -> &'static str {
        match self {
            Self::SitFloor => "SIT_FLOOR",
            Self::SitChair => "SIT_CHAIR",
            Self::BendOver => "BEND_OVER",
            Self::BendBack => "BEND_BACK",
            Self::Point => "POINT",
            Self::Throw => "THROW",
            Self::Jump => "JUMP",
            Self::Punch => "PUNCH",
            Self::Wave => "WAVE",
            Self::Frown => "FROWN",
            Self::StandUp => "STAND_UP",
            Self::HandOut => "HAND_OUT",
            Self::SitFront => "SIT_FRONT",
        }
    }
}

impl fmt::Display for Posture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a posture or direction name isn't recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {name}")]
pub struct UnknownName {
    kind: &'static str,
    name: String,
}

/// Compares names ignoring case and underscores, so `sit_floor`,
/// `SITFLOOR` and `SitFloor` all match.
fn same_name(a: &str, b: &str) -> bool {
    let norm = |s: &str| {
        s.chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect::<String>()
    };
    norm(a) == norm(b)
}

impl FromStr for Posture {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| same_name(p.name(), s))
            .ok_or_else(|| UnknownName {
                kind: "posture",
                name: s.to_owned(),
            })
    }
}

/// Which way an avatar faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// The pose code that turns the avatar this way.
    pub fn code(self) -> u8 {
        match self {
            Self::Left => 254,
            Self::Right => 255,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        })
    }
}

impl FromStr for Direction {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("left") {
            Ok(Self::Left)
        } else if s.eq_ignore_ascii_case("right") {
            Ok(Self::Right)
        } else {
            Err(UnknownName {
                kind: "direction",
                name: s.to_owned(),
            })
        }
    }
}

impl HabitatClient {
    /// Speaks `text` aloud in the current region.
    pub fn say(&self, text: impl Into<String>) -> Pending<ClientError> {
        self.send(
            Command::new("SPEAK")
                .to(ME)
                .with("esp", 0)
                .with("text", text.into()),
        )
    }

    /// Walks the avatar to `(x, y)`.
    pub fn walk_to(&self, x: i64, y: i64) -> Pending<ClientError> {
        self.send(
            Command::new("WALK")
                .to(ME)
                .with("x", x)
                .with("y", y)
                .with("how", 1),
        )
    }

    /// Strikes a pose.
    pub fn do_posture(&self, posture: Posture) -> Pending<ClientError> {
        self.send(Command::new("POSTURE").to(ME).with("pose", posture.code()))
    }

    /// Turns to face left or right.
    pub fn face_direction(&self, direction: Direction) -> Pending<ClientError> {
        self.send(Command::new("POSTURE").to(ME).with("pose", direction.code()))
    }

    /// Enters the region or context with id `context`.
    pub fn goto_context(&self, context: impl Into<String>) -> Pending<ClientError> {
        let user = match self.username() {
            Some(name) => format!("user-{name}"),
            None => format!("${}", USER),
        };
        self.send(
            Command::new("entercontext")
                .to("session")
                .with("context", context.into())
                .with("user", user),
        )
    }

    /// Asks the ghost to take on an avatar body.
    pub fn corporate(&self) -> Pending<ClientError> {
        self.send(Command::new("CORPORATE").to(GHOST))
    }

    /// Turns the avatar back into a ghost.
    pub fn discorporate(&self) -> Pending<ClientError> {
        self.send(Command::new("DISCORPORATE").to(ME))
    }
}
