//! Tile loop layout and token movement.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of board square, determining which decision is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Start,
    Save,
    Interest,
    Scam,
    Budget,
    Property,
    Loan,
    Normal,
}

impl TileKind {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Save => "save",
            Self::Interest => "interest",
            Self::Scam => "scam",
            Self::Budget => "budget",
            Self::Property => "property",
            Self::Loan => "loan",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Result of advancing the token by a dice roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMove {
    pub from: usize,
    pub to: usize,
    pub roll: u8,
    /// True when the token wrapped past the start tile.
    pub lapped: bool,
}

/// Read-only view over the configured tile loop.
#[derive(Debug, Clone, Copy)]
pub struct Board<'a> {
    tiles: &'a [TileKind],
}

impl<'a> Board<'a> {
    #[must_use]
    pub const fn new(tiles: &'a [TileKind]) -> Self {
        Self { tiles }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tile kind at `index`, wrapping around the loop.
    #[must_use]
    pub fn tile_at(&self, index: usize) -> TileKind {
        if self.tiles.is_empty() {
            return TileKind::Normal;
        }
        self.tiles[index % self.tiles.len()]
    }

    /// Advance from `position` by `roll` squares.
    #[must_use]
    pub fn advance(&self, position: usize, roll: u8) -> TokenMove {
        let len = self.tiles.len().max(1);
        let from = position % len;
        let to = (from + usize::from(roll)) % len;
        TokenMove {
            from,
            to,
            roll,
            lapped: to < from,
        }
    }
}
