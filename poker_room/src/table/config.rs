//! Table configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::game::entities::{Blinds, Chips, DEFAULT_MAX_SEATS};

/// Most seats a single table may have.
pub const MAX_SEATS: usize = 23;

/// Table speed variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableSpeed {
    Normal,
    Turbo,
    Hyper,
}

impl std::fmt::Display for TableSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSpeed::Normal => write!(f, "normal"),
            TableSpeed::Turbo => write!(f, "turbo"),
            TableSpeed::Hyper => write!(f, "hyper"),
        }
    }
}

impl std::str::FromStr for TableSpeed {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(TableSpeed::Normal),
            "turbo" => Ok(TableSpeed::Turbo),
            "hyper" => Ok(TableSpeed::Hyper),
            other => Err(ConfigError::UnknownSpeed(other.to_string())),
        }
    }
}

/// Invalid table configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Big blind must be greater than small blind")]
    InvertedBlinds,

    #[error("Small blind must be positive")]
    ZeroSmallBlind,

    #[error("Max buy-in must be greater than min buy-in")]
    InvertedBuyIn,

    #[error("Max players must be between 2 and {MAX_SEATS}")]
    SeatCount,

    #[error("Absolute chip cap must cover the minimum buy-in")]
    ChipCap,

    #[error("Max buy-in at every seat must fit in a chip count")]
    ChipTotal,

    #[error("Unknown table speed '{0}'")]
    UnknownSpeed(String),
}

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Number of seats (default: 9)
    pub max_players: usize,

    pub small_blind: Chips,
    pub big_blind: Chips,

    /// Minimum buy-in in big blinds (e.g., 20 BB)
    pub min_buy_in_bb: u8,

    /// Maximum buy-in in big blinds (e.g., 100 BB)
    pub max_buy_in_bb: u8,

    /// Hard limit on a single stack
    pub absolute_chip_cap: Chips,

    /// Table speed, which sets the turn timer
    pub speed: TableSpeed,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Default Table".to_string(),
            max_players: DEFAULT_MAX_SEATS,
            small_blind: 50,
            big_blind: 100,
            min_buy_in_bb: 20,
            max_buy_in_bb: 100,
            absolute_chip_cap: 100_000,
            speed: TableSpeed::Normal,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.small_blind == 0 {
            return Err(ConfigError::ZeroSmallBlind);
        }

        if self.big_blind <= self.small_blind {
            return Err(ConfigError::InvertedBlinds);
        }

        if self.max_buy_in_bb <= self.min_buy_in_bb {
            return Err(ConfigError::InvertedBuyIn);
        }

        if !(2..=MAX_SEATS).contains(&self.max_players) {
            return Err(ConfigError::SeatCount);
        }

        if self.absolute_chip_cap < self.min_buy_in_chips() {
            return Err(ConfigError::ChipCap);
        }

        let table_total = u64::from(self.max_buy_in_chips()).saturating_mul(self.max_players as u64);
        if table_total > u64::from(Chips::MAX) {
            return Err(ConfigError::ChipTotal);
        }

        Ok(())
    }

    pub fn blinds(&self) -> Blinds {
        Blinds {
            small: self.small_blind,
            big: self.big_blind,
        }
    }

    /// Get minimum buy-in in chips
    pub fn min_buy_in_chips(&self) -> Chips {
        self.big_blind.saturating_mul(Chips::from(self.min_buy_in_bb))
    }

    /// Get maximum buy-in in chips
    pub fn max_buy_in_chips(&self) -> Chips {
        let bb_max = self.big_blind.saturating_mul(Chips::from(self.max_buy_in_bb));
        bb_max.min(self.absolute_chip_cap)
    }

    /// Get action timeout based on table speed
    pub fn action_timeout(&self) -> Duration {
        let secs = match self.speed {
            TableSpeed::Normal => 30,
            TableSpeed::Turbo => 15,
            TableSpeed::Hyper => 5,
        };
        Duration::from_secs(secs)
    }
}
