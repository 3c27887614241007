//! Typed game settings, validated once and replaceable at runtime.

use crate::ledger::{AccountDefaults, Mode};
use crate::money::{Cents, Multiplier};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Settings validation errors
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    InvalidChance { field: &'static str, value: f64 },

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: Cents },

    #[error("max_bet ({max}) must not be below min_bet ({min})")]
    BetRange { min: Cents, max: Cents },

    #[error("{0} multiplier must pay out")]
    LosingMultiplier(&'static str),

    #[error("wheel needs at least one winning and one losing segment")]
    WheelSegments,
}

/// Which balance track warm-up wins apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmUpScope {
    Demo,
    Real,
    Any,
}

impl WarmUpScope {
    pub fn covers(self, mode: Mode) -> bool {
        match self {
            WarmUpScope::Any => true,
            WarmUpScope::Demo => mode == Mode::Demo,
            WarmUpScope::Real => mode == Mode::Real,
        }
    }
}

impl std::str::FromStr for WarmUpScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "demo" => Ok(WarmUpScope::Demo),
            "real" => Ok(WarmUpScope::Real),
            "any" => Ok(WarmUpScope::Any),
            other => Err(format!("unknown warm-up scope: {other}")),
        }
    }
}

/// Payout multipliers per game variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multipliers {
    pub guess_number: Multiplier,
    pub coin_flip: Multiplier,
    pub find_card: Multiplier,
    /// Die showing 5
    pub dice_five: Multiplier,
    /// Die showing 6
    pub dice_six: Multiplier,
    /// Wheel segments in order; `Multiplier::ZERO` marks a losing segment
    pub wheel: Vec<Multiplier>,
}

impl Default for Multipliers {
    fn default() -> Self {
        Self {
            guess_number: Multiplier(400),
            coin_flip: Multiplier(190),
            find_card: Multiplier(280),
            dice_five: Multiplier(200),
            dice_six: Multiplier(300),
            wheel: [0, 150, 0, 200, 0, 120, 0, 300, 0, 180]
                .into_iter()
                .map(Multiplier)
                .collect(),
        }
    }
}

/// Game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Win probability in demo mode
    pub demo_win_chance: f64,
    /// Win probability in real mode
    pub real_win_chance: f64,
    /// A streak of this many wins forces the next round to lose
    pub max_consecutive_wins: u32,
    /// Guaranteed wins granted to new accounts
    pub warm_up_wins: u32,
    pub warm_up_scope: WarmUpScope,
    pub min_bet: Cents,
    pub max_bet: Cents,
    pub min_deposit: Cents,
    pub min_withdraw: Cents,
    pub starting_demo_balance: Cents,
    pub multipliers: Multipliers,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            demo_win_chance: 0.75,
            real_win_chance: 0.20,
            max_consecutive_wins: 2,
            warm_up_wins: 2,
            warm_up_scope: WarmUpScope::Any,
            min_bet: 50,
            max_bet: 50_000,
            min_deposit: 50,
            min_withdraw: 5_000,
            starting_demo_balance: 1_000,
            multipliers: Multipliers::default(),
        }
    }
}

impl GameSettings {
    /// Win probability for a balance track
    pub fn win_chance(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Demo => self.demo_win_chance,
            Mode::Real => self.real_win_chance,
        }
    }

    /// Opening state for accounts created under these settings
    pub fn account_defaults(&self) -> AccountDefaults {
        AccountDefaults {
            demo_balance: self.starting_demo_balance,
            real_balance: 0,
            warm_up_wins: self.warm_up_wins,
        }
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("demo_win_chance", self.demo_win_chance),
            ("real_win_chance", self.real_win_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::InvalidChance { field, value });
            }
        }

        for (field, value) in [
            ("min_bet", self.min_bet),
            ("min_deposit", self.min_deposit),
            ("min_withdraw", self.min_withdraw),
        ] {
            if value <= 0 {
                return Err(SettingsError::NotPositive { field, value });
            }
        }
        if self.starting_demo_balance < 0 {
            return Err(SettingsError::NotPositive {
                field: "starting_demo_balance",
                value: self.starting_demo_balance,
            });
        }

        if self.max_bet < self.min_bet {
            return Err(SettingsError::BetRange {
                min: self.min_bet,
                max: self.max_bet,
            });
        }

        let m = &self.multipliers;
        for (name, multiplier) in [
            ("guess_number", m.guess_number),
            ("coin_flip", m.coin_flip),
            ("find_card", m.find_card),
            ("dice_five", m.dice_five),
            ("dice_six", m.dice_six),
        ] {
            if !multiplier.is_winning() {
                return Err(SettingsError::LosingMultiplier(name));
            }
        }

        let winning = m.wheel.iter().any(|s| s.is_winning());
        let losing = m.wheel.iter().any(|s| !s.is_winning());
        if !winning || !losing {
            return Err(SettingsError::WheelSegments);
        }

        Ok(())
    }
}

/// Shared, live-replaceable settings.
///
/// Readers take a cheap snapshot per operation, so a replacement never
/// changes the parameters of a round already in progress.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Arc<GameSettings>>>,
}

impl SettingsHandle {
    pub fn new(settings: GameSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    /// Current settings
    pub async fn snapshot(&self) -> Arc<GameSettings> {
        self.inner.read().await.clone()
    }

    /// Validate and install new settings
    pub async fn replace(&self, settings: GameSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        *self.inner.write().await = Arc::new(settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = GameSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.multipliers.wheel.len(), 10);
        assert_eq!(settings.account_defaults().demo_balance, 1_000);
        assert_eq!(settings.account_defaults().warm_up_wins, 2);
    }

    #[test]
    fn test_validate_rejects_bad_chance() {
        let settings = GameSettings {
            real_win_chance: 1.5,
            ..GameSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidChance {
                field: "real_win_chance",
                ..
            })
        ));

        let settings = GameSettings {
            demo_win_chance: f64::NAN,
            ..GameSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_bet_range() {
        let settings = GameSettings {
            min_bet: 1_000,
            max_bet: 500,
            ..GameSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::BetRange { min: 1_000, max: 500 })
        );
    }

    #[test]
    fn test_validate_rejects_all_winning_wheel() {
        let mut settings = GameSettings::default();
        settings.multipliers.wheel = vec![Multiplier(150), Multiplier(200)];
        assert_eq!(settings.validate(), Err(SettingsError::WheelSegments));
    }

    #[test]
    fn test_warm_up_scope() {
        assert!(WarmUpScope::Any.covers(Mode::Real));
        assert!(WarmUpScope::Demo.covers(Mode::Demo));
        assert!(!WarmUpScope::Demo.covers(Mode::Real));
    }

    #[tokio::test]
    async fn test_replace_keeps_old_snapshot() {
        let handle = SettingsHandle::new(GameSettings::default());
        let before = handle.snapshot().await;

        let updated = GameSettings {
            real_win_chance: 0.5,
            ..GameSettings::default()
        };
        handle.replace(updated).await.unwrap();

        assert_eq!(before.real_win_chance, 0.20);
        assert_eq!(handle.snapshot().await.real_win_chance, 0.5);
    }

    #[tokio::test]
    async fn test_replace_rejects_invalid() {
        let handle = SettingsHandle::new(GameSettings::default());
        let invalid = GameSettings {
            min_bet: 0,
            ..GameSettings::default()
        };
        assert!(handle.replace(invalid).await.is_err());
        assert_eq!(handle.snapshot().await.min_bet, 50);
    }
}
