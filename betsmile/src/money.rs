//! Fixed-point money helpers.
//!
//! Balances, stakes and invoice amounts are integer cents. Multipliers are
//! hundredths, so `Multiplier(190)` pays 1.9x the stake.

use serde::{Deserialize, Serialize};

/// Amount in minor units (1 dollar = 100).
pub type Cents = i64;

/// Cents per whole currency unit.
pub const CENTS_PER_UNIT: Cents = 100;

/// Payout multiplier in hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Multiplier(pub u32);

impl Multiplier {
    /// Multiplier that pays nothing (losing wheel segment).
    pub const ZERO: Multiplier = Multiplier(0);

    /// Payout for `stake`, rounded toward zero.
    ///
    /// Returns `None` when the result does not fit in [`Cents`].
    pub fn payout(self, stake: Cents) -> Option<Cents> {
        let raw = i128::from(stake) * i128::from(self.0) / 100;
        Cents::try_from(raw).ok()
    }

    /// Whether a round paying this multiplier counts as a win.
    pub fn is_winning(self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for Multiplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{whole}x")
        } else if frac % 10 == 0 {
            write!(f, "{whole}.{}x", frac / 10)
        } else {
            write!(f, "{whole}.{frac:02}x")
        }
    }
}

/// Render cents as a dollar string, e.g. `1090` as `"$10.90"`.
pub fn format_cents(amount: Cents) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

/// Convert cents to a decimal number of currency units for external APIs.
pub fn cents_to_units(amount: Cents) -> f64 {
    amount as f64 / CENTS_PER_UNIT as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payout_rounds_toward_zero() {
        assert_eq!(Multiplier(190).payout(100), Some(190));
        assert_eq!(Multiplier(280).payout(55), Some(154));
        assert_eq!(Multiplier(150).payout(1), Some(1));
        assert_eq!(Multiplier::ZERO.payout(5000), Some(0));
    }

    #[test]
    fn test_payout_overflow() {
        assert_eq!(Multiplier(400).payout(Cents::MAX), None);
    }

    #[test]
    fn test_multiplier_display() {
        assert_eq!(Multiplier(400).to_string(), "4x");
        assert_eq!(Multiplier(190).to_string(), "1.9x");
        assert_eq!(Multiplier(125).to_string(), "1.25x");
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(1090), "$10.90");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(-250), "-$2.50");
    }
}
