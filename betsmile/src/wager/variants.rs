use crate::money::Multiplier;
use crate::settings::Multipliers;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Highest number in the guess-the-number game.
pub const GUESS_NUMBER_OPTIONS: u8 = 5;

/// Number of cards in the find-the-card game.
pub const FIND_CARD_OPTIONS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    GuessNumber,
    CoinFlip,
    FindCard,
    Dice,
    Wheel,
}

impl GameVariant {
    pub const ALL: [GameVariant; 5] = [
        GameVariant::GuessNumber,
        GameVariant::CoinFlip,
        GameVariant::FindCard,
        GameVariant::Dice,
        GameVariant::Wheel,
    ];

    /// Whether the player picks something after staking.
    ///
    /// Dice and wheel settle as soon as the stake is placed.
    pub fn needs_pick(self) -> bool {
        matches!(
            self,
            GameVariant::GuessNumber | GameVariant::CoinFlip | GameVariant::FindCard
        )
    }

    pub fn accepts(self, pick: Pick) -> bool {
        match (self, pick) {
            (GameVariant::GuessNumber, Pick::Number(n)) => (1..=GUESS_NUMBER_OPTIONS).contains(&n),
            (GameVariant::CoinFlip, Pick::Coin(_)) => true,
            (GameVariant::FindCard, Pick::Card(n)) => (1..=FIND_CARD_OPTIONS).contains(&n),
            (GameVariant::Dice | GameVariant::Wheel, Pick::None) => true,
            _ => false,
        }
    }

    /// Build the shown result for a decided round.
    ///
    /// Returns the reveal and the multiplier it pays. `pick` must already be
    /// accepted by this variant.
    pub(crate) fn reveal<R: Rng + ?Sized>(
        self,
        pick: Pick,
        win: bool,
        multipliers: &Multipliers,
        rng: &mut R,
    ) -> (Reveal, Multiplier) {
        match (self, pick) {
            (GameVariant::GuessNumber, Pick::Number(picked)) => {
                let target = if win {
                    picked
                } else {
                    other_than(picked, GUESS_NUMBER_OPTIONS, rng)
                };
                (
                    Reveal::Number { picked, target },
                    paid_if(win, multipliers.guess_number),
                )
            }
            (GameVariant::CoinFlip, Pick::Coin(picked)) => {
                let landed = if win { picked } else { picked.flipped() };
                (
                    Reveal::Coin { picked, landed },
                    paid_if(win, multipliers.coin_flip),
                )
            }
            (GameVariant::FindCard, Pick::Card(picked)) => {
                let winning = if win {
                    picked
                } else {
                    other_than(picked, FIND_CARD_OPTIONS, rng)
                };
                (
                    Reveal::Card { picked, winning },
                    paid_if(win, multipliers.find_card),
                )
            }
            (GameVariant::Dice, _) => {
                if win {
                    if rng.random_bool(0.5) {
                        (Reveal::Die { face: 5 }, multipliers.dice_five)
                    } else {
                        (Reveal::Die { face: 6 }, multipliers.dice_six)
                    }
                } else {
                    (
                        Reveal::Die {
                            face: rng.random_range(1..=4),
                        },
                        Multiplier::ZERO,
                    )
                }
            }
            (GameVariant::Wheel, _) => {
                let candidates: Vec<usize> = multipliers
                    .wheel
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.is_winning() == win)
                    .map(|(i, _)| i)
                    .collect();
                // Validated settings always carry both kinds of segment
                let segment = match candidates.len() {
                    0 => 0,
                    len => candidates[rng.random_range(0..len)],
                };
                let multiplier = multipliers
                    .wheel
                    .get(segment)
                    .copied()
                    .unwrap_or(Multiplier::ZERO);
                (Reveal::Wheel { segment, multiplier }, multiplier)
            }
            (variant, pick) => {
                log::warn!("Unchecked pick {pick:?} for {variant}, settling as a loss");
                (Reveal::Nothing, Multiplier::ZERO)
            }
        }
    }
}

fn paid_if(win: bool, multiplier: Multiplier) -> Multiplier {
    if win { multiplier } else { Multiplier::ZERO }
}

/// Uniform value in `1..=options` different from `picked`.
fn other_than<R: Rng + ?Sized>(picked: u8, options: u8, rng: &mut R) -> u8 {
    let drawn = rng.random_range(1..options);
    if drawn >= picked { drawn + 1 } else { drawn }
}

impl std::fmt::Display for GameVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameVariant::GuessNumber => write!(f, "guess_number"),
            GameVariant::CoinFlip => write!(f, "coin_flip"),
            GameVariant::FindCard => write!(f, "find_card"),
            GameVariant::Dice => write!(f, "dice"),
            GameVariant::Wheel => write!(f, "wheel"),
        }
    }
}

impl std::str::FromStr for GameVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guess_number" => Ok(GameVariant::GuessNumber),
            "coin_flip" => Ok(GameVariant::CoinFlip),
            "find_card" => Ok(GameVariant::FindCard),
            "dice" => Ok(GameVariant::Dice),
            "wheel" => Ok(GameVariant::Wheel),
            other => Err(format!("unknown game variant: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl CoinSide {
    pub fn flipped(self) -> Self {
        match self {
            CoinSide::Heads => CoinSide::Tails,
            CoinSide::Tails => CoinSide::Heads,
        }
    }
}

/// What the player chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Pick {
    Number(u8),
    Coin(CoinSide),
    Card(u8),
    None,
}

/// The result shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reveal {
    Number { picked: u8, target: u8 },
    Coin { picked: CoinSide, landed: CoinSide },
    Card { picked: u8, winning: u8 },
    Die { face: u8 },
    Wheel { segment: usize, multiplier: Multiplier },
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Lose => write!(f, "lose"),
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(Outcome::Win),
            "lose" => Ok(Outcome::Lose),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

/// Rule that overrode the random draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcedBy {
    WarmUp,
    StreakCap,
}

impl std::fmt::Display for ForcedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForcedBy::WarmUp => write!(f, "warm_up"),
            ForcedBy::StreakCap => write!(f, "streak_cap"),
        }
    }
}

impl std::str::FromStr for ForcedBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warm_up" => Ok(ForcedBy::WarmUp),
            "streak_cap" => Ok(ForcedBy::StreakCap),
            other => Err(format!("unknown forced_by: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_accepts() {
        assert!(GameVariant::GuessNumber.accepts(Pick::Number(5)));
        assert!(!GameVariant::GuessNumber.accepts(Pick::Number(0)));
        assert!(!GameVariant::GuessNumber.accepts(Pick::Number(6)));
        assert!(GameVariant::FindCard.accepts(Pick::Card(3)));
        assert!(!GameVariant::FindCard.accepts(Pick::Card(4)));
        assert!(GameVariant::Dice.accepts(Pick::None));
        assert!(!GameVariant::Dice.accepts(Pick::Number(3)));
        assert!(!GameVariant::CoinFlip.accepts(Pick::None));
    }

    #[test]
    fn test_losing_reveal_never_matches_pick() {
        let mut rng = StdRng::seed_from_u64(7);
        let multipliers = Multipliers::default();
        for picked in 1..=GUESS_NUMBER_OPTIONS {
            for _ in 0..50 {
                let (reveal, multiplier) =
                    GameVariant::GuessNumber.reveal(Pick::Number(picked), false, &multipliers, &mut rng);
                match reveal {
                    Reveal::Number { target, .. } => {
                        assert_ne!(target, picked);
                        assert!((1..=GUESS_NUMBER_OPTIONS).contains(&target));
                    }
                    other => panic!("unexpected reveal {other:?}"),
                }
                assert_eq!(multiplier, Multiplier::ZERO);
            }
        }
    }

    #[test]
    fn test_winning_reveal_matches_pick() {
        let mut rng = StdRng::seed_from_u64(7);
        let multipliers = Multipliers::default();
        let (reveal, multiplier) =
            GameVariant::FindCard.reveal(Pick::Card(2), true, &multipliers, &mut rng);
        assert_eq!(reveal, Reveal::Card { picked: 2, winning: 2 });
        assert_eq!(multiplier, Multiplier(280));

        let (reveal, _) = GameVariant::CoinFlip.reveal(
            Pick::Coin(CoinSide::Tails),
            false,
            &multipliers,
            &mut rng,
        );
        assert_eq!(
            reveal,
            Reveal::Coin {
                picked: CoinSide::Tails,
                landed: CoinSide::Heads
            }
        );
    }

    #[test]
    fn test_dice_and_wheel_reveals() {
        let mut rng = StdRng::seed_from_u64(11);
        let multipliers = Multipliers::default();
        for _ in 0..100 {
            match GameVariant::Dice.reveal(Pick::None, true, &multipliers, &mut rng) {
                (Reveal::Die { face: 5 }, m) => assert_eq!(m, Multiplier(200)),
                (Reveal::Die { face: 6 }, m) => assert_eq!(m, Multiplier(300)),
                other => panic!("unexpected winning die {other:?}"),
            }
            match GameVariant::Dice.reveal(Pick::None, false, &multipliers, &mut rng) {
                (Reveal::Die { face }, m) => {
                    assert!((1..=4).contains(&face));
                    assert_eq!(m, Multiplier::ZERO);
                }
                other => panic!("unexpected losing die {other:?}"),
            }

            let (reveal, m) = GameVariant::Wheel.reveal(Pick::None, true, &multipliers, &mut rng);
            assert!(m.is_winning());
            assert!(matches!(reveal, Reveal::Wheel { segment, multiplier } if multiplier == multipliers.wheel[segment]));

            let (_, m) = GameVariant::Wheel.reveal(Pick::None, false, &multipliers, &mut rng);
            assert_eq!(m, Multiplier::ZERO);
        }
    }

    #[test]
    fn test_variant_round_trips_through_str() {
        for variant in GameVariant::ALL {
            assert_eq!(variant.to_string().parse::<GameVariant>(), Ok(variant));
        }
        assert!("roulette".parse::<GameVariant>().is_err());
    }
}
