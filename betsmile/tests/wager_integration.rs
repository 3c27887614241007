//! Integration tests for the wager engine against the in-memory store.
//!
//! Win chances of 0.0 and 1.0 make every unforced draw deterministic.

mod common;

use betsmile::ledger::{AccountStore, LedgerError, MemoryStore};
use betsmile::settings::{GameSettings, SettingsHandle, WarmUpScope};
use betsmile::wager::{CoinSide, ForcedBy, GameVariant, Outcome, Pick, Reveal, WagerEngine, WagerError};
use betsmile::{Cents, Mode, Multiplier};
use std::sync::Arc;

async fn setup(settings: GameSettings, demo: Cents, real: Cents) -> (Arc<MemoryStore>, Arc<WagerEngine>) {
    let store = Arc::new(MemoryStore::new());
    common::open_account(&store, 1, &settings, demo, real).await;
    let engine = Arc::new(WagerEngine::new(store.clone(), SettingsHandle::new(settings)));
    (store, engine)
}

fn heads() -> Pick {
    Pick::Coin(CoinSide::Heads)
}

#[tokio::test]
async fn test_new_account_warm_up_coin_flip() {
    // Even a zero win chance cannot beat the warm-up
    let settings = GameSettings {
        demo_win_chance: 0.0,
        ..GameSettings::default()
    };
    let (_, engine) = setup(settings, 1_000, 0).await;

    let receipt = engine
        .place_wager(1, GameVariant::CoinFlip, 100, Mode::Demo, heads())
        .await
        .unwrap();

    assert_eq!(receipt.record.outcome, Outcome::Win);
    assert_eq!(receipt.record.payout, 190);
    assert_eq!(receipt.account.balances.demo, 1_090);
    assert_eq!(receipt.account.warm_up_wins_remaining, 1);
}

#[tokio::test]
async fn test_warm_up_law() {
    let settings = GameSettings {
        demo_win_chance: 0.0,
        max_consecutive_wins: 5,
        ..GameSettings::default()
    };
    let (_, engine) = setup(settings, 1_000, 0).await;

    for remaining in [1, 0] {
        let receipt = engine
            .place_wager(1, GameVariant::FindCard, 100, Mode::Demo, Pick::Card(2))
            .await
            .unwrap();
        assert_eq!(receipt.record.outcome, Outcome::Win);
        assert_eq!(receipt.record.forced_by, Some(ForcedBy::WarmUp));
        assert_eq!(receipt.account.warm_up_wins_remaining, remaining);
    }

    let receipt = engine
        .place_wager(1, GameVariant::FindCard, 100, Mode::Demo, Pick::Card(2))
        .await
        .unwrap();
    assert_eq!(receipt.record.outcome, Outcome::Lose);
    assert_eq!(receipt.record.forced_by, None);
    assert_eq!(receipt.account.warm_up_wins_remaining, 0);
}

#[tokio::test]
async fn test_warm_up_scope_excludes_other_mode() {
    let settings = GameSettings {
        real_win_chance: 0.0,
        warm_up_scope: WarmUpScope::Demo,
        ..GameSettings::default()
    };
    let (store, engine) = setup(settings, 1_000, 1_000).await;

    let receipt = engine
        .place_wager(1, GameVariant::CoinFlip, 100, Mode::Real, heads())
        .await
        .unwrap();
    assert_eq!(receipt.record.outcome, Outcome::Lose);
    assert_eq!(store.get_account(1).await.unwrap().warm_up_wins_remaining, 2);
}

#[tokio::test]
async fn test_streak_cap_overrides_draw() {
    let settings = GameSettings {
        max_consecutive_wins: 2,
        ..common::always_win()
    };
    let (_, engine) = setup(settings, 1_000, 0).await;

    for streak in 1..=2 {
        let receipt = engine
            .place_wager(1, GameVariant::CoinFlip, 100, Mode::Demo, heads())
            .await
            .unwrap();
        assert_eq!(receipt.record.outcome, Outcome::Win);
        assert_eq!(receipt.account.consecutive_wins, streak);
    }

    let receipt = engine
        .place_wager(1, GameVariant::CoinFlip, 100, Mode::Demo, heads())
        .await
        .unwrap();
    assert_eq!(receipt.record.outcome, Outcome::Lose);
    assert_eq!(receipt.record.forced_by, Some(ForcedBy::StreakCap));
    assert_eq!(receipt.record.payout, 0);
    assert_eq!(receipt.account.consecutive_wins, 0);
    assert_eq!(
        receipt.record.reveal,
        Reveal::Coin {
            picked: CoinSide::Heads,
            landed: CoinSide::Tails
        }
    );
}

#[tokio::test]
async fn test_payout_law_every_variant() {
    let settings = common::always_win();
    let multipliers = settings.multipliers.clone();
    let (store, engine) = setup(settings, 100_000, 0).await;

    let rounds = [
        (GameVariant::GuessNumber, Pick::Number(3)),
        (GameVariant::CoinFlip, heads()),
        (GameVariant::FindCard, Pick::Card(1)),
        (GameVariant::Dice, Pick::None),
        (GameVariant::Wheel, Pick::None),
    ];

    for (variant, pick) in rounds {
        let before = store.get_balances(1).await.unwrap().demo;
        let receipt = engine
            .place_wager(1, variant, 250, Mode::Demo, pick)
            .await
            .unwrap();

        let multiplier = match (&receipt.record.reveal, variant) {
            (_, GameVariant::GuessNumber) => multipliers.guess_number,
            (_, GameVariant::CoinFlip) => multipliers.coin_flip,
            (_, GameVariant::FindCard) => multipliers.find_card,
            (Reveal::Die { face: 5 }, _) => multipliers.dice_five,
            (Reveal::Die { face: 6 }, _) => multipliers.dice_six,
            (Reveal::Wheel { multiplier, .. }, _) => *multiplier,
            (reveal, _) => panic!("unexpected reveal {reveal:?}"),
        };
        assert!(multiplier > Multiplier::ZERO);

        let expected_payout = multiplier.payout(250).unwrap();
        assert_eq!(receipt.record.outcome, Outcome::Win);
        assert_eq!(receipt.record.payout, expected_payout);
        assert_eq!(receipt.account.balances.demo, before - 250 + expected_payout);
    }
}

#[tokio::test]
async fn test_loss_law_every_variant() {
    let (store, engine) = setup(common::always_lose(), 10_000, 0).await;

    let rounds = [
        (GameVariant::GuessNumber, Pick::Number(3)),
        (GameVariant::CoinFlip, heads()),
        (GameVariant::FindCard, Pick::Card(1)),
        (GameVariant::Dice, Pick::None),
        (GameVariant::Wheel, Pick::None),
    ];

    for (variant, pick) in rounds {
        let before = store.get_balances(1).await.unwrap().demo;
        let receipt = engine
            .place_wager(1, variant, 100, Mode::Demo, pick)
            .await
            .unwrap();
        assert_eq!(receipt.record.outcome, Outcome::Lose);
        assert_eq!(receipt.record.payout, 0);
        assert_eq!(receipt.account.balances.demo, before - 100);

        match receipt.record.reveal {
            Reveal::Number { picked, target } => assert_ne!(picked, target),
            Reveal::Card { picked, winning } => assert_ne!(picked, winning),
            Reveal::Coin { picked, landed } => assert_ne!(picked, landed),
            Reveal::Die { face } => assert!(face <= 4),
            Reveal::Wheel { multiplier, .. } => assert_eq!(multiplier, Multiplier::ZERO),
            Reveal::Nothing => panic!("missing reveal"),
        }
    }
}

#[tokio::test]
async fn test_insufficient_funds_rejected_before_draw() {
    let (store, engine) = setup(GameSettings::default(), 1_000, 0).await;

    let err = engine
        .place_wager(1, GameVariant::CoinFlip, 1_001, Mode::Demo, heads())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WagerError::Ledger(LedgerError::InsufficientFunds { required: 1_001, .. })
    ));

    // The warm-up win was not consumed and nothing was recorded
    let account = store.get_account(1).await.unwrap();
    assert_eq!(account.balances.demo, 1_000);
    assert_eq!(account.warm_up_wins_remaining, 2);
    assert!(store.wagers(1, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mode_is_never_inferred() {
    // Plenty of demo funds do not cover a real stake
    let (_, engine) = setup(GameSettings::default(), 100_000, 0).await;
    let err = engine
        .place_wager(1, GameVariant::Dice, 100, Mode::Real, Pick::None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WagerError::Ledger(LedgerError::InsufficientFunds { mode: Mode::Real, .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_losses_match_serial_result() {
    let (store, engine) = setup(common::always_lose(), 1_000, 0).await;

    let mut handles = Vec::new();
    for _ in 0..50 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .place_wager(1, GameVariant::Dice, 50, Mode::Demo, Pick::None)
                .await
        }));
    }

    let mut settled = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => settled += 1,
            Err(WagerError::Ledger(LedgerError::InsufficientFunds { .. })) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(settled, 20);
    assert_eq!(rejected, 30);
    let account = store.get_account(1).await.unwrap();
    assert_eq!(account.balances.demo, 0);
    assert_eq!(account.games_played, 20);
    assert_eq!(store.wagers(1, 100).await.unwrap().len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wins_match_serial_result() {
    let (store, engine) = setup(common::always_win(), 1_000, 0).await;

    let mut handles = Vec::new();
    for _ in 0..50 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .place_wager(1, GameVariant::CoinFlip, 100, Mode::Demo, heads())
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let account = store.get_account(1).await.unwrap();
    assert_eq!(account.balances.demo, 1_000 + 50 * 90);
    assert_eq!(account.consecutive_wins, 50);
    assert_eq!(account.total_won, 50 * 190);
}

#[tokio::test]
async fn test_stats_track_house_profit_on_real_only() {
    let (store, engine) = setup(common::always_lose(), 1_000, 1_000).await;

    engine
        .place_wager(1, GameVariant::Dice, 100, Mode::Real, Pick::None)
        .await
        .unwrap();
    engine
        .place_wager(1, GameVariant::Dice, 100, Mode::Demo, Pick::None)
        .await
        .unwrap();

    let stats = store.game_stats().await.unwrap();
    assert_eq!(stats.total_games, 2);
    assert_eq!(stats.total_losses, 2);
    assert_eq!(stats.loss_percentage, 100.0);
    assert_eq!(stats.house_profit, 100);
    assert_eq!(stats.games_by_variant, vec![(GameVariant::Dice, 2)]);
}
