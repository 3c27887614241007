use super::{
    errors::{WagerError, WagerResult},
    variants::{ForcedBy, GameVariant, Outcome, Pick},
};
use crate::ledger::{
    Account, AccountId, AccountStore, LedgerError, LedgerResult, Mode, SettledWager, WagerPlan,
    WagerResolver,
};
use crate::money::Cents;
use crate::settings::{GameSettings, SettingsHandle};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::{Arc, Mutex};

/// Settled round: the wager record and the account right after it.
pub type WagerReceipt = SettledWager;

/// Places wagers against the ledger store.
pub struct WagerEngine {
    store: Arc<dyn AccountStore>,
    settings: SettingsHandle,
    rng: Mutex<StdRng>,
}

impl WagerEngine {
    /// Create an engine seeded from the OS
    pub fn new<S: AccountStore + 'static>(store: Arc<S>, settings: SettingsHandle) -> Self {
        Self::with_rng(store, settings, StdRng::from_os_rng())
    }

    /// Create an engine drawing from `rng`
    pub fn with_rng<S: AccountStore + 'static>(
        store: Arc<S>,
        settings: SettingsHandle,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            settings,
            rng: Mutex::new(rng),
        }
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    /// Check a stake against the configured bounds.
    pub fn check_stake(settings: &GameSettings, stake: Cents) -> WagerResult<()> {
        if stake < settings.min_bet || stake > settings.max_bet {
            return Err(WagerError::InvalidStake {
                stake,
                min: settings.min_bet,
                max: settings.max_bet,
            });
        }
        Ok(())
    }

    /// Decide and settle one round.
    ///
    /// # Errors
    ///
    /// - `InvalidStake` if the stake is outside `[min_bet, max_bet]`
    /// - `InvalidPick` if the pick does not fit the game
    /// - `Ledger(InsufficientFunds)` if the selected balance does not cover
    ///   the stake; no random draw happens in that case
    /// - `Ledger(AccountNotFound)` for an unknown account
    pub async fn place_wager(
        &self,
        account_id: AccountId,
        variant: GameVariant,
        stake: Cents,
        mode: Mode,
        pick: Pick,
    ) -> WagerResult<WagerReceipt> {
        let settings = self.settings.snapshot().await;

        Self::check_stake(&settings, stake)?;
        if !variant.accepts(pick) {
            return Err(WagerError::InvalidPick { variant, pick });
        }

        let resolver = RoundResolver {
            variant,
            mode,
            stake,
            pick,
            settings: &settings,
            rng: &self.rng,
        };

        let receipt = self.store.settle_wager(account_id, &resolver).await?;

        log::info!(
            "Wager {} by account {}: {} {} stake {} -> {} payout {}{}",
            receipt.record.id,
            account_id,
            variant,
            mode,
            stake,
            receipt.record.outcome,
            receipt.record.payout,
            receipt
                .record
                .forced_by
                .map(|f| format!(" (forced by {f})"))
                .unwrap_or_default()
        );

        Ok(receipt)
    }
}

/// Decides a round from the locked account snapshot.
struct RoundResolver<'a> {
    variant: GameVariant,
    mode: Mode,
    stake: Cents,
    pick: Pick,
    settings: &'a GameSettings,
    rng: &'a Mutex<StdRng>,
}

impl RoundResolver<'_> {
    fn decide<R: Rng + ?Sized>(&self, account: &Account, rng: &mut R) -> (bool, Option<ForcedBy>) {
        if account.warm_up_wins_remaining > 0 && self.settings.warm_up_scope.covers(self.mode) {
            return (true, Some(ForcedBy::WarmUp));
        }
        if account.consecutive_wins >= self.settings.max_consecutive_wins {
            return (false, Some(ForcedBy::StreakCap));
        }
        let p = self.settings.win_chance(self.mode);
        (rng.random::<f64>() < p, None)
    }
}

impl WagerResolver for RoundResolver<'_> {
    fn resolve(&self, account: &Account) -> LedgerResult<WagerPlan> {
        let available = account.balances.get(self.mode);
        if available < self.stake {
            return Err(LedgerError::insufficient(
                account.id,
                self.mode,
                available,
                self.stake,
            ));
        }

        // A poisoned RNG is still a usable RNG
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let (win, forced_by) = self.decide(account, &mut *rng);
        let (reveal, multiplier) =
            self.variant
                .reveal(self.pick, win, &self.settings.multipliers, &mut *rng);

        let payout = multiplier
            .payout(self.stake)
            .ok_or(LedgerError::BalanceOverflow)?;

        Ok(WagerPlan {
            variant: self.variant,
            mode: self.mode,
            stake: self.stake,
            outcome: if win { Outcome::Win } else { Outcome::Lose },
            payout,
            reveal,
            forced_by,
        })
    }
}
