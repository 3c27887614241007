//! Ledger data models.

use crate::money::Cents;
use crate::wager::{ForcedBy, GameVariant, Outcome, Reveal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform-assigned account identifier (the chat user id).
pub type AccountId = i64;

/// Balance track a wager or adjustment applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Demo,
    Real,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Demo => write!(f, "demo"),
            Mode::Real => write!(f, "real"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "demo" => Ok(Mode::Demo),
            "real" => Ok(Mode::Real),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// Interface language the front end renders in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ru,
    En,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Ru => write!(f, "ru"),
            Language::En => write!(f, "en"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ru" => Ok(Language::Ru),
            "en" => Ok(Language::En),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// Demo and real balance pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub demo: Cents,
    pub real: Cents,
}

impl Balances {
    /// Balance of the given track.
    pub fn get(&self, mode: Mode) -> Cents {
        match mode {
            Mode::Demo => self.demo,
            Mode::Real => self.real,
        }
    }

    /// Apply `delta`, returning `None` on overflow or if either side would go negative.
    pub fn checked_apply(&self, delta: BalanceDelta) -> Option<Balances> {
        let demo = self.demo.checked_add(delta.demo)?;
        let real = self.real.checked_add(delta.real)?;
        (demo >= 0 && real >= 0).then_some(Balances { demo, real })
    }
}

/// Signed change to both balances, applied all-or-nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub demo: Cents,
    pub real: Cents,
}

impl BalanceDelta {
    /// Delta touching a single track.
    pub fn on(mode: Mode, amount: Cents) -> Self {
        match mode {
            Mode::Demo => Self { demo: amount, real: 0 },
            Mode::Real => Self { demo: 0, real: amount },
        }
    }

    /// The track that would go negative first, with the amount it is short.
    pub fn shortfall(&self, balances: &Balances) -> Option<(Mode, Cents, Cents)> {
        if balances.demo.saturating_add(self.demo) < 0 {
            return Some((Mode::Demo, balances.demo, self.demo.saturating_neg()));
        }
        if balances.real.saturating_add(self.real) < 0 {
            return Some((Mode::Real, balances.real, self.real.saturating_neg()));
        }
        None
    }
}

/// Account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: Option<String>,
    pub language: Language,
    /// Set once the player accepts the terms during onboarding
    pub terms_accepted: bool,
    pub balances: Balances,
    pub consecutive_wins: u32,
    pub warm_up_wins_remaining: u32,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub total_won: Cents,
    pub total_lost: Cents,
    pub registered_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Onboarding changes; `None` leaves a field as it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub language: Option<Language>,
    pub terms_accepted: Option<bool>,
}

/// Initial values for accounts created on first contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountDefaults {
    pub demo_balance: Cents,
    pub real_balance: Cents,
    pub warm_up_wins: u32,
}

impl Default for AccountDefaults {
    fn default() -> Self {
        Self {
            demo_balance: 1000,
            real_balance: 0,
            warm_up_wins: 2,
        }
    }
}

/// Why a ledger entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    Wager,
    Deposit,
    WithdrawalEscrow,
    WithdrawalRefund,
    AdminAdjust,
}

impl std::fmt::Display for EntryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryReason::Wager => write!(f, "wager"),
            EntryReason::Deposit => write!(f, "deposit"),
            EntryReason::WithdrawalEscrow => write!(f, "withdrawal_escrow"),
            EntryReason::WithdrawalRefund => write!(f, "withdrawal_refund"),
            EntryReason::AdminAdjust => write!(f, "admin_adjust"),
        }
    }
}

impl std::str::FromStr for EntryReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wager" => Ok(EntryReason::Wager),
            "deposit" => Ok(EntryReason::Deposit),
            "withdrawal_escrow" => Ok(EntryReason::WithdrawalEscrow),
            "withdrawal_refund" => Ok(EntryReason::WithdrawalRefund),
            "admin_adjust" => Ok(EntryReason::AdminAdjust),
            other => Err(format!("unknown entry reason: {other}")),
        }
    }
}

/// Append-only audit entry written with every balance mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub account_id: AccountId,
    pub delta: BalanceDelta,
    pub balances_after: Balances,
    pub reason: EntryReason,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Settled round, append-only.
///
/// `payout` is zero for a loss and `stake * multiplier` for a win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WagerRecord {
    pub id: i64,
    pub account_id: AccountId,
    pub variant: GameVariant,
    pub mode: Mode,
    pub stake: Cents,
    pub outcome: Outcome,
    pub payout: Cents,
    pub reveal: Reveal,
    pub forced_by: Option<ForcedBy>,
    pub played_at: DateTime<Utc>,
}

impl WagerRecord {
    /// Net effect on the wagered balance.
    pub fn net(&self) -> Cents {
        self.payout - self.stake
    }
}

/// Result of a settled wager: the record and the account after the update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledWager {
    pub record: WagerRecord,
    pub account: Account,
}

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Failed,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "pending"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "failed" => Ok(InvoiceStatus::Failed),
            other => Err(format!("unknown invoice status: {other}")),
        }
    }
}

/// Deposit invoice created with the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Provider-assigned invoice id.
    pub id: String,
    pub account_id: AccountId,
    pub amount: Cents,
    pub order_id: String,
    pub pay_url: String,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub id: String,
    pub account_id: AccountId,
    pub amount: Cents,
    pub order_id: String,
    pub pay_url: String,
}

/// Withdrawal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Approved => write!(f, "approved"),
            WithdrawalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(format!("unknown withdrawal status: {other}")),
        }
    }
}

/// Admin decision on a pending withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalDecision {
    Approve,
    Reject,
}

impl WithdrawalDecision {
    /// Terminal status the decision leads to.
    pub fn status(self) -> WithdrawalStatus {
        match self {
            WithdrawalDecision::Approve => WithdrawalStatus::Approved,
            WithdrawalDecision::Reject => WithdrawalStatus::Rejected,
        }
    }
}

/// Withdrawal request. Funds are escrowed while it is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: i64,
    pub account_id: AccountId,
    pub amount: Cents,
    pub wallet: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Support ticket status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Answered,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Pending => write!(f, "pending"),
            TicketStatus::Answered => write!(f, "answered"),
        }
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TicketStatus::Pending),
            "answered" => Ok(TicketStatus::Answered),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

/// Message a user sent to support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: i64,
    pub account_id: AccountId,
    pub message: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

/// Admin reply to a support ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportReply {
    pub id: i64,
    pub ticket_id: i64,
    pub admin_id: AccountId,
    pub reply: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate game statistics for the admin panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    pub total_games: i64,
    pub total_wins: i64,
    pub total_losses: i64,
    pub win_percentage: f64,
    pub loss_percentage: f64,
    pub games_by_variant: Vec<(GameVariant, i64)>,
    /// Real-mode stakes lost by players minus real-mode payouts.
    pub house_profit: Cents,
}

impl GameStats {
    /// Fill in the percentage fields from the counters.
    pub fn with_percentages(mut self) -> Self {
        if self.total_games > 0 {
            self.win_percentage = self.total_wins as f64 / self.total_games as f64 * 100.0;
            self.loss_percentage = self.total_losses as f64 / self.total_games as f64 * 100.0;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_apply_rejects_negative() {
        let balances = Balances { demo: 1000, real: 40 };
        assert_eq!(
            balances.checked_apply(BalanceDelta { demo: -100, real: 10 }),
            Some(Balances { demo: 900, real: 50 })
        );
        assert_eq!(balances.checked_apply(BalanceDelta { demo: 0, real: -41 }), None);
        assert_eq!(balances.checked_apply(BalanceDelta { demo: -1001, real: 100 }), None);
    }

    #[test]
    fn test_shortfall_reports_track() {
        let balances = Balances { demo: 10, real: 40 };
        let delta = BalanceDelta::on(Mode::Real, -50);
        assert_eq!(delta.shortfall(&balances), Some((Mode::Real, 40, 50)));
        assert_eq!(BalanceDelta::on(Mode::Demo, -5).shortfall(&balances), None);
        assert_eq!(
            BalanceDelta::on(Mode::Demo, i64::MIN).shortfall(&balances),
            Some((Mode::Demo, balances.demo, i64::MAX))
        );
    }

    #[test]
    fn test_status_round_trip_strings() {
        assert_eq!("paid".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Paid));
        assert_eq!(WithdrawalStatus::Rejected.to_string(), "rejected");
        assert!("unknown".parse::<EntryReason>().is_err());
    }

    #[test]
    fn test_stats_percentages() {
        let stats = GameStats {
            total_games: 4,
            total_wins: 1,
            total_losses: 3,
            ..Default::default()
        }
        .with_percentages();
        assert_eq!(stats.win_percentage, 25.0);
        assert_eq!(stats.loss_percentage, 75.0);
    }
}
