use super::errors::ErrorKind;
use crate::ledger::{
    Account, AccountId, Balances, GameStats, Language, SupportReply, SupportTicket, WagerRecord,
    WithdrawalRequest,
};
use crate::money::Cents;
use crate::settings::GameSettings;
use crate::wager::{GameVariant, Pick};
use crate::Mode;
use serde::{Deserialize, Serialize};

/// What the player (or admin) asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// First contact or main menu
    Start {
        #[serde(default)]
        username: Option<String>,
    },
    SetLanguage {
        language: Language,
    },
    /// The player accepted the terms shown during onboarding
    AcceptTerms,
    SelectMode {
        mode: Mode,
    },
    SelectGame {
        variant: GameVariant,
    },
    EnterStake {
        amount: Cents,
    },
    Pick {
        pick: Pick,
    },
    Profile,
    History {
        #[serde(default)]
        limit: Option<i64>,
    },
    Deposit {
        amount: Cents,
    },
    Withdraw {
        amount: Cents,
        wallet: String,
    },
    Support {
        message: String,
    },
    /// Drop any in-progress selection
    Cancel,
    Admin(AdminIntent),
}

/// Privileged requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminIntent {
    ListAccounts {
        #[serde(default)]
        limit: Option<i64>,
    },
    Stats,
    PendingWithdrawals,
    ApproveWithdrawal {
        withdrawal_id: i64,
    },
    RejectWithdrawal {
        withdrawal_id: i64,
    },
    AdjustBalance {
        account_id: AccountId,
        mode: Mode,
        amount: Cents,
    },
    ShowSettings,
    UpdateSettings {
        settings: GameSettings,
    },
    PendingTickets,
    ReplyTicket {
        ticket_id: i64,
        reply: String,
    },
}

/// Result payload for the front end to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Welcome {
        account: Account,
        created: bool,
        games: Vec<GameVariant>,
    },
    ModeSelected {
        mode: Mode,
        balance: Cents,
    },
    GameSelected {
        variant: GameVariant,
        mode: Mode,
        min_bet: Cents,
        max_bet: Cents,
        balance: Cents,
    },
    /// Stake accepted; the game needs a pick to settle
    PickNeeded {
        variant: GameVariant,
        stake: Cents,
    },
    WagerSettled {
        record: WagerRecord,
        balances: Balances,
        warm_up_wins_remaining: u32,
    },
    Profile {
        account: Account,
    },
    History {
        wagers: Vec<WagerRecord>,
    },
    InvoiceCreated {
        invoice_id: String,
        amount: Cents,
        pay_url: String,
    },
    WithdrawalRequested {
        request: WithdrawalRequest,
        balances: Balances,
    },
    TicketOpened {
        ticket_id: i64,
    },
    Cancelled,
    Accounts {
        accounts: Vec<Account>,
    },
    Stats {
        stats: GameStats,
    },
    Withdrawals {
        requests: Vec<WithdrawalRequest>,
    },
    WithdrawalResolved {
        request: WithdrawalRequest,
        balances: Balances,
    },
    BalanceAdjusted {
        account_id: AccountId,
        balances: Balances,
    },
    Settings {
        settings: GameSettings,
    },
    SettingsUpdated,
    Tickets {
        tickets: Vec<SupportTicket>,
    },
    TicketAnswered {
        ticket: SupportTicket,
        reply: SupportReply,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}
