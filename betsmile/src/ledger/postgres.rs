//! PostgreSQL ledger backend.
//!
//! Every mutating operation runs in one transaction. Balance checks are folded
//! into conditional `UPDATE ... RETURNING` statements so that a concurrent
//! writer can never observe or produce a negative balance, and wager
//! settlement holds a `FOR UPDATE` row lock while the round is resolved.

use super::{
    errors::{LedgerError, LedgerResult},
    models::{
        Account, AccountDefaults, AccountId, BalanceDelta, Balances, EntryReason, GameStats,
        Invoice, LedgerEntry, NewInvoice, ProfileUpdate, SettledWager, SupportReply,
        SupportTicket, WagerRecord, WithdrawalDecision, WithdrawalRequest,
    },
    store::{
        AccountStore, InvoiceStore, SettingsStore, SupportStore, WagerResolver, WithdrawalStore,
        apply_plan,
    },
};
use crate::db::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_timeout};
use crate::money::Cents;
use crate::settings::GameSettings;
use crate::wager::GameVariant;
use async_trait::async_trait;
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::PgRow,
};
use std::{fmt::Display, str::FromStr, sync::Arc, time::Duration};

const ACCOUNT_COLUMNS: &str = "id, username, language, terms_accepted, demo_balance, real_balance, consecutive_wins, \
     warm_up_wins_remaining, games_played, wins, losses, total_won, total_lost, \
     registered_at, last_active";

const SETTINGS_KEY: &str = "game";

/// PostgreSQL store
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PgStore {
    /// Create a new store over a connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }

    /// Override the per-operation transaction timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply `delta` inside `tx` and append the audit entry.
    ///
    /// The balance check and the write are one statement; when no row comes
    /// back the follow-up read only decides which error to report.
    async fn apply_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        account_id: AccountId,
        delta: BalanceDelta,
        reason: EntryReason,
        reference: Option<String>,
    ) -> LedgerResult<Balances> {
        let updated = sqlx::query(
            "UPDATE accounts
             SET demo_balance = demo_balance + $1,
                 real_balance = real_balance + $2,
                 last_active = NOW()
             WHERE id = $3 AND demo_balance + $1 >= 0 AND real_balance + $2 >= 0
             RETURNING demo_balance, real_balance",
        )
        .bind(delta.demo)
        .bind(delta.real)
        .bind(account_id)
        .fetch_optional(&mut **tx)
        .await?;

        let balances = match updated {
            Some(row) => balances_from_row(&row)?,
            None => {
                let current = sqlx::query("SELECT demo_balance, real_balance FROM accounts WHERE id = $1")
                    .bind(account_id)
                    .fetch_optional(&mut **tx)
                    .await?
                    .ok_or(LedgerError::AccountNotFound(account_id))?;
                let current = balances_from_row(&current)?;

                return Err(match delta.shortfall(&current) {
                    Some((mode, available, required)) => {
                        LedgerError::insufficient(account_id, mode, available, required)
                    }
                    None => LedgerError::BalanceOverflow,
                });
            }
        };

        Self::insert_entry(tx, account_id, delta, balances, reason, reference).await?;

        Ok(balances)
    }

    async fn insert_entry(
        tx: &mut Transaction<'_, Postgres>,
        account_id: AccountId,
        delta: BalanceDelta,
        balances_after: Balances,
        reason: EntryReason,
        reference: Option<String>,
    ) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO ledger_entries
                (account_id, demo_delta, real_delta, demo_after, real_after, reason, reference)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(account_id)
        .bind(delta.demo)
        .bind(delta.real)
        .bind(balances_after.demo)
        .bind(balances_after.real)
        .bind(reason.to_string())
        .bind(reference)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn current_balances(
        tx: &mut Transaction<'_, Postgres>,
        account_id: AccountId,
    ) -> LedgerResult<Balances> {
        let row = sqlx::query("SELECT demo_balance, real_balance FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        balances_from_row(&row)
    }
}

fn parse_column<T>(raw: &str) -> LedgerResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e: T::Err| LedgerError::Corrupt(e.to_string()))
}

fn counter(row: &PgRow, column: &str) -> LedgerResult<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value).map_err(|_| LedgerError::Corrupt(format!("{column} out of range: {value}")))
}

fn timestamp(row: &PgRow, column: &str) -> LedgerResult<chrono::DateTime<chrono::Utc>> {
    Ok(row.try_get::<chrono::NaiveDateTime, _>(column)?.and_utc())
}

fn balances_from_row(row: &PgRow) -> LedgerResult<Balances> {
    Ok(Balances {
        demo: row.try_get("demo_balance")?,
        real: row.try_get("real_balance")?,
    })
}

fn account_from_row(row: &PgRow) -> LedgerResult<Account> {
    let language: String = row.try_get("language")?;
    Ok(Account {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        language: parse_column(&language)?,
        terms_accepted: row.try_get("terms_accepted")?,
        balances: balances_from_row(row)?,
        consecutive_wins: counter(row, "consecutive_wins")?,
        warm_up_wins_remaining: counter(row, "warm_up_wins_remaining")?,
        games_played: counter(row, "games_played")?,
        wins: counter(row, "wins")?,
        losses: counter(row, "losses")?,
        total_won: row.try_get("total_won")?,
        total_lost: row.try_get("total_lost")?,
        registered_at: timestamp(row, "registered_at")?,
        last_active: timestamp(row, "last_active")?,
    })
}

fn entry_from_row(row: &PgRow) -> LedgerResult<LedgerEntry> {
    let reason: String = row.try_get("reason")?;
    Ok(LedgerEntry {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        delta: BalanceDelta {
            demo: row.try_get("demo_delta")?,
            real: row.try_get("real_delta")?,
        },
        balances_after: Balances {
            demo: row.try_get("demo_after")?,
            real: row.try_get("real_after")?,
        },
        reason: parse_column(&reason)?,
        reference: row.try_get("reference")?,
        created_at: timestamp(row, "created_at")?,
    })
}

fn wager_from_row(row: &PgRow) -> LedgerResult<WagerRecord> {
    let variant: String = row.try_get("variant")?;
    let mode: String = row.try_get("mode")?;
    let outcome: String = row.try_get("outcome")?;
    let reveal: String = row.try_get("reveal")?;
    let forced_by: Option<String> = row.try_get("forced_by")?;

    Ok(WagerRecord {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        variant: parse_column(&variant)?,
        mode: parse_column(&mode)?,
        stake: row.try_get("stake")?,
        outcome: parse_column(&outcome)?,
        payout: row.try_get("payout")?,
        reveal: serde_json::from_str(&reveal).map_err(|e| LedgerError::Corrupt(e.to_string()))?,
        forced_by: forced_by.as_deref().map(parse_column).transpose()?,
        played_at: timestamp(row, "played_at")?,
    })
}

fn invoice_from_row(row: &PgRow) -> LedgerResult<Invoice> {
    let status: String = row.try_get("status")?;
    Ok(Invoice {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        amount: row.try_get("amount")?,
        order_id: row.try_get("order_id")?,
        pay_url: row.try_get("pay_url")?,
        status: parse_column(&status)?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

fn withdrawal_from_row(row: &PgRow) -> LedgerResult<WithdrawalRequest> {
    let status: String = row.try_get("status")?;
    Ok(WithdrawalRequest {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        amount: row.try_get("amount")?,
        wallet: row.try_get("wallet")?,
        status: parse_column(&status)?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

fn ticket_from_row(row: &PgRow) -> LedgerResult<SupportTicket> {
    let status: String = row.try_get("status")?;
    Ok(SupportTicket {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        message: row.try_get("message")?,
        status: parse_column(&status)?,
        created_at: timestamp(row, "created_at")?,
    })
}

#[async_trait]
impl AccountStore for PgStore {
    async fn open_account(
        &self,
        account_id: AccountId,
        username: Option<&str>,
        defaults: &AccountDefaults,
    ) -> LedgerResult<(Account, bool)> {
        with_timeout(self.timeout, async {
            // xmax = 0 only for freshly inserted rows
            let row = sqlx::query(&format!(
                "INSERT INTO accounts (id, username, demo_balance, real_balance, warm_up_wins_remaining)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO UPDATE SET
                    username = COALESCE(EXCLUDED.username, accounts.username),
                    last_active = NOW()
                 RETURNING {ACCOUNT_COLUMNS}, (xmax = 0) AS created"
            ))
            .bind(account_id)
            .bind(username)
            .bind(defaults.demo_balance)
            .bind(defaults.real_balance)
            .bind(i64::from(defaults.warm_up_wins))
            .fetch_one(self.pool.as_ref())
            .await?;

            let created: bool = row.try_get("created")?;
            Ok((account_from_row(&row)?, created))
        })
        .await
    }

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(account_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        account_from_row(&row)
    }

    async fn update_profile(
        &self,
        account_id: AccountId,
        update: ProfileUpdate,
    ) -> LedgerResult<Account> {
        with_timeout(self.timeout, async {
            let row = sqlx::query(&format!(
                "UPDATE accounts SET
                    language = COALESCE($2, language),
                    terms_accepted = COALESCE($3, terms_accepted),
                    last_active = NOW()
                 WHERE id = $1
                 RETURNING {ACCOUNT_COLUMNS}"
            ))
            .bind(account_id)
            .bind(update.language.map(|l| l.to_string()))
            .bind(update.terms_accepted)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
            account_from_row(&row)
        })
        .await
    }

    async fn list_accounts(&self, limit: i64) -> LedgerResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY registered_at DESC, id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(account_from_row).collect()
    }

    async fn apply_delta(
        &self,
        account_id: AccountId,
        delta: BalanceDelta,
        reason: EntryReason,
        reference: Option<String>,
    ) -> LedgerResult<Balances> {
        with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            let balances = Self::apply_in_tx(&mut tx, account_id, delta, reason, reference).await?;
            tx.commit().await?;
            Ok(balances)
        })
        .await
    }

    async fn settle_wager(
        &self,
        account_id: AccountId,
        resolver: &dyn WagerResolver,
    ) -> LedgerResult<SettledWager> {
        with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
            ))
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
            let account = account_from_row(&row)?;

            let plan = resolver.resolve(&account)?;
            let next = apply_plan(&account, &plan)?;

            let updated = sqlx::query(&format!(
                "UPDATE accounts
                 SET demo_balance = $2, real_balance = $3, consecutive_wins = $4,
                     warm_up_wins_remaining = $5, games_played = $6, wins = $7, losses = $8,
                     total_won = $9, total_lost = $10, last_active = NOW()
                 WHERE id = $1
                 RETURNING {ACCOUNT_COLUMNS}"
            ))
            .bind(account_id)
            .bind(next.balances.demo)
            .bind(next.balances.real)
            .bind(i64::from(next.consecutive_wins))
            .bind(i64::from(next.warm_up_wins_remaining))
            .bind(i64::from(next.games_played))
            .bind(i64::from(next.wins))
            .bind(i64::from(next.losses))
            .bind(next.total_won)
            .bind(next.total_lost)
            .fetch_one(&mut *tx)
            .await?;
            let account = account_from_row(&updated)?;

            let reveal =
                serde_json::to_string(&plan.reveal).map_err(|e| LedgerError::Corrupt(e.to_string()))?;
            let wager_row = sqlx::query(
                "INSERT INTO wagers
                    (account_id, variant, mode, stake, outcome, payout, reveal, forced_by)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING *",
            )
            .bind(account_id)
            .bind(plan.variant.to_string())
            .bind(plan.mode.to_string())
            .bind(plan.stake)
            .bind(plan.outcome.to_string())
            .bind(plan.payout)
            .bind(reveal)
            .bind(plan.forced_by.map(|f| f.to_string()))
            .fetch_one(&mut *tx)
            .await?;
            let record = wager_from_row(&wager_row)?;

            Self::insert_entry(
                &mut tx,
                account_id,
                plan.delta(),
                account.balances,
                EntryReason::Wager,
                Some(format!("wager:{}", record.id)),
            )
            .await?;

            tx.commit().await?;

            Ok(SettledWager { record, account })
        })
        .await
    }

    async fn entries(&self, account_id: AccountId, limit: i64) -> LedgerResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM ledger_entries WHERE account_id = $1 ORDER BY id DESC LIMIT $2",
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn wagers(&self, account_id: AccountId, limit: i64) -> LedgerResult<Vec<WagerRecord>> {
        let rows = sqlx::query("SELECT * FROM wagers WHERE account_id = $1 ORDER BY id DESC LIMIT $2")
            .bind(account_id)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?;

        rows.iter().map(wager_from_row).collect()
    }

    async fn game_stats(&self) -> LedgerResult<GameStats> {
        let totals = sqlx::query(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE outcome = 'win') AS wins,
                COUNT(*) FILTER (WHERE outcome = 'lose') AS losses,
                COALESCE(SUM(CASE WHEN outcome = 'lose' THEN stake ELSE -payout END)
                    FILTER (WHERE mode = 'real'), 0)::BIGINT AS house_profit
             FROM wagers",
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        let by_variant = sqlx::query(
            "SELECT variant, COUNT(*) AS games FROM wagers GROUP BY variant ORDER BY variant",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        let games_by_variant = by_variant
            .iter()
            .map(|row| -> LedgerResult<(GameVariant, i64)> {
                let variant: String = row.try_get("variant")?;
                Ok((parse_column(&variant)?, row.try_get::<i64, _>("games")?))
            })
            .collect::<LedgerResult<Vec<_>>>()?;

        let stats = GameStats {
            total_games: totals.try_get("total")?,
            total_wins: totals.try_get("wins")?,
            total_losses: totals.try_get("losses")?,
            games_by_variant,
            house_profit: totals.try_get("house_profit")?,
            ..GameStats::default()
        };

        Ok(stats.with_percentages())
    }

    async fn health_check(&self) -> LedgerResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for PgStore {
    async fn insert_invoice(&self, invoice: NewInvoice) -> LedgerResult<Invoice> {
        if invoice.amount <= 0 {
            return Err(LedgerError::InvalidAmount(invoice.amount));
        }

        let row = sqlx::query(
            "INSERT INTO invoices (id, account_id, amount, order_id, pay_url)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(&invoice.id)
        .bind(invoice.account_id)
        .bind(invoice.amount)
        .bind(&invoice.order_id)
        .bind(&invoice.pay_url)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                LedgerError::AccountNotFound(invoice.account_id)
            }
            _ => LedgerError::Database(e),
        })?;

        invoice_from_row(&row)
    }

    async fn get_invoice(&self, invoice_id: &str) -> LedgerResult<Invoice> {
        let row = sqlx::query("SELECT * FROM invoices WHERE id = $1")
            .bind(invoice_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or_else(|| LedgerError::InvoiceNotFound(invoice_id.to_string()))?;

        invoice_from_row(&row)
    }

    async fn pending_invoices(&self) -> LedgerResult<Vec<Invoice>> {
        let rows = sqlx::query("SELECT * FROM invoices WHERE status = 'pending' ORDER BY created_at, id")
            .fetch_all(self.pool.as_ref())
            .await?;

        rows.iter().map(invoice_from_row).collect()
    }

    async fn settle_invoice(&self, invoice_id: &str) -> LedgerResult<(Invoice, Balances)> {
        with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            // The status guard makes a second settlement a no-op
            let row = sqlx::query(
                "UPDATE invoices SET status = 'paid', updated_at = NOW()
                 WHERE id = $1 AND status = 'pending'
                 RETURNING *",
            )
            .bind(invoice_id)
            .fetch_optional(&mut *tx)
            .await?;

            let invoice = match row {
                Some(row) => invoice_from_row(&row)?,
                None => {
                    let exists = sqlx::query("SELECT 1 FROM invoices WHERE id = $1")
                        .bind(invoice_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                    return Err(match exists {
                        Some(_) => LedgerError::InvoiceAlreadySettled(invoice_id.to_string()),
                        None => LedgerError::InvoiceNotFound(invoice_id.to_string()),
                    });
                }
            };

            let balances = Self::apply_in_tx(
                &mut tx,
                invoice.account_id,
                BalanceDelta {
                    demo: 0,
                    real: invoice.amount,
                },
                EntryReason::Deposit,
                Some(format!("invoice:{}", invoice.id)),
            )
            .await?;

            tx.commit().await?;

            Ok((invoice, balances))
        })
        .await
    }

    async fn fail_invoice(&self, invoice_id: &str) -> LedgerResult<Invoice> {
        let row = sqlx::query(
            "UPDATE invoices SET status = 'failed', updated_at = NOW()
             WHERE id = $1 AND status = 'pending'
             RETURNING *",
        )
        .bind(invoice_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match row {
            Some(row) => invoice_from_row(&row),
            None => match self.get_invoice(invoice_id).await {
                Ok(_) => Err(LedgerError::InvoiceAlreadySettled(invoice_id.to_string())),
                Err(e) => Err(e),
            },
        }
    }
}

#[async_trait]
impl WithdrawalStore for PgStore {
    async fn open_withdrawal(
        &self,
        account_id: AccountId,
        amount: Cents,
        wallet: &str,
    ) -> LedgerResult<(WithdrawalRequest, Balances)> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let exists = sqlx::query("SELECT 1 FROM accounts WHERE id = $1")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(LedgerError::AccountNotFound(account_id));
            }

            let row = sqlx::query(
                "INSERT INTO withdrawals (account_id, amount, wallet)
                 VALUES ($1, $2, $3)
                 RETURNING *",
            )
            .bind(account_id)
            .bind(amount)
            .bind(wallet)
            .fetch_one(&mut *tx)
            .await?;
            let request = withdrawal_from_row(&row)?;

            // An insufficient balance here drops the transaction, taking the
            // request row with it.
            let balances = Self::apply_in_tx(
                &mut tx,
                account_id,
                BalanceDelta { demo: 0, real: -amount },
                EntryReason::WithdrawalEscrow,
                Some(format!("withdrawal:{}", request.id)),
            )
            .await?;

            tx.commit().await?;

            Ok((request, balances))
        })
        .await
    }

    async fn get_withdrawal(&self, withdrawal_id: i64) -> LedgerResult<WithdrawalRequest> {
        let row = sqlx::query("SELECT * FROM withdrawals WHERE id = $1")
            .bind(withdrawal_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(LedgerError::WithdrawalNotFound(withdrawal_id))?;

        withdrawal_from_row(&row)
    }

    async fn pending_withdrawals(&self) -> LedgerResult<Vec<WithdrawalRequest>> {
        let rows = sqlx::query("SELECT * FROM withdrawals WHERE status = 'pending' ORDER BY id DESC")
            .fetch_all(self.pool.as_ref())
            .await?;

        rows.iter().map(withdrawal_from_row).collect()
    }

    async fn resolve_withdrawal(
        &self,
        withdrawal_id: i64,
        decision: WithdrawalDecision,
    ) -> LedgerResult<(WithdrawalRequest, Balances)> {
        with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(
                "UPDATE withdrawals SET status = $2, updated_at = NOW()
                 WHERE id = $1 AND status = 'pending'
                 RETURNING *",
            )
            .bind(withdrawal_id)
            .bind(decision.status().to_string())
            .fetch_optional(&mut *tx)
            .await?;

            let request = match row {
                Some(row) => withdrawal_from_row(&row)?,
                None => {
                    let current = sqlx::query("SELECT status FROM withdrawals WHERE id = $1")
                        .bind(withdrawal_id)
                        .fetch_optional(&mut *tx)
                        .await?
                        .ok_or(LedgerError::WithdrawalNotFound(withdrawal_id))?;
                    let status: String = current.try_get("status")?;
                    return Err(LedgerError::WithdrawalAlreadyResolved {
                        id: withdrawal_id,
                        status: parse_column(&status)?,
                    });
                }
            };

            let balances = match decision {
                WithdrawalDecision::Approve => {
                    Self::current_balances(&mut tx, request.account_id).await?
                }
                WithdrawalDecision::Reject => {
                    Self::apply_in_tx(
                        &mut tx,
                        request.account_id,
                        BalanceDelta {
                            demo: 0,
                            real: request.amount,
                        },
                        EntryReason::WithdrawalRefund,
                        Some(format!("withdrawal:{}", request.id)),
                    )
                    .await?
                }
            };

            tx.commit().await?;

            Ok((request, balances))
        })
        .await
    }
}

#[async_trait]
impl SupportStore for PgStore {
    async fn open_ticket(&self, account_id: AccountId, message: &str) -> LedgerResult<SupportTicket> {
        let row = sqlx::query(
            "INSERT INTO support_tickets (account_id, message) VALUES ($1, $2) RETURNING *",
        )
        .bind(account_id)
        .bind(message)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                LedgerError::AccountNotFound(account_id)
            }
            _ => LedgerError::Database(e),
        })?;

        ticket_from_row(&row)
    }

    async fn get_ticket(&self, ticket_id: i64) -> LedgerResult<SupportTicket> {
        let row = sqlx::query("SELECT * FROM support_tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(LedgerError::TicketNotFound(ticket_id))?;

        ticket_from_row(&row)
    }

    async fn pending_tickets(&self) -> LedgerResult<Vec<SupportTicket>> {
        let rows = sqlx::query("SELECT * FROM support_tickets WHERE status = 'pending' ORDER BY id")
            .fetch_all(self.pool.as_ref())
            .await?;

        rows.iter().map(ticket_from_row).collect()
    }

    async fn answer_ticket(
        &self,
        ticket_id: i64,
        admin_id: AccountId,
        reply: &str,
    ) -> LedgerResult<(SupportTicket, SupportReply)> {
        with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(
                "UPDATE support_tickets SET status = 'answered' WHERE id = $1 RETURNING *",
            )
            .bind(ticket_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::TicketNotFound(ticket_id))?;
            let ticket = ticket_from_row(&row)?;

            let reply_row = sqlx::query(
                "INSERT INTO support_replies (ticket_id, admin_id, reply)
                 VALUES ($1, $2, $3)
                 RETURNING id, created_at",
            )
            .bind(ticket_id)
            .bind(admin_id)
            .bind(reply)
            .fetch_one(&mut *tx)
            .await?;

            let reply = SupportReply {
                id: reply_row.try_get("id")?,
                ticket_id,
                admin_id,
                reply: reply.to_string(),
                created_at: timestamp(&reply_row, "created_at")?,
            };

            tx.commit().await?;

            Ok((ticket, reply))
        })
        .await
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn load_settings(&self) -> LedgerResult<Option<GameSettings>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
            .bind(SETTINGS_KEY)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(|row| {
            let value: String = row.try_get("value")?;
            serde_json::from_str(&value).map_err(|e| LedgerError::Corrupt(e.to_string()))
        })
        .transpose()
    }

    async fn save_settings(&self, settings: &GameSettings) -> LedgerResult<()> {
        let value =
            serde_json::to_string(settings).map_err(|e| LedgerError::Corrupt(e.to_string()))?;

        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, NOW())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(SETTINGS_KEY)
        .bind(value)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
