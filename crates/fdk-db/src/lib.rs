//! Postgres persistence for the funded-account challenge engine.
//!
//! Implements the `fdk-evaluator` repository traits over sqlx. All queries
//! use `query()` + binds; rows map into the canonical `fdk-schemas` records
//! so the engine never sees storage shapes. The breach transition is the one
//! multi-statement transaction in the system and carries its own
//! optimistic re-check (`where status = 'active'`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use fdk_evaluator::{
    AnchorRepository, PayoutRepository, PhaseRepository, PhaseSnapshot, TradeRepository,
    TransitionOutcome,
};
use fdk_schemas::{
    AccountConfig, DailyAnchor, DrawdownMode, NewBreach, PayoutRequest, PhaseConfig, PhaseRecord,
    PhaseStatus, PhaseType, Trade,
};

pub const ENV_DB_URL: &str = "FDK_DATABASE_URL";

/// Connect to Postgres using FDK_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='phases'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_phases_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_phases_table: bool,
}

// ---------------------------------------------------------------------------
// Row decoding helpers
// ---------------------------------------------------------------------------

fn non_negative(field: &'static str, v: i32) -> Result<u32> {
    u32::try_from(v).map_err(|_| anyhow!("{field} must not be negative, got {v}"))
}

fn parse_status(s: &str) -> Result<PhaseStatus> {
    PhaseStatus::parse(s).ok_or_else(|| anyhow!("invalid phase status: {s}"))
}

fn parse_phase_type(s: &str) -> Result<PhaseType> {
    PhaseType::parse(s).ok_or_else(|| anyhow!("invalid phase type: {s}"))
}

fn parse_drawdown_mode(s: &str) -> Result<DrawdownMode> {
    DrawdownMode::parse(s).ok_or_else(|| anyhow!("invalid drawdown mode: {s}"))
}

// ---------------------------------------------------------------------------
// Seed / boundary writes
// ---------------------------------------------------------------------------

/// Insert a master account row.
pub async fn insert_account(pool: &PgPool, account: &AccountConfig) -> Result<()> {
    sqlx::query(
        r#"
        insert into accounts (account_id, account_size_micros, currency, timezone, is_active)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(account.account_id)
    .bind(account.account_size_micros)
    .bind(&account.currency)
    .bind(&account.timezone)
    .bind(account.is_active)
    .execute(pool)
    .await
    .context("insert_account failed")?;
    Ok(())
}

/// Insert a phase row (record + immutable config). Advancement creates a new
/// row; existing config columns are never updated.
pub async fn insert_phase(
    pool: &PgPool,
    record: &PhaseRecord,
    config: &PhaseConfig,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into phases (
          phase_id, account_id, phase_number, phase_type, status, started_at, ended_at,
          profit_target_percent, daily_drawdown_percent, max_drawdown_percent,
          max_drawdown_mode, min_trading_days, time_limit_days, consistency_rule_percent,
          profit_split_percent, profit_split_increment_per_payout, max_profit_split_percent,
          payout_cycle_days, min_days_before_first_payout, min_payout_micros, max_payout_micros
        ) values (
          $1, $2, $3, $4, $5, $6, $7,
          $8, $9, $10,
          $11, $12, $13, $14,
          $15, $16, $17,
          $18, $19, $20, $21
        )
        "#,
    )
    .bind(record.phase_id)
    .bind(record.account_id)
    .bind(config.phase_number as i32)
    .bind(config.phase_type.as_str())
    .bind(record.status.as_str())
    .bind(record.started_at)
    .bind(record.ended_at)
    .bind(config.profit_target_percent)
    .bind(config.daily_drawdown_percent)
    .bind(config.max_drawdown_percent)
    .bind(config.max_drawdown_mode.as_str())
    .bind(config.min_trading_days as i32)
    .bind(config.time_limit_days as i32)
    .bind(config.consistency_rule_percent)
    .bind(config.profit_split_percent)
    .bind(config.profit_split_increment_per_payout)
    .bind(config.max_profit_split_percent)
    .bind(config.payout_cycle_days as i32)
    .bind(config.min_days_before_first_payout as i32)
    .bind(config.min_payout_micros)
    .bind(config.max_payout_micros)
    .execute(pool)
    .await
    .context("insert_phase failed")?;
    Ok(())
}

/// Record one closed trade against its phase.
pub async fn insert_trade(pool: &PgPool, trade: &Trade) -> Result<()> {
    sqlx::query(
        r#"
        insert into trades (trade_id, phase_id, pnl_micros, commission_micros, entry_time, exit_time)
        values ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(trade.trade_id)
    .bind(trade.phase_id)
    .bind(trade.pnl_micros)
    .bind(trade.commission_micros)
    .bind(trade.entry_time)
    .bind(trade.exit_time)
    .execute(pool)
    .await
    .context("insert_trade failed")?;
    Ok(())
}

/// Record a payout taken from a funded phase.
pub async fn insert_payout(pool: &PgPool, payout: &PayoutRequest) -> Result<()> {
    sqlx::query(
        r#"
        insert into payout_requests (
          payout_id, phase_id, amount_micros, requested_at, profit_split_percent_applied
        ) values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(payout.payout_id)
    .bind(payout.phase_id)
    .bind(payout.amount_micros)
    .bind(payout.requested_at)
    .bind(payout.profit_split_percent_applied)
    .execute(pool)
    .await
    .context("insert_payout failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Repository implementation
// ---------------------------------------------------------------------------

/// Postgres-backed store implementing every evaluator repository trait.
///
/// Cheap to clone; construct once at composition time and inject into the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PhaseRepository for PgStore {
    async fn load_phase(&self, phase_id: Uuid) -> Result<PhaseSnapshot> {
        let row = sqlx::query(
            r#"
            select
              p.phase_id, p.account_id, p.phase_number, p.phase_type, p.status,
              p.started_at, p.ended_at,
              p.profit_target_percent, p.daily_drawdown_percent, p.max_drawdown_percent,
              p.max_drawdown_mode, p.min_trading_days, p.time_limit_days,
              p.consistency_rule_percent, p.profit_split_percent,
              p.profit_split_increment_per_payout, p.max_profit_split_percent,
              p.payout_cycle_days, p.min_days_before_first_payout,
              p.min_payout_micros, p.max_payout_micros,
              a.account_size_micros, a.currency, a.timezone, a.is_active
            from phases p
            join accounts a on a.account_id = p.account_id
            where p.phase_id = $1
            "#,
        )
        .bind(phase_id)
        .fetch_one(&self.pool)
        .await
        .context("load_phase failed")?;

        let account = AccountConfig {
            account_id: row.try_get("account_id")?,
            account_size_micros: row.try_get("account_size_micros")?,
            currency: row.try_get("currency")?,
            timezone: row.try_get("timezone")?,
            is_active: row.try_get("is_active")?,
        };
        let config = PhaseConfig {
            phase_number: non_negative("phase_number", row.try_get("phase_number")?)?,
            phase_type: parse_phase_type(&row.try_get::<String, _>("phase_type")?)?,
            profit_target_percent: row.try_get("profit_target_percent")?,
            daily_drawdown_percent: row.try_get("daily_drawdown_percent")?,
            max_drawdown_percent: row.try_get("max_drawdown_percent")?,
            max_drawdown_mode: parse_drawdown_mode(&row.try_get::<String, _>("max_drawdown_mode")?)?,
            min_trading_days: non_negative("min_trading_days", row.try_get("min_trading_days")?)?,
            time_limit_days: non_negative("time_limit_days", row.try_get("time_limit_days")?)?,
            consistency_rule_percent: row.try_get("consistency_rule_percent")?,
            profit_split_percent: row.try_get("profit_split_percent")?,
            profit_split_increment_per_payout: row
                .try_get("profit_split_increment_per_payout")?,
            max_profit_split_percent: row.try_get("max_profit_split_percent")?,
            payout_cycle_days: non_negative("payout_cycle_days", row.try_get("payout_cycle_days")?)?,
            min_days_before_first_payout: non_negative(
                "min_days_before_first_payout",
                row.try_get("min_days_before_first_payout")?,
            )?,
            min_payout_micros: row.try_get("min_payout_micros")?,
            max_payout_micros: row.try_get("max_payout_micros")?,
        };
        let record = PhaseRecord {
            phase_id: row.try_get("phase_id")?,
            account_id: row.try_get("account_id")?,
            status: parse_status(&row.try_get::<String, _>("status")?)?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
        };

        Ok(PhaseSnapshot {
            account,
            config,
            record,
        })
    }

    async fn fail_active_phase(
        &self,
        phase_id: Uuid,
        breach: NewBreach,
        ended_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("fail_active_phase begin failed")?;

        // Optimistic re-check and transition in one statement: zero rows
        // affected means another evaluation (or the pass workflow) got there
        // first.
        let res = sqlx::query(
            r#"
            update phases
            set status = 'failed',
                ended_at = $2
            where phase_id = $1
              and status = 'active'
            "#,
        )
        .bind(phase_id)
        .bind(ended_at)
        .execute(&mut *tx)
        .await
        .context("fail_active_phase update failed")?;

        if res.rows_affected() == 0 {
            tx.rollback()
                .await
                .context("fail_active_phase rollback failed")?;

            let (status,): (String,) =
                sqlx::query_as::<_, (String,)>("select status from phases where phase_id = $1")
                    .bind(phase_id)
                    .fetch_one(&self.pool)
                    .await
                    .context("fail_active_phase status re-read failed")?;
            return Ok(TransitionOutcome::AlreadyTerminal(parse_status(&status)?));
        }

        sqlx::query(
            r#"
            update accounts
            set is_active = false
            where account_id = (select account_id from phases where phase_id = $1)
            "#,
        )
        .bind(phase_id)
        .execute(&mut *tx)
        .await
        .context("fail_active_phase account deactivation failed")?;

        sqlx::query(
            r#"
            insert into breach_events (
              breach_id, phase_id, breach_type, breached_at,
              daily_drawdown_used_micros, daily_drawdown_limit_micros,
              max_drawdown_used_micros, max_drawdown_limit_micros
            ) values ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(phase_id)
        .bind(breach.breach_type.as_str())
        .bind(breach.breached_at)
        .bind(breach.daily_drawdown_used_micros)
        .bind(breach.daily_drawdown_limit_micros)
        .bind(breach.max_drawdown_used_micros)
        .bind(breach.max_drawdown_limit_micros)
        .execute(&mut *tx)
        .await
        .context("fail_active_phase breach insert failed")?;

        tx.commit()
            .await
            .context("fail_active_phase commit failed")?;

        Ok(TransitionOutcome::Applied)
    }
}

#[async_trait]
impl TradeRepository for PgStore {
    async fn trades_for_phase(&self, phase_id: Uuid) -> Result<Vec<Trade>> {
        // Accumulation order is part of the contract: (exit_time, trade_id)
        // ascending, nulls first so the calculator rejects them explicitly.
        let rows = sqlx::query(
            r#"
            select trade_id, phase_id, pnl_micros, commission_micros, entry_time, exit_time
            from trades
            where phase_id = $1
            order by exit_time asc nulls first, trade_id asc
            "#,
        )
        .bind(phase_id)
        .fetch_all(&self.pool)
        .await
        .context("trades_for_phase failed")?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Trade {
                trade_id: row.try_get("trade_id")?,
                phase_id: row.try_get("phase_id")?,
                pnl_micros: row.try_get("pnl_micros")?,
                commission_micros: row.try_get("commission_micros")?,
                entry_time: row.try_get("entry_time")?,
                exit_time: row.try_get("exit_time")?,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl AnchorRepository for PgStore {
    async fn anchor_for(&self, phase_id: Uuid, date: NaiveDate) -> Result<Option<DailyAnchor>> {
        let row = sqlx::query(
            r#"
            select phase_id, date, anchor_equity_micros
            from daily_anchors
            where phase_id = $1 and date = $2
            "#,
        )
        .bind(phase_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .context("anchor_for failed")?;

        Ok(match row {
            Some(row) => Some(DailyAnchor {
                phase_id: row.try_get("phase_id")?,
                date: row.try_get("date")?,
                anchor_equity_micros: row.try_get("anchor_equity_micros")?,
            }),
            None => None,
        })
    }

    async fn ensure_anchor(
        &self,
        phase_id: Uuid,
        date: NaiveDate,
        anchor_equity_micros: i64,
    ) -> Result<DailyAnchor> {
        // First writer wins; concurrent evaluations converge on the stored row.
        sqlx::query(
            r#"
            insert into daily_anchors (phase_id, date, anchor_equity_micros)
            values ($1, $2, $3)
            on conflict (phase_id, date) do nothing
            "#,
        )
        .bind(phase_id)
        .bind(date)
        .bind(anchor_equity_micros)
        .execute(&self.pool)
        .await
        .context("ensure_anchor insert failed")?;

        self.anchor_for(phase_id, date)
            .await?
            .ok_or_else(|| anyhow!("anchor missing after ensure for phase {phase_id} on {date}"))
    }
}

#[async_trait]
impl PayoutRepository for PgStore {
    async fn payouts_for_phase(&self, phase_id: Uuid) -> Result<Vec<PayoutRequest>> {
        let rows = sqlx::query(
            r#"
            select payout_id, phase_id, amount_micros, requested_at, profit_split_percent_applied
            from payout_requests
            where phase_id = $1
            order by requested_at asc, payout_id asc
            "#,
        )
        .bind(phase_id)
        .fetch_all(&self.pool)
        .await
        .context("payouts_for_phase failed")?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(PayoutRequest {
                payout_id: row.try_get("payout_id")?,
                phase_id: row.try_get("phase_id")?,
                amount_micros: row.try_get("amount_micros")?,
                requested_at: row.try_get("requested_at")?,
                profit_split_percent_applied: row.try_get("profit_split_percent_applied")?,
            });
        }
        Ok(out)
    }
}
