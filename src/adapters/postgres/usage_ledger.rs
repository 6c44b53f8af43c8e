//! PostgreSQL implementation of UsageLedger.
//!
//! Redemption locks the discount row with `SELECT ... FOR UPDATE`, re-checks
//! both caps, then increments with a conditional `UPDATE` and inserts the
//! usage record in the same transaction. Concurrent redemptions of one
//! discount therefore serialize on the row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::domain::discount::{
    DiscountUsageRecord, LimitKind, RedemptionOutcome, RedemptionRequest, UsageStatistics,
};
use crate::domain::foundation::{
    DiscountId, DomainError, ErrorCode, Money, OrderId, Timestamp, UsageRecordId, UserId,
};
use crate::ports::UsageLedger;

use super::discount_repository::count_from_db;

/// PostgreSQL implementation of the UsageLedger port.
pub struct PostgresUsageLedger {
    pool: PgPool,
}

impl PostgresUsageLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UsageRow {
    id: Uuid,
    discount_id: Uuid,
    user_id: Option<String>,
    order_id: String,
    amount_saved: Decimal,
    order_total: Option<Decimal>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UsageRow> for DiscountUsageRecord {
    type Error = DomainError;

    fn try_from(row: UsageRow) -> Result<Self, Self::Error> {
        Ok(DiscountUsageRecord {
            id: UsageRecordId::from_uuid(row.id),
            discount_id: DiscountId::from_uuid(row.discount_id),
            user_id: row.user_id.map(UserId::new).transpose().map_err(corrupt)?,
            order_id: OrderId::new(row.order_id).map_err(corrupt)?,
            amount_saved: Money::try_new(row.amount_saved).map_err(corrupt)?,
            order_total: row.order_total.map(Money::try_new).transpose().map_err(corrupt)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CounterRow {
    usage_count: i32,
    usage_limit: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total_uses: i64,
    unique_users: i64,
    total_saved: Option<Decimal>,
    average_order_value: Option<Decimal>,
    last_used_at: Option<DateTime<Utc>>,
}

impl TryFrom<StatsRow> for UsageStatistics {
    type Error = DomainError;

    fn try_from(row: StatsRow) -> Result<Self, Self::Error> {
        Ok(UsageStatistics {
            total_uses: u64::try_from(row.total_uses).map_err(corrupt)?,
            unique_users: u64::try_from(row.unique_users).map_err(corrupt)?,
            // Summed over every record, so it may pass the per-row column range
            total_saved: Money::saturating(row.total_saved.unwrap_or(Decimal::ZERO)),
            average_order_value: row
                .average_order_value
                .map(|avg| Money::try_new(avg).map(|m| m.rounded()))
                .transpose()
                .map_err(corrupt)?,
            last_used_at: row.last_used_at.map(Timestamp::from_datetime),
        })
    }
}

fn corrupt(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid usage row: {}", err))
}

const USAGE_COLUMNS: &str =
    "id, discount_id, user_id, order_id, amount_saved, order_total, created_at";

async fn order_record(
    tx: &mut Transaction<'_, Postgres>,
    discount_id: &DiscountId,
    order_id: &OrderId,
) -> Result<Option<DiscountUsageRecord>, DomainError> {
    let row: Option<UsageRow> = sqlx::query_as(&format!(
        "SELECT {} FROM discount_usage WHERE discount_id = $1 AND order_id = $2",
        USAGE_COLUMNS
    ))
    .bind(discount_id.as_uuid())
    .bind(order_id.as_str())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| DomainError::database("Failed to look up order usage", e))?;

    row.map(DiscountUsageRecord::try_from).transpose()
}

async fn user_usage(
    tx: &mut Transaction<'_, Postgres>,
    discount_id: &DiscountId,
    user_id: &UserId,
) -> Result<u32, DomainError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM discount_usage WHERE discount_id = $1 AND user_id = $2",
    )
    .bind(discount_id.as_uuid())
    .bind(user_id.as_str())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| DomainError::database("Failed to count user usage", e))?;

    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

#[async_trait]
impl UsageLedger for PostgresUsageLedger {
    async fn count_user_usage(
        &self,
        discount_id: &DiscountId,
        user_id: &UserId,
    ) -> Result<u32, DomainError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM discount_usage WHERE discount_id = $1 AND user_id = $2",
        )
        .bind(discount_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to count user usage", e))?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn redeem(&self, request: &RedemptionRequest) -> Result<RedemptionOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to start transaction", e))?;

        // Lock the counter row; every redemption of this discount queues here
        let counter: Option<CounterRow> = sqlx::query_as(
            "SELECT usage_count, usage_limit FROM discounts WHERE id = $1 FOR UPDATE",
        )
        .bind(request.discount_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to lock discount", e))?;

        let counter = counter.ok_or_else(|| {
            DomainError::new(
                ErrorCode::DiscountNotFound,
                format!("Discount not found: {}", request.discount_id),
            )
        })?;

        // Checked under the lock so a concurrent retry of the same order sees our insert
        if let Some(existing) = order_record(&mut tx, &request.discount_id, &request.order_id).await? {
            debug!(
                discount_id = %request.discount_id,
                order_id = %request.order_id,
                "Redemption already recorded"
            );
            return Ok(RedemptionOutcome::AlreadyRecorded(existing));
        }

        let usage_count = count_from_db(Some(counter.usage_count))?.unwrap_or(0);
        if let Some(limit) = count_from_db(counter.usage_limit)? {
            if usage_count >= limit {
                return Ok(RedemptionOutcome::LimitExceeded(LimitKind::Global { limit }));
            }
        }

        if let (Some(user_id), Some(limit)) = (&request.user_id, request.enforced_user_limit()) {
            let used = user_usage(&mut tx, &request.discount_id, user_id).await?;
            if used >= limit {
                return Ok(RedemptionOutcome::LimitExceeded(LimitKind::PerUser { used, limit }));
            }
        }

        let updated = sqlx::query(
            r#"
            UPDATE discounts
            SET usage_count = usage_count + 1
            WHERE id = $1 AND (usage_limit IS NULL OR usage_count < usage_limit)
            "#,
        )
        .bind(request.discount_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to increment usage", e))?;

        if updated.rows_affected() == 0 {
            let limit = count_from_db(counter.usage_limit)?.unwrap_or(usage_count);
            return Ok(RedemptionOutcome::LimitExceeded(LimitKind::Global { limit }));
        }

        let record = request.to_record(UsageRecordId::new(), Timestamp::now());
        sqlx::query(
            r#"
            INSERT INTO discount_usage (
                id, discount_id, user_id, order_id, amount_saved, order_total, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.discount_id.as_uuid())
        .bind(record.user_id.as_ref().map(|u| u.as_str().to_string()))
        .bind(record.order_id.as_str())
        .bind(record.amount_saved.amount())
        .bind(record.order_total.map(|t| t.amount()))
        .bind(record.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to insert usage record", e))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit redemption", e))?;

        Ok(RedemptionOutcome::Recorded(record))
    }

    async fn find_by_order(
        &self,
        discount_id: &DiscountId,
        order_id: &OrderId,
    ) -> Result<Option<DiscountUsageRecord>, DomainError> {
        let row: Option<UsageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM discount_usage WHERE discount_id = $1 AND order_id = $2",
            USAGE_COLUMNS
        ))
        .bind(discount_id.as_uuid())
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to look up order usage", e))?;

        row.map(DiscountUsageRecord::try_from).transpose()
    }

    async fn statistics(&self, discount_id: &DiscountId) -> Result<UsageStatistics, DomainError> {
        let row: StatsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_uses,
                COUNT(DISTINCT user_id) AS unique_users,
                SUM(amount_saved) AS total_saved,
                AVG(order_total) AS average_order_value,
                MAX(created_at) AS last_used_at
            FROM discount_usage
            WHERE discount_id = $1
            "#,
        )
        .bind(discount_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load usage statistics", e))?;

        UsageStatistics::try_from(row)
    }
}
