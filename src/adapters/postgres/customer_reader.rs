//! PostgreSQL implementation of CustomerReader.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::discount::ShopperProfile;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::CustomerReader;

/// Reads shopper facts from the `customer_profiles` table.
pub struct PostgresCustomerReader {
    pool: PgPool,
}

impl PostgresCustomerReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    completed_orders: i32,
    segments: Vec<String>,
}

impl TryFrom<ProfileRow> for ShopperProfile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?;
        Ok(ShopperProfile::new(user_id)
            .with_completed_orders(u32::try_from(row.completed_orders).unwrap_or(0))
            .with_segments(row.segments))
    }
}

#[async_trait]
impl CustomerReader for PostgresCustomerReader {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<ShopperProfile>, DomainError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT user_id, completed_orders, segments FROM customer_profiles WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load customer profile", e))?;

        row.map(ShopperProfile::try_from).transpose()
    }
}
