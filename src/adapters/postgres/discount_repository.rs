//! PostgreSQL implementation of DiscountRepository.
//!
//! `usage_count` is owned by the usage ledger: `save` writes zero and
//! `update` never touches the column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::discount::{
    normalize_segments, Discount, DiscountCode, DiscountScope, DiscountType, Exclusions, ScopeKind,
};
use crate::domain::foundation::{
    CategoryId, DiscountId, DomainError, ErrorCode, Money, ProductId, Timestamp,
};
use crate::ports::DiscountRepository;

/// Column list shared by every discount SELECT.
pub(super) const DISCOUNT_COLUMNS: &str = r#"
    id, code, name, discount_type, discount_value, maximum_discount,
    minimum_purchase, minimum_items, usage_limit, usage_count, user_usage_limit,
    valid_from, valid_until, is_active, applicable_to, applicable_ids,
    excluded_products, excluded_categories, first_purchase_only, priority,
    stackable, auto_apply, customer_segments, created_at, updated_at
"#;

/// PostgreSQL implementation of the DiscountRepository port.
pub struct PostgresDiscountRepository {
    pool: PgPool,
}

impl PostgresDiscountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a discount.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct DiscountRow {
    id: Uuid,
    code: String,
    name: Option<String>,
    discount_type: String,
    discount_value: Decimal,
    maximum_discount: Option<Decimal>,
    minimum_purchase: Option<Decimal>,
    minimum_items: Option<i32>,
    usage_limit: Option<i32>,
    usage_count: i32,
    user_usage_limit: Option<i32>,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    is_active: bool,
    applicable_to: String,
    applicable_ids: Vec<String>,
    excluded_products: Vec<String>,
    excluded_categories: Vec<String>,
    first_purchase_only: bool,
    priority: i32,
    stackable: bool,
    auto_apply: bool,
    customer_segments: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DiscountRow> for Discount {
    type Error = DomainError;

    fn try_from(row: DiscountRow) -> Result<Self, Self::Error> {
        let discount_type: DiscountType = row.discount_type.parse().map_err(corrupt)?;
        let scope_kind: ScopeKind = row.applicable_to.parse().map_err(corrupt)?;

        let exclusions = Exclusions {
            products: row
                .excluded_products
                .into_iter()
                .map(ProductId::new)
                .collect::<Result<_, _>>()
                .map_err(corrupt)?,
            categories: row
                .excluded_categories
                .into_iter()
                .map(CategoryId::new)
                .collect::<Result<_, _>>()
                .map_err(corrupt)?,
        };

        Ok(Discount {
            id: DiscountId::from_uuid(row.id),
            code: DiscountCode::try_new(&row.code).map_err(corrupt)?,
            name: row.name,
            discount_type,
            discount_value: row.discount_value,
            maximum_discount: money_from_db(row.maximum_discount)?,
            minimum_purchase: money_from_db(row.minimum_purchase)?,
            minimum_items: count_from_db(row.minimum_items)?,
            usage_limit: count_from_db(row.usage_limit)?,
            usage_count: count_from_db(Some(row.usage_count))?.unwrap_or(0),
            user_usage_limit: count_from_db(row.user_usage_limit)?,
            valid_from: Timestamp::from_datetime(row.valid_from),
            valid_until: row.valid_until.map(Timestamp::from_datetime),
            is_active: row.is_active,
            scope: DiscountScope::from_parts(scope_kind, row.applicable_ids).map_err(corrupt)?,
            exclusions,
            first_purchase_only: row.first_purchase_only,
            priority: row.priority,
            stackable: row.stackable,
            auto_apply: row.auto_apply,
            customer_segments: normalize_segments(row.customer_segments),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn corrupt(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid discount row: {}", err))
}

fn money_from_db(value: Option<Decimal>) -> Result<Option<Money>, DomainError> {
    value.map(Money::try_new).transpose().map_err(corrupt)
}

pub(super) fn count_from_db(value: Option<i32>) -> Result<Option<u32>, DomainError> {
    value.map(u32::try_from).transpose().map_err(corrupt)
}

fn count_to_db(field: &str, value: Option<u32>) -> Result<Option<i32>, DomainError> {
    value
        .map(|v| {
            i32::try_from(v).map_err(|_| {
                DomainError::validation(field, format!("{} exceeds the storable range", field))
            })
        })
        .transpose()
}

fn money_to_db(value: Option<Money>) -> Option<Decimal> {
    value.map(|m| m.amount())
}

fn exclusion_ids(exclusions: &Exclusions) -> (Vec<String>, Vec<String>) {
    (
        exclusions.products.iter().map(|p| p.as_str().to_string()).collect(),
        exclusions.categories.iter().map(|c| c.as_str().to_string()).collect(),
    )
}

fn write_error(context: &str, code: &DiscountCode, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.constraint() == Some("discounts_code_key") {
            return DomainError::new(
                ErrorCode::DiscountCodeExists,
                format!("Discount code '{}' already exists", code),
            )
            .with_detail("code", code.as_str());
        }
        if db_err.constraint() == Some("discounts_usage_within_limit") {
            return DomainError::validation(
                "usage_limit",
                "usage_limit cannot be lower than the recorded usage count",
            );
        }
    }
    DomainError::database(context, err)
}

#[async_trait]
impl DiscountRepository for PostgresDiscountRepository {
    async fn save(&self, discount: &Discount) -> Result<(), DomainError> {
        let (excluded_products, excluded_categories) = exclusion_ids(&discount.exclusions);
        let segments: Vec<String> = discount.customer_segments.iter().cloned().collect();
        let minimum_items = count_to_db("minimum_items", discount.minimum_items)?;
        let usage_limit = count_to_db("usage_limit", discount.usage_limit)?;
        let user_usage_limit = count_to_db("user_usage_limit", discount.user_usage_limit)?;

        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, code, name, discount_type, discount_value, maximum_discount,
                minimum_purchase, minimum_items, usage_limit, usage_count, user_usage_limit,
                valid_from, valid_until, is_active, applicable_to, applicable_ids,
                excluded_products, excluded_categories, first_purchase_only, priority,
                stackable, auto_apply, customer_segments, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24
            )
            "#,
        )
        .bind(discount.id.as_uuid())
        .bind(discount.code.as_str())
        .bind(&discount.name)
        .bind(discount.discount_type.as_str())
        .bind(discount.discount_value)
        .bind(money_to_db(discount.maximum_discount))
        .bind(money_to_db(discount.minimum_purchase))
        .bind(minimum_items)
        .bind(usage_limit)
        .bind(user_usage_limit)
        .bind(discount.valid_from.as_datetime())
        .bind(discount.valid_until.as_ref().map(|t| *t.as_datetime()))
        .bind(discount.is_active)
        .bind(discount.scope.kind().as_str())
        .bind(discount.scope.ids())
        .bind(excluded_products)
        .bind(excluded_categories)
        .bind(discount.first_purchase_only)
        .bind(discount.priority)
        .bind(discount.stackable)
        .bind(discount.auto_apply)
        .bind(segments)
        .bind(discount.created_at.as_datetime())
        .bind(discount.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to save discount", &discount.code, e))?;

        Ok(())
    }

    async fn update(&self, discount: &Discount) -> Result<(), DomainError> {
        let (excluded_products, excluded_categories) = exclusion_ids(&discount.exclusions);
        let segments: Vec<String> = discount.customer_segments.iter().cloned().collect();
        let minimum_items = count_to_db("minimum_items", discount.minimum_items)?;
        let usage_limit = count_to_db("usage_limit", discount.usage_limit)?;
        let user_usage_limit = count_to_db("user_usage_limit", discount.user_usage_limit)?;

        let result = sqlx::query(
            r#"
            UPDATE discounts SET
                code = $2,
                name = $3,
                discount_type = $4,
                discount_value = $5,
                maximum_discount = $6,
                minimum_purchase = $7,
                minimum_items = $8,
                usage_limit = $9,
                user_usage_limit = $10,
                valid_from = $11,
                valid_until = $12,
                is_active = $13,
                applicable_to = $14,
                applicable_ids = $15,
                excluded_products = $16,
                excluded_categories = $17,
                first_purchase_only = $18,
                priority = $19,
                stackable = $20,
                auto_apply = $21,
                customer_segments = $22,
                updated_at = $23
            WHERE id = $1
            "#,
        )
        .bind(discount.id.as_uuid())
        .bind(discount.code.as_str())
        .bind(&discount.name)
        .bind(discount.discount_type.as_str())
        .bind(discount.discount_value)
        .bind(money_to_db(discount.maximum_discount))
        .bind(money_to_db(discount.minimum_purchase))
        .bind(minimum_items)
        .bind(usage_limit)
        .bind(user_usage_limit)
        .bind(discount.valid_from.as_datetime())
        .bind(discount.valid_until.as_ref().map(|t| *t.as_datetime()))
        .bind(discount.is_active)
        .bind(discount.scope.kind().as_str())
        .bind(discount.scope.ids())
        .bind(excluded_products)
        .bind(excluded_categories)
        .bind(discount.first_purchase_only)
        .bind(discount.priority)
        .bind(discount.stackable)
        .bind(discount.auto_apply)
        .bind(segments)
        .bind(discount.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to update discount", &discount.code, e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::DiscountNotFound,
                format!("Discount not found: {}", discount.id),
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &DiscountId) -> Result<Option<Discount>, DomainError> {
        let row: Option<DiscountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM discounts WHERE id = $1",
            DISCOUNT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find discount", e))?;

        row.map(Discount::try_from).transpose()
    }

    async fn find_by_code(&self, code: &DiscountCode) -> Result<Option<Discount>, DomainError> {
        let row: Option<DiscountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM discounts WHERE code = $1",
            DISCOUNT_COLUMNS
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find discount by code", e))?;

        row.map(Discount::try_from).transpose()
    }

    async fn list_auto_apply(&self, limit: u32) -> Result<Vec<Discount>, DomainError> {
        let rows: Vec<DiscountRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM discounts
            WHERE is_active AND auto_apply
            ORDER BY priority DESC, code ASC
            LIMIT $1
            "#,
            DISCOUNT_COLUMNS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list auto-apply discounts", e))?;

        rows.into_iter().map(Discount::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row() -> DiscountRow {
        let now = Utc::now();
        DiscountRow {
            id: Uuid::new_v4(),
            code: "SAVE20".to_string(),
            name: Some("Spring sale".to_string()),
            discount_type: "percentage".to_string(),
            discount_value: dec!(20),
            maximum_discount: Some(dec!(15)),
            minimum_purchase: None,
            minimum_items: None,
            usage_limit: Some(100),
            usage_count: 3,
            user_usage_limit: None,
            valid_from: now,
            valid_until: None,
            is_active: true,
            applicable_to: "category".to_string(),
            applicable_ids: vec!["shoes".to_string()],
            excluded_products: vec!["gift-card".to_string()],
            excluded_categories: Vec::new(),
            first_purchase_only: false,
            priority: 2,
            stackable: false,
            auto_apply: true,
            customer_segments: vec![" VIP ".to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_discount() {
        let discount = Discount::try_from(row()).unwrap();
        assert_eq!(discount.code.as_str(), "SAVE20");
        assert_eq!(discount.discount_type, DiscountType::Percentage);
        assert_eq!(discount.scope.kind(), ScopeKind::Category);
        assert_eq!(discount.usage_count, 3);
        assert_eq!(discount.maximum_discount.map(|m| m.amount()), Some(dec!(15)));
        assert!(discount.exclusions.products.contains(&ProductId::new("gift-card").unwrap()));
        assert!(discount.customer_segments.contains("vip"));
    }

    #[test]
    fn empty_scope_ids_normalize_to_all() {
        let mut r = row();
        r.applicable_ids = Vec::new();
        let discount = Discount::try_from(r).unwrap();
        assert_eq!(discount.scope, DiscountScope::All);
    }

    #[test]
    fn unknown_discount_type_is_database_error() {
        let mut r = row();
        r.discount_type = "bogus".to_string();
        let err = Discount::try_from(r).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn negative_counter_is_database_error() {
        let mut r = row();
        r.usage_count = -1;
        assert!(Discount::try_from(r).is_err());
    }

    #[test]
    fn counts_above_integer_range_are_refused() {
        let err = count_to_db("usage_limit", Some(u32::MAX)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.get("field").map(String::as_str), Some("usage_limit"));
        assert_eq!(count_to_db("usage_limit", Some(40)).unwrap(), Some(40));
        assert_eq!(count_to_db("usage_limit", None).unwrap(), None);
    }
}
