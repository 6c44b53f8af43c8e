//! RecordDiscountUsageHandler - Command handler run when an order's payment is confirmed.
//!
//! Re-evaluates the discount against the final cart, then redeems it through
//! the ledger's atomic primitive. A cap reached in between is a recoverable
//! `LimitExceeded`; the caller recomputes the order without the discount.
//! Nothing here retries.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::discount::{
    CartSnapshot, Discount, DiscountError, DiscountUsageRecord, Ineligibility, LimitKind,
    RedemptionOutcome, RedemptionRequest,
};
use crate::domain::foundation::{DiscountId, Money, OrderId, Timestamp, UserId};
use crate::ports::{DiscountRepository, UsageLedger};

use super::{Assessment, DiscountAssessor};

/// Command to record a discount redemption for a confirmed order.
#[derive(Debug, Clone)]
pub struct RecordDiscountUsageCommand {
    pub discount_id: DiscountId,
    pub user_id: Option<UserId>,
    pub order_id: OrderId,
    pub amount_saved: Money,
    pub order_total: Option<Money>,
    /// The cart as finalized for the order.
    pub cart: CartSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDiscountUsageResult {
    pub record: DiscountUsageRecord,
    /// True if this order had already redeemed the discount.
    pub already_recorded: bool,
}

pub struct RecordDiscountUsageHandler {
    discounts: Arc<dyn DiscountRepository>,
    ledger: Arc<dyn UsageLedger>,
    assessor: Arc<DiscountAssessor>,
}

impl RecordDiscountUsageHandler {
    pub fn new(
        discounts: Arc<dyn DiscountRepository>,
        ledger: Arc<dyn UsageLedger>,
        assessor: Arc<DiscountAssessor>,
    ) -> Self {
        Self {
            discounts,
            ledger,
            assessor,
        }
    }

    pub async fn handle(
        &self,
        cmd: RecordDiscountUsageCommand,
    ) -> Result<RecordDiscountUsageResult, DiscountError> {
        // 1. Load the discount
        let discount = self
            .discounts
            .find_by_id(&cmd.discount_id)
            .await?
            .ok_or_else(|| DiscountError::not_found(cmd.discount_id))?;

        // 2. A repeated call for the same order is answered from the ledger
        if let Some(record) = self.ledger.find_by_order(&discount.id, &cmd.order_id).await? {
            info!(
                discount_id = %discount.id,
                order_id = %cmd.order_id,
                "Discount usage already recorded for order"
            );
            return Ok(RecordDiscountUsageResult {
                record,
                already_recorded: true,
            });
        }

        // 3. Re-run eligibility against the final cart
        let shopper = self.assessor.shopper(cmd.user_id.as_ref()).await?;
        match self
            .assessor
            .assess(&discount, &cmd.cart, shopper.as_ref(), Timestamp::now())
            .await?
        {
            Assessment::Rejected(cause) => {
                warn!(
                    discount_id = %discount.id,
                    order_id = %cmd.order_id,
                    reason = %cause.reason(),
                    "Discount no longer applies at order confirmation"
                );
                return Err(rejection_error(&discount, cause));
            }
            Assessment::Applicable(amount) => {
                if cmd.amount_saved > amount.total().rounded() {
                    warn!(
                        discount_id = %discount.id,
                        order_id = %cmd.order_id,
                        amount_saved = %cmd.amount_saved,
                        computed = %amount.total(),
                        "Recorded saving exceeds the computed discount"
                    );
                }
            }
        }

        // 4. Atomic redemption
        let request = RedemptionRequest {
            discount_id: discount.id,
            user_id: cmd.user_id,
            order_id: cmd.order_id,
            amount_saved: cmd.amount_saved,
            order_total: cmd.order_total,
            user_limit: discount.effective_user_limit(self.assessor.policy()),
        };

        match self.ledger.redeem(&request).await? {
            RedemptionOutcome::Recorded(record) => {
                info!(
                    discount_id = %record.discount_id,
                    order_id = %record.order_id,
                    amount_saved = %record.amount_saved,
                    "Discount usage recorded"
                );
                Ok(RecordDiscountUsageResult {
                    record,
                    already_recorded: false,
                })
            }
            RedemptionOutcome::AlreadyRecorded(record) => Ok(RecordDiscountUsageResult {
                record,
                already_recorded: true,
            }),
            RedemptionOutcome::LimitExceeded(limit) => {
                warn!(
                    discount_id = %discount.id,
                    order_id = %request.order_id,
                    ?limit,
                    "Discount usage limit reached at redemption"
                );
                Err(DiscountError::limit_exceeded(discount.id, limit))
            }
        }
    }
}

fn rejection_error(discount: &Discount, cause: Ineligibility) -> DiscountError {
    match cause {
        Ineligibility::UsageLimitReached => DiscountError::limit_exceeded(
            discount.id,
            LimitKind::Global {
                limit: discount.usage_limit.unwrap_or(discount.usage_count),
            },
        ),
        Ineligibility::AlreadyUsed { used, limit } => {
            DiscountError::limit_exceeded(discount.id, LimitKind::PerUser { used, limit })
        }
        other => DiscountError::ineligible(discount.id, other.reason()),
    }
}
