//! Cart snapshot - the read-only view of a cart the engine evaluates.
//!
//! Owned by the checkout flow; the discount engine never mutates or persists it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CategoryId, Money, ProductId, ValidationError, VariantId};

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    product_id: ProductId,
    variant_id: Option<VariantId>,
    category_id: Option<CategoryId>,
    quantity: u32,
    unit_price: Money,
    line_total: Money,
}

impl CartLineItem {
    /// Creates a line item whose total is `unit_price × quantity`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if quantity is zero or the line total exceeds
    /// [`Money::max_value`].
    pub fn new(product_id: ProductId, quantity: u32, unit_price: Money) -> Result<Self, ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::out_of_range(
                "quantity",
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        let line_total = unit_price
            .amount()
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| ValidationError::invalid_format("line_total", "line total overflows"))
            .and_then(|total| Money::try_new_for("line_total", total))?;
        Ok(Self {
            product_id,
            variant_id: None,
            category_id: None,
            quantity,
            unit_price,
            line_total,
        })
    }

    /// Sets the variant this line refers to.
    pub fn with_variant(mut self, variant_id: VariantId) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    /// Sets the category this line's product belongs to.
    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Overrides the computed line total with the one the cart reports.
    pub fn with_line_total(mut self, line_total: Money) -> Self {
        self.line_total = line_total;
        self
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn variant_id(&self) -> Option<&VariantId> {
        self.variant_id.as_ref()
    }

    pub fn category_id(&self) -> Option<&CategoryId> {
        self.category_id.as_ref()
    }

    pub fn line_total(&self) -> Money {
        self.line_total
    }
}

/// Ordered collection of line items plus the shipping charge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    items: Vec<CartLineItem>,
    shipping_total: Money,
}

impl CartSnapshot {
    /// Creates a snapshot with no shipping charge.
    pub fn new(items: Vec<CartLineItem>) -> Self {
        Self {
            items,
            shipping_total: Money::ZERO,
        }
    }

    /// Like [`CartSnapshot::new`], rejecting carts whose subtotal exceeds
    /// [`Money::max_value`].
    pub fn try_new(items: Vec<CartLineItem>) -> Result<Self, ValidationError> {
        items
            .iter()
            .try_fold(Money::ZERO, |acc, item| acc.checked_add(item.line_total))
            .ok_or_else(|| {
                ValidationError::invalid_format(
                    "items",
                    format!("cart subtotal must not exceed {}", Money::max_value()),
                )
            })?;
        Ok(Self::new(items))
    }

    /// Sets the shipping charge that a free-shipping discount would waive.
    pub fn with_shipping(mut self, shipping_total: Money) -> Self {
        self.shipping_total = shipping_total;
        self
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn shipping_total(&self) -> Money {
        self.shipping_total
    }

    /// Sum of line totals, saturating at [`Money::max_value`].
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Number of line items (not units).
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
