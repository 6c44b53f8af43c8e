//! Store-wide discount policy knobs.

use serde::{Deserialize, Serialize};

/// Settings that apply to every discount unless the discount overrides them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    /// Per-shopper redemption cap used when a discount leaves `user_usage_limit` unset.
    ///
    /// Only enforceable for authenticated shoppers; guests are not held to it.
    pub default_user_usage_limit: Option<u32>,
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self {
            default_user_usage_limit: Some(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allows_one_use_per_shopper() {
        assert_eq!(DiscountPolicy::default().default_user_usage_limit, Some(1));
    }
}
