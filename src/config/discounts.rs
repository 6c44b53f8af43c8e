//! Discount engine tuning

use serde::Deserialize;

use crate::domain::discount::DiscountPolicy;

use super::error::ValidationError;

const MAX_AUTO_APPLY_CANDIDATES: u32 = 500;

/// Engine-wide discount settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountsConfig {
    /// Per-user cap for discounts that set none themselves. `0` disables it.
    #[serde(default = "default_user_usage_limit")]
    pub default_user_usage_limit: u32,

    /// Upper bound on auto-apply discounts considered per request.
    #[serde(default = "default_max_auto_apply_candidates")]
    pub max_auto_apply_candidates: u32,
}

impl DiscountsConfig {
    pub fn policy(&self) -> DiscountPolicy {
        DiscountPolicy {
            default_user_usage_limit: Some(self.default_user_usage_limit).filter(|limit| *limit > 0),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_auto_apply_candidates == 0
            || self.max_auto_apply_candidates > MAX_AUTO_APPLY_CANDIDATES
        {
            return Err(ValidationError::InvalidCandidateLimit {
                max: MAX_AUTO_APPLY_CANDIDATES,
                actual: self.max_auto_apply_candidates,
            });
        }
        Ok(())
    }
}

impl Default for DiscountsConfig {
    fn default() -> Self {
        Self {
            default_user_usage_limit: default_user_usage_limit(),
            max_auto_apply_candidates: default_max_auto_apply_candidates(),
        }
    }
}

fn default_user_usage_limit() -> u32 {
    1
}

fn default_max_auto_apply_candidates() -> u32 {
    50
}
