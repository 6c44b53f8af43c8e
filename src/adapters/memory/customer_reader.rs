//! In-memory customer reader.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::discount::ShopperProfile;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::CustomerReader;

/// Customer reader backed by a map of seeded profiles.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerReader {
    profiles: Arc<RwLock<HashMap<UserId, ShopperProfile>>>,
}

impl InMemoryCustomerReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a profile.
    pub async fn upsert(&self, profile: ShopperProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl CustomerReader for InMemoryCustomerReader {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<ShopperProfile>, DomainError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}
