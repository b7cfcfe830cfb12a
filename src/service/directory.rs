use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::auth::Principal;
use crate::store::{StoreResult, UserStore};

const SEEN_CAPACITY: u64 = 10_000;
const SEEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Records every authenticated principal in the `users` table so projects
/// can reference them. Recently seen ids are cached to skip the write.
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserStore>,
    seen: Cache<String, ()>,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            users,
            seen: Cache::builder()
                .max_capacity(SEEN_CAPACITY)
                .time_to_live(SEEN_TTL)
                .build(),
        }
    }

    pub async fn record(&self, principal: &Principal) -> StoreResult<()> {
        if self.seen.contains_key(&principal.user_id) {
            return Ok(());
        }

        self.users
            .touch_user(&principal.user_id, principal.email.as_deref())
            .await?;
        self.seen.insert(principal.user_id.clone(), ()).await;
        debug!(user_id = %principal.user_id, "Principal recorded");
        Ok(())
    }
}
