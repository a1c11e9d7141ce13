use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 1024;

/// Serializes every state change that touches one advertisement and its bids.
#[derive(Default)]
pub struct AdvertisementLocks {
    slots: Mutex<HashMap<ObjectId, Arc<AsyncMutex<()>>>>,
}

impl AdvertisementLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, advertisement_id: ObjectId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if slots.len() >= PRUNE_THRESHOLD {
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            slots.entry(advertisement_id).or_default().clone()
        };

        slot.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_advertisement_is_exclusive() {
        let locks = Arc::new(AdvertisementLocks::new());
        let ad = ObjectId::new();

        let guard = locks.acquire(ad).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(ad).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_advertisements_do_not_block() {
        let locks = AdvertisementLocks::new();
        let _first = locks.acquire(ObjectId::new()).await;
        let _second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(ObjectId::new()))
            .await
            .expect("independent lock should be free");
        assert_eq!(locks.len(), 2);
    }
}
