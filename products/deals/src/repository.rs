//! Storage seams used by the deal room services.

use entity::{Deal, User};
use platform_store::{MemoryTable, StoreResult};
use uuid::Uuid;

use crate::negotiation::DealChange;

pub trait DealRepository: Send + Sync {
    fn load_deal(&self, id: Uuid) -> StoreResult<Option<Deal>>;

    fn list_deals(&self) -> StoreResult<Vec<Deal>>;

    /// Add a freshly created (or seeded) deal.
    fn insert_deal(&self, deal: Deal) -> StoreResult<()>;

    /// Persist engine output. Fails with `Conflict` when the stored deal no
    /// longer matches the snapshot the change was computed from.
    fn save_deal(&self, change: &DealChange) -> StoreResult<()>;
}

pub trait UserDirectory: Send + Sync {
    fn find_user(&self, id: Uuid) -> Option<User>;

    fn find_by_email(&self, email: &str) -> Option<User>;

    fn list_users(&self) -> Vec<User>;

    fn register(&self, user: User) -> StoreResult<()>;
}

impl DealRepository for MemoryTable<Deal> {
    fn load_deal(&self, id: Uuid) -> StoreResult<Option<Deal>> {
        Ok(self.get(&id))
    }

    fn list_deals(&self) -> StoreResult<Vec<Deal>> {
        Ok(self.list())
    }

    fn insert_deal(&self, deal: Deal) -> StoreResult<()> {
        self.insert(deal.id, deal)
    }

    fn save_deal(&self, change: &DealChange) -> StoreResult<()> {
        let next = change.deal();
        self.replace_if(next.id, next.clone(), |stored| {
            stored.updated_at == change.based_on()
        })
    }
}

impl UserDirectory for MemoryTable<User> {
    fn find_user(&self, id: Uuid) -> Option<User> {
        self.get(&id)
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        let email = email.trim();
        self.find(|user| user.email.eq_ignore_ascii_case(email))
    }

    fn list_users(&self) -> Vec<User> {
        self.list()
    }

    fn register(&self, user: User) -> StoreResult<()> {
        self.insert(user.id, user)
    }
}
