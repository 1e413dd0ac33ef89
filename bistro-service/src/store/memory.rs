//! In-process backend used by tests and `STORE_BACKEND=memory`.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use common_money::sum_prices;
use mongodb::bson::oid::ObjectId;

use super::{
    parse_object_id, CartStore, MenuStore, PaymentStore, ReportStore, ReviewStore,
    StoreError, StoreResult, UserStore,
};
use crate::models::{
    AdminStats, CartItem, CategoryStat, CreateOutcome, DeleteOutcome, InsertOutcome, MenuItem, MenuItemPatch,
    NewCartItem, NewMenuItem, NewPayment, NewReview, NewUser, Payment, PaymentReceipt, Review,
    UpdateOutcome, User, ROLE_ADMIN,
};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    menu: Vec<MenuItem>,
    reviews: Vec<Review>,
    carts: Vec<CartItem>,
    payments: Vec<Payment>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

fn new_id() -> String {
    ObjectId::new().to_hex()
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reviews have no write route; this seeds them for local runs and tests.
    pub fn insert_review(&self, review: NewReview) -> InsertOutcome {
        let id = new_id();
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.reviews.push(review.with_id(id.clone()));
        InsertOutcome::acknowledged(id)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.users.clone())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<CreateOutcome> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        if guard.users.iter().any(|u| u.email == user.email) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let id = new_id();
        guard.users.push(user.with_id(id.clone()));
        Ok(CreateOutcome::Created(InsertOutcome::acknowledged(id)))
    }

    async fn promote_to_admin(&self, id: &str) -> StoreResult<UpdateOutcome> {
        parse_object_id(id)?;
        let mut guard = self.inner.write().expect("rwlock poisoned");
        match guard.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                let modified = !user.is_admin();
                user.role = Some(ROLE_ADMIN.to_string());
                Ok(UpdateOutcome::acknowledged(1, u64::from(modified)))
            }
            None => Ok(UpdateOutcome::acknowledged(0, 0)),
        }
    }

    async fn delete_user(&self, id: &str) -> StoreResult<DeleteOutcome> {
        parse_object_id(id)?;
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let before = guard.users.len();
        guard.users.retain(|u| u.id != id);
        Ok(DeleteOutcome::acknowledged((before - guard.users.len()) as u64))
    }
}

#[async_trait]
impl MenuStore for InMemoryStore {
    async fn list_menu(&self) -> StoreResult<Vec<MenuItem>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.menu.clone())
    }

    async fn find_menu_item(&self, id: &str) -> StoreResult<Option<MenuItem>> {
        parse_object_id(id)?;
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.menu.iter().find(|m| m.id == id).cloned())
    }

    async fn insert_menu_item(&self, item: NewMenuItem) -> StoreResult<CreateOutcome> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        if guard.menu.iter().any(|existing| item.same_dish(existing)) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let id = new_id();
        guard.menu.push(item.with_id(id.clone()));
        Ok(CreateOutcome::Created(InsertOutcome::acknowledged(id)))
    }

    async fn update_menu_item(&self, id: &str, patch: MenuItemPatch) -> StoreResult<UpdateOutcome> {
        parse_object_id(id)?;
        if patch.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let Some(index) = guard.menu.iter().position(|m| m.id == id) else {
            return Ok(UpdateOutcome::acknowledged(0, 0));
        };
        let mut updated = guard.menu[index].clone();
        let modified = patch.apply(&mut updated);
        if guard.menu.iter().any(|other| updated.duplicates(other)) {
            return Err(StoreError::DuplicateDish);
        }
        guard.menu[index] = updated;
        Ok(UpdateOutcome::acknowledged(1, u64::from(modified)))
    }

    async fn delete_menu_item(&self, id: &str) -> StoreResult<DeleteOutcome> {
        parse_object_id(id)?;
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let before = guard.menu.len();
        guard.menu.retain(|m| m.id != id);
        Ok(DeleteOutcome::acknowledged((before - guard.menu.len()) as u64))
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn list_reviews(&self) -> StoreResult<Vec<Review>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.reviews.clone())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn list_cart(&self, email: &str) -> StoreResult<Vec<CartItem>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.carts.iter().filter(|c| c.email == email).cloned().collect())
    }

    async fn insert_cart_item(&self, item: NewCartItem) -> StoreResult<InsertOutcome> {
        let id = new_id();
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.carts.push(item.with_id(id.clone()));
        Ok(InsertOutcome::acknowledged(id))
    }

    async fn delete_cart_item(&self, id: &str, owner: &str) -> StoreResult<DeleteOutcome> {
        parse_object_id(id)?;
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let before = guard.carts.len();
        guard.carts.retain(|c| c.id != id || c.email != owner);
        Ok(DeleteOutcome::acknowledged((before - guard.carts.len()) as u64))
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn list_payments(&self, email: &str) -> StoreResult<Vec<Payment>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.payments.iter().filter(|p| p.email == email).cloned().collect())
    }

    async fn record_payment(&self, payment: NewPayment) -> StoreResult<PaymentReceipt> {
        for cart_id in &payment.cart_ids {
            parse_object_id(cart_id)?;
        }
        let record = payment.into_record(Utc::now());
        let id = new_id();

        // One write guard covers both steps, so the pair is atomic here.
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let before = guard.carts.len();
        guard
            .carts
            .retain(|c| c.email != record.email || !record.cart_ids.contains(&c.id));
        let deleted = (before - guard.carts.len()) as u64;
        guard.payments.push(record.with_id(id.clone()));

        Ok(PaymentReceipt {
            payment_result: InsertOutcome::acknowledged(id),
            delete_result: DeleteOutcome::acknowledged(deleted),
        })
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn admin_stats(&self) -> StoreResult<AdminStats> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(AdminStats {
            customers: guard.users.iter().filter(|u| !u.is_admin()).count() as u64,
            products: guard.menu.len() as u64,
            orders: guard.payments.len() as u64,
            total_revenue: sum_prices(guard.payments.iter().map(|p| p.price)),
        })
    }

    async fn order_stats(&self) -> StoreResult<Vec<CategoryStat>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        let mut by_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for menu_id in guard.payments.iter().flat_map(|p| p.menu_item_ids.iter()) {
            if let Some(item) = guard.menu.iter().find(|m| &m.id == menu_id) {
                by_category.entry(item.category.as_str()).or_default().push(item.price);
            }
        }
        Ok(by_category
            .into_iter()
            .map(|(category, prices)| CategoryStat {
                category: category.to_string(),
                quantity: prices.len() as u64,
                revenue: sum_prices(prices),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dish(name: &str, category: &str, price: f64) -> NewMenuItem {
        NewMenuItem {
            name: name.into(),
            recipe: String::new(),
            image: String::new(),
            category: category.into(),
            price,
        }
    }

    fn inserted(outcome: CreateOutcome) -> String {
        match outcome {
            CreateOutcome::Created(o) => o.inserted_id,
            CreateOutcome::AlreadyExists => panic!("expected insert"),
        }
    }

    #[tokio::test]
    async fn menu_duplicates_are_skipped() {
        let store = InMemoryStore::new();
        inserted(store.insert_menu_item(dish("Caesar", "salad", 9.5)).await.unwrap());
        let again = store.insert_menu_item(dish("Caesar", "salad", 9.5)).await.unwrap();
        assert_eq!(again, CreateOutcome::AlreadyExists);
        // A different price is a different dish.
        inserted(store.insert_menu_item(dish("Caesar", "salad", 10.0)).await.unwrap());
        assert_eq!(store.list_menu().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn promote_is_one_way_and_idempotent() {
        let store = InMemoryStore::new();
        let id = inserted(
            store
                .insert_user(NewUser { name: None, email: "a@b.test".into(), photo_url: None })
                .await
                .unwrap(),
        );
        let first = store.promote_to_admin(&id).await.unwrap();
        assert_eq!((first.matched_count, first.modified_count), (1, 1));
        let second = store.promote_to_admin(&id).await.unwrap();
        assert_eq!((second.matched_count, second.modified_count), (1, 0));
        let user = store.find_user_by_email("a@b.test").await.unwrap().unwrap();
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn record_payment_rejects_bad_cart_ids_before_writing() {
        let store = InMemoryStore::new();
        let payment = NewPayment {
            email: "a@b.test".into(),
            price: 10.0,
            transaction_id: None,
            date: None,
            cart_ids: vec!["not-an-id".into()],
            menu_item_ids: vec![],
            status: None,
        };
        let err = store.record_payment(payment).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
        assert!(store.list_payments("a@b.test").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn order_stats_skip_unknown_menu_ids() {
        let store = InMemoryStore::new();
        let soup = inserted(store.insert_menu_item(dish("Tomato", "soup", 4.25)).await.unwrap());
        let payment = NewPayment {
            email: "a@b.test".into(),
            price: 8.5,
            transaction_id: Some("tx".into()),
            date: None,
            cart_ids: vec![],
            menu_item_ids: vec![soup.clone(), soup, new_id()],
            status: None,
        };
        store.record_payment(payment).await.unwrap();

        let stats = store.order_stats().await.unwrap();
        assert_eq!(
            stats,
            vec![CategoryStat { category: "soup".into(), quantity: 2, revenue: 8.5 }]
        );
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let store = InMemoryStore::new();
        let id = inserted(store.insert_menu_item(dish("Tomato", "soup", 4.25)).await.unwrap());
        let err = store.update_menu_item(&id, MenuItemPatch::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::EmptyUpdate));
    }

    #[tokio::test]
    async fn patch_cannot_copy_another_dish() {
        let store = InMemoryStore::new();
        inserted(store.insert_menu_item(dish("Tomato", "soup", 4.25)).await.unwrap());
        let leek = inserted(store.insert_menu_item(dish("Leek", "soup", 4.25)).await.unwrap());

        let rename = MenuItemPatch { name: Some("Tomato".into()), ..MenuItemPatch::default() };
        let err = store.update_menu_item(&leek, rename).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateDish));
        let kept = store.find_menu_item(&leek).await.unwrap().unwrap();
        assert_eq!(kept.name, "Leek");

        // Re-writing a dish's own values is not a clash.
        let same = MenuItemPatch { price: Some(4.25), ..MenuItemPatch::default() };
        let outcome = store.update_menu_item(&leek, same).await.unwrap();
        assert_eq!((outcome.matched_count, outcome.modified_count), (1, 0));
    }

    fn cart_row(email: &str) -> NewCartItem {
        NewCartItem {
            menu_id: new_id(),
            email: email.into(),
            name: "Tomato".into(),
            image: String::new(),
            price: 4.25,
        }
    }

    #[tokio::test]
    async fn cart_rows_only_leave_their_owners_cart() {
        let store = InMemoryStore::new();
        let theirs = store.insert_cart_item(cart_row("owner@b.test")).await.unwrap().inserted_id;
        let other = store.insert_cart_item(cart_row("owner@b.test")).await.unwrap().inserted_id;

        let removed = store.delete_cart_item(&theirs, "intruder@b.test").await.unwrap();
        assert_eq!(removed.deleted_count, 0);

        let payment = NewPayment {
            email: "intruder@b.test".into(),
            price: 4.25,
            transaction_id: None,
            date: None,
            cart_ids: vec![theirs.clone(), other],
            menu_item_ids: vec![],
            status: None,
        };
        let receipt = store.record_payment(payment).await.unwrap();
        assert_eq!(receipt.delete_result.deleted_count, 0);
        assert_eq!(store.list_cart("owner@b.test").await.unwrap().len(), 2);

        let removed = store.delete_cart_item(&theirs, "owner@b.test").await.unwrap();
        assert_eq!(removed.deleted_count, 1);
    }
}
