//! Persistence seam for the five collections and the two reports.
//!
//! Handlers only see the traits here; `main` picks MongoDB or the in-memory
//! backend at startup.

use async_trait::async_trait;
use common_http_errors::ApiError;
use thiserror::Error;

use crate::models::{
    AdminStats, CartItem, CategoryStat, CreateOutcome, DeleteOutcome, InsertOutcome, MenuItem, MenuItemPatch,
    NewCartItem, NewMenuItem, NewPayment, NewUser, Payment, PaymentReceipt, Review, UpdateOutcome,
    User,
};

pub mod memory;
pub mod mongo;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("'{0}' is not a valid document id")]
    InvalidId(String),
    #[error("update contains no fields")]
    EmptyUpdate,
    #[error("another menu item already has this name, category and price")]
    DuplicateDish,
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("stored document could not be decoded: {0}")]
    Decode(String),
    #[error("payment {payment_id} recorded but cart cleanup failed: {source}")]
    CartCleanup {
        payment_id: String,
        #[source]
        source: Box<StoreError>,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Inserts unless a user with the same email exists.
    async fn insert_user(&self, user: NewUser) -> StoreResult<CreateOutcome>;
    /// Sets `role` to admin. There is no demotion.
    async fn promote_to_admin(&self, id: &str) -> StoreResult<UpdateOutcome>;
    async fn delete_user(&self, id: &str) -> StoreResult<DeleteOutcome>;
}

#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn list_menu(&self) -> StoreResult<Vec<MenuItem>>;
    async fn find_menu_item(&self, id: &str) -> StoreResult<Option<MenuItem>>;
    /// Inserts unless an item with the same name, category and price exists.
    async fn insert_menu_item(&self, item: NewMenuItem) -> StoreResult<CreateOutcome>;
    /// Fails with `DuplicateDish` if the patched item would match another one.
    async fn update_menu_item(&self, id: &str, patch: MenuItemPatch) -> StoreResult<UpdateOutcome>;
    async fn delete_menu_item(&self, id: &str) -> StoreResult<DeleteOutcome>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn list_reviews(&self) -> StoreResult<Vec<Review>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn list_cart(&self, email: &str) -> StoreResult<Vec<CartItem>>;
    async fn insert_cart_item(&self, item: NewCartItem) -> StoreResult<InsertOutcome>;
    /// Removes the row only if it belongs to `owner`.
    async fn delete_cart_item(&self, id: &str, owner: &str) -> StoreResult<DeleteOutcome>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn list_payments(&self, email: &str) -> StoreResult<Vec<Payment>>;
    /// Inserts the payment and removes the cart rows it consumed. Only rows
    /// owned by the payment's email are removed.
    ///
    /// Every entry of `cart_ids` must be a valid id; nothing is written otherwise.
    async fn record_payment(&self, payment: NewPayment) -> StoreResult<PaymentReceipt>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn admin_stats(&self) -> StoreResult<AdminStats>;
    /// Per-category sales, sorted by category. Menu ids with no match are skipped.
    async fn order_stats(&self) -> StoreResult<Vec<CategoryStat>>;
}

pub trait BistroStore:
    UserStore + MenuStore + ReviewStore + CartStore + PaymentStore + ReportStore
{
}

impl<T> BistroStore for T where
    T: UserStore + MenuStore + ReviewStore + CartStore + PaymentStore + ReportStore
{
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidId(id) => {
                ApiError::bad_request("invalid_id", Some(format!("'{id}' is not a valid id")))
            }
            StoreError::EmptyUpdate => {
                ApiError::bad_request("empty_update", Some("no fields to update".into()))
            }
            StoreError::DuplicateDish => {
                ApiError::bad_request("duplicate_dish", Some(StoreError::DuplicateDish.to_string()))
            }
            other => {
                tracing::warn!(error = %other, "store operation failed");
                ApiError::store(other)
            }
        }
    }
}

/// Parses a path id as a 24-hex ObjectId, keeping the error in store terms.
pub(crate) fn parse_object_id(id: &str) -> StoreResult<mongodb::bson::oid::ObjectId> {
    mongodb::bson::oid::ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn invalid_id_maps_to_bad_request() {
        let err: ApiError = StoreError::InvalidId("nope".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_id");
    }

    #[test]
    fn duplicate_dish_is_a_bad_request() {
        let err: ApiError = StoreError::DuplicateDish.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "duplicate_dish");
    }

    #[test]
    fn cleanup_failure_is_a_store_fault() {
        let err: ApiError = StoreError::CartCleanup {
            payment_id: "p1".into(),
            source: Box::new(StoreError::Decode("bad".into())),
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "store_error");
    }

    #[test]
    fn object_ids_must_be_hex() {
        assert!(parse_object_id("64b7f0c2a1b2c3d4e5f60718").is_ok());
        assert!(matches!(parse_object_id("42"), Err(StoreError::InvalidId(_))));
    }
}
