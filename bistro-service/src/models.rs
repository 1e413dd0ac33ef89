//! Wire and storage shapes for the five collections plus the report rows.
//!
//! Stored documents never carry `_id` on the way in; the store assigns one and
//! hands it back as a 24-hex string under `_id`, which is what clients expect.

use chrono::{DateTime, Utc};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ALREADY_EXISTS: &str = "Already exists";
pub const DEFAULT_PAYMENT_STATUS: &str = "pending";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ROLE_ADMIN)
    }
}

/// Sign-up payload. A role can never be supplied here; promotion is a separate admin call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl NewUser {
    pub fn with_id(self, id: String) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            role: None,
            photo_url: self.photo_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub recipe: String,
    #[serde(default)]
    pub image: String,
    pub category: String,
    pub price: f64,
}

impl MenuItem {
    /// A different document describing the same dish.
    pub fn duplicates(&self, other: &MenuItem) -> bool {
        self.id != other.id
            && self.name == other.name
            && self.category == other.category
            && self.price == other.price
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMenuItem {
    pub name: String,
    #[serde(default)]
    pub recipe: String,
    #[serde(default)]
    pub image: String,
    pub category: String,
    pub price: f64,
}

impl NewMenuItem {
    /// Two items are the same dish when name, category and price all match.
    pub fn same_dish(&self, other: &MenuItem) -> bool {
        self.name == other.name && self.category == other.category && self.price == other.price
    }

    pub fn with_id(self, id: String) -> MenuItem {
        MenuItem {
            id,
            name: self.name,
            recipe: self.recipe,
            image: self.image,
            category: self.category,
            price: self.price,
        }
    }
}

/// Partial update for a menu item; only present fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MenuItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl MenuItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.recipe.is_none()
            && self.image.is_none()
            && self.category.is_none()
            && self.price.is_none()
    }

    /// Applies the patch, returning whether any field actually changed.
    pub fn apply(&self, item: &mut MenuItem) -> bool {
        let before = item.clone();
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(recipe) = &self.recipe {
            item.recipe = recipe.clone();
        }
        if let Some(image) = &self.image {
            item.image = image.clone();
        }
        if let Some(category) = &self.category {
            item.category = category.clone();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        *item != before
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewReview {
    pub name: String,
    pub details: String,
    pub rating: f64,
}

impl NewReview {
    pub fn with_id(self, id: String) -> Review {
        Review {
            id,
            name: self.name,
            details: self.details,
            rating: self.rating,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub menu_id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub menu_id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub price: f64,
}

impl NewCartItem {
    pub fn with_id(self, id: String) -> CartItem {
        CartItem {
            id,
            menu_id: self.menu_id,
            email: self.email,
            name: self.name,
            image: self.image,
            price: self.price,
        }
    }
}

/// Payment as posted by the checkout page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub email: String,
    pub price: f64,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cart_ids: Vec<String>,
    #[serde(default)]
    pub menu_item_ids: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl NewPayment {
    /// Fills server-side defaults: the current time and a pending status.
    pub fn into_record(self, now: DateTime<Utc>) -> PaymentRecord {
        PaymentRecord {
            email: self.email,
            price: self.price,
            transaction_id: self.transaction_id,
            date: self.date.unwrap_or(now),
            cart_ids: self.cart_ids,
            menu_item_ids: self.menu_item_ids,
            status: self
                .status
                .unwrap_or_else(|| DEFAULT_PAYMENT_STATUS.to_string()),
        }
    }
}

/// Payment as written to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub email: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub cart_ids: Vec<String>,
    #[serde(default)]
    pub menu_item_ids: Vec<String>,
    pub status: String,
}

impl PaymentRecord {
    pub fn with_id(self, id: String) -> Payment {
        Payment {
            id,
            email: self.email,
            price: self.price,
            transaction_id: self.transaction_id,
            date: self.date,
            cart_ids: self.cart_ids,
            menu_item_ids: self.menu_item_ids,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub cart_ids: Vec<String>,
    #[serde(default)]
    pub menu_item_ids: Vec<String>,
    pub status: String,
}

/// Store acknowledgement for a single insert, shaped like the driver's.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    pub inserted_id: String,
}

impl InsertOutcome {
    pub fn acknowledged(inserted_id: String) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

/// Result of an insert that is skipped when an equivalent document exists.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(InsertOutcome),
    AlreadyExists,
}

impl Serialize for CreateOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CreateOutcome::Created(outcome) => outcome.serialize(serializer),
            CreateOutcome::AlreadyExists => {
                let mut state = serializer.serialize_struct("AlreadyExists", 1)?;
                state.serialize_field("message", ALREADY_EXISTS)?;
                state.end()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<String>,
}

impl UpdateOutcome {
    pub fn acknowledged(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_count: 0,
            upserted_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteOutcome {
    pub fn acknowledged(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

/// Result of recording a payment: the insert plus the cart cleanup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment_result: InsertOutcome,
    pub delete_result: DeleteOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub customers: u64,
    pub products: u64,
    pub orders: u64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryStat {
    pub category: String,
    pub quantity: u64,
    pub revenue: f64,
}
