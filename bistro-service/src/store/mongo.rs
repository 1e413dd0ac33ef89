//! MongoDB backend.
//!
//! Documents are handled as raw `Document`s so `_id` can be rendered as the
//! hex string clients already use; everything else goes through serde.

use async_trait::async_trait;
use chrono::Utc;
use common_money::round_cents;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Cursor, Database, IndexModel};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    parse_object_id, CartStore, MenuStore, PaymentStore, ReportStore, ReviewStore,
    StoreError, StoreResult, UserStore,
};
use crate::models::{
    AdminStats, CartItem, CategoryStat, CreateOutcome, DeleteOutcome, InsertOutcome, MenuItem, MenuItemPatch,
    NewCartItem, NewMenuItem, NewPayment, NewUser, Payment, PaymentReceipt, PaymentRecord, Review,
    UpdateOutcome, User, ROLE_ADMIN,
};

const USERS_COLLECTION: &str = "users";
const MENU_COLLECTION: &str = "menu";
const REVIEWS_COLLECTION: &str = "reviews";
const CARTS_COLLECTION: &str = "carts";
const PAYMENTS_COLLECTION: &str = "payments";

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    client: Client,
    users: Collection<Document>,
    menu: Collection<Document>,
    reviews: Collection<Document>,
    carts: Collection<Document>,
    payments: Collection<Document>,
    transactions: bool,
}

impl MongoStore {
    /// Connects, pings the deployment and makes sure the indexes exist.
    ///
    /// `transactions` wraps payment recording and cart cleanup in one
    /// multi-document transaction; it needs a replica set.
    pub async fn connect(uri: &str, database_name: &str, transactions: bool) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database_name);
        database.run_command(doc! { "ping": 1 }).await?;

        let store = Self::with_database(client, &database, transactions);
        store.init().await?;

        tracing::info!(database = database_name, transactions, "connected to MongoDB");
        Ok(store)
    }

    fn with_database(client: Client, database: &Database, transactions: bool) -> Self {
        Self {
            users: database.collection(USERS_COLLECTION),
            menu: database.collection(MENU_COLLECTION),
            reviews: database.collection(REVIEWS_COLLECTION),
            carts: database.collection(CARTS_COLLECTION),
            payments: database.collection(PAYMENTS_COLLECTION),
            client,
            transactions,
        }
    }

    async fn init(&self) -> StoreResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        // Existing deployments may already hold duplicates; the pre-insert
        // lookups still apply, so a failed unique index is only logged.
        let email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(unique())
            .build();
        if let Err(err) = self.users.create_index(email).await {
            tracing::warn!(error = %err, "could not create unique index on users.email");
        }

        let dish = IndexModel::builder()
            .keys(doc! { "name": 1, "category": 1, "price": 1 })
            .options(unique())
            .build();
        if let Err(err) = self.menu.create_index(dish).await {
            tracing::warn!(error = %err, "could not create unique index on menu dish");
        }

        self.carts
            .create_index(IndexModel::builder().keys(doc! { "email": 1 }).build())
            .await?;
        self.payments
            .create_index(IndexModel::builder().keys(doc! { "email": 1 }).build())
            .await?;

        Ok(())
    }

    async fn insert_unique(
        &self,
        collection: &Collection<Document>,
        document: Document,
    ) -> StoreResult<CreateOutcome> {
        match collection.insert_one(document).await {
            Ok(result) => Ok(CreateOutcome::Created(InsertOutcome::acknowledged(id_string(
                &result.inserted_id,
            )))),
            Err(err) if is_duplicate_key(&err) => Ok(CreateOutcome::AlreadyExists),
            Err(err) => Err(err.into()),
        }
    }

    async fn record_in_transaction(
        &self,
        payment: Document,
        cart_rows: Document,
    ) -> StoreResult<PaymentReceipt> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        // Dropping the session with the transaction open aborts it.
        let inserted = self.payments.insert_one(payment).session(&mut session).await?;
        let deleted = self
            .carts
            .delete_many(cart_rows)
            .session(&mut session)
            .await?;

        session.commit_transaction().await?;

        Ok(PaymentReceipt {
            payment_result: InsertOutcome::acknowledged(id_string(&inserted.inserted_id)),
            delete_result: DeleteOutcome::acknowledged(deleted.deleted_count),
        })
    }

    async fn record_sequentially(
        &self,
        payment: Document,
        cart_rows: Document,
    ) -> StoreResult<PaymentReceipt> {
        let inserted = self.payments.insert_one(payment).await?;
        let payment_id = id_string(&inserted.inserted_id);

        let deleted = self
            .carts
            .delete_many(cart_rows)
            .await
            .map_err(|err| StoreError::CartCleanup {
                payment_id: payment_id.clone(),
                source: Box::new(err.into()),
            })?;

        Ok(PaymentReceipt {
            payment_result: InsertOutcome::acknowledged(payment_id),
            delete_result: DeleteOutcome::acknowledged(deleted.deleted_count),
        })
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

fn id_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    bson::to_document(value).map_err(|err| StoreError::Decode(err.to_string()))
}

/// Payments keep `date` as a BSON Date, the type other clients write.
fn payment_document(record: &PaymentRecord) -> StoreResult<Document> {
    let mut document = to_document(record)?;
    document.insert("date", bson::DateTime::from_millis(record.date.timestamp_millis()));
    Ok(document)
}

fn decode<T: DeserializeOwned>(mut document: Document) -> StoreResult<T> {
    if let Some(id) = document.get("_id") {
        let hex = id_string(id);
        document.insert("_id", hex);
    }
    for (_, value) in document.iter_mut() {
        if let Bson::DateTime(at) = value {
            let text = at
                .try_to_rfc3339_string()
                .map_err(|err| StoreError::Decode(err.to_string()))?;
            *value = Bson::String(text);
        }
    }
    bson::from_document(document).map_err(|err| StoreError::Decode(err.to_string()))
}

async fn collect<T: DeserializeOwned>(mut cursor: Cursor<Document>) -> StoreResult<Vec<T>> {
    let mut items = Vec::new();
    while cursor.advance().await? {
        items.push(decode(cursor.deserialize_current()?)?);
    }
    Ok(items)
}

fn number(value: Option<&Bson>) -> f64 {
    match value {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        _ => 0.0,
    }
}

fn update_outcome(result: mongodb::results::UpdateResult) -> UpdateOutcome {
    UpdateOutcome {
        acknowledged: true,
        matched_count: result.matched_count,
        modified_count: result.modified_count,
        upserted_count: u64::from(result.upserted_id.is_some()),
        upserted_id: result.upserted_id.as_ref().map(id_string),
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        collect(self.users.find(doc! {}).await?).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.users
            .find_one(doc! { "email": email })
            .await?
            .map(decode)
            .transpose()
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<CreateOutcome> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Ok(CreateOutcome::AlreadyExists);
        }
        self.insert_unique(&self.users, to_document(&user)?).await
    }

    async fn promote_to_admin(&self, id: &str) -> StoreResult<UpdateOutcome> {
        let oid = parse_object_id(id)?;
        let result = self
            .users
            .update_one(doc! { "_id": oid }, doc! { "$set": { "role": ROLE_ADMIN } })
            .await?;
        Ok(update_outcome(result))
    }

    async fn delete_user(&self, id: &str) -> StoreResult<DeleteOutcome> {
        let oid = parse_object_id(id)?;
        let result = self.users.delete_one(doc! { "_id": oid }).await?;
        Ok(DeleteOutcome::acknowledged(result.deleted_count))
    }
}

#[async_trait]
impl MenuStore for MongoStore {
    async fn list_menu(&self) -> StoreResult<Vec<MenuItem>> {
        collect(self.menu.find(doc! {}).await?).await
    }

    async fn find_menu_item(&self, id: &str) -> StoreResult<Option<MenuItem>> {
        let oid = parse_object_id(id)?;
        self.menu.find_one(doc! { "_id": oid }).await?.map(decode).transpose()
    }

    async fn insert_menu_item(&self, item: NewMenuItem) -> StoreResult<CreateOutcome> {
        let existing = self
            .menu
            .find_one(doc! { "name": &item.name, "category": &item.category, "price": item.price })
            .await?;
        if existing.is_some() {
            return Ok(CreateOutcome::AlreadyExists);
        }
        self.insert_unique(&self.menu, to_document(&item)?).await
    }

    async fn update_menu_item(&self, id: &str, patch: MenuItemPatch) -> StoreResult<UpdateOutcome> {
        let oid = parse_object_id(id)?;
        if patch.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }
        match self
            .menu
            .update_one(doc! { "_id": oid }, doc! { "$set": to_document(&patch)? })
            .await
        {
            Ok(result) => Ok(update_outcome(result)),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::DuplicateDish),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_menu_item(&self, id: &str) -> StoreResult<DeleteOutcome> {
        let oid = parse_object_id(id)?;
        let result = self.menu.delete_one(doc! { "_id": oid }).await?;
        Ok(DeleteOutcome::acknowledged(result.deleted_count))
    }
}

#[async_trait]
impl ReviewStore for MongoStore {
    async fn list_reviews(&self) -> StoreResult<Vec<Review>> {
        collect(self.reviews.find(doc! {}).await?).await
    }
}

#[async_trait]
impl CartStore for MongoStore {
    async fn list_cart(&self, email: &str) -> StoreResult<Vec<CartItem>> {
        collect(self.carts.find(doc! { "email": email }).await?).await
    }

    async fn insert_cart_item(&self, item: NewCartItem) -> StoreResult<InsertOutcome> {
        let result = self.carts.insert_one(to_document(&item)?).await?;
        Ok(InsertOutcome::acknowledged(id_string(&result.inserted_id)))
    }

    async fn delete_cart_item(&self, id: &str, owner: &str) -> StoreResult<DeleteOutcome> {
        let oid = parse_object_id(id)?;
        let result = self.carts.delete_one(doc! { "_id": oid, "email": owner }).await?;
        Ok(DeleteOutcome::acknowledged(result.deleted_count))
    }
}

#[async_trait]
impl PaymentStore for MongoStore {
    async fn list_payments(&self, email: &str) -> StoreResult<Vec<Payment>> {
        collect(self.payments.find(doc! { "email": email }).await?).await
    }

    async fn record_payment(&self, payment: NewPayment) -> StoreResult<PaymentReceipt> {
        let cart_ids = payment
            .cart_ids
            .iter()
            .map(|id| parse_object_id(id))
            .collect::<StoreResult<Vec<ObjectId>>>()?;
        let record = payment.into_record(Utc::now());
        let cart_rows = doc! { "_id": { "$in": cart_ids }, "email": record.email.as_str() };
        let document = payment_document(&record)?;

        if self.transactions {
            self.record_in_transaction(document, cart_rows).await
        } else {
            self.record_sequentially(document, cart_rows).await
        }
    }
}

#[async_trait]
impl ReportStore for MongoStore {
    async fn admin_stats(&self) -> StoreResult<AdminStats> {
        let customers = self
            .users
            .count_documents(doc! { "role": { "$ne": ROLE_ADMIN } })
            .await?;
        let products = self.menu.estimated_document_count().await?;
        let orders = self.payments.estimated_document_count().await?;

        let mut cursor = self
            .payments
            .aggregate(vec![doc! {
                "$group": { "_id": Bson::Null, "totalRevenue": { "$sum": "$price" } }
            }])
            .await?;
        let total_revenue = if cursor.advance().await? {
            let row = cursor.deserialize_current()?;
            round_cents(number(row.get("totalRevenue")))
        } else {
            0.0
        };

        Ok(AdminStats { customers, products, orders, total_revenue })
    }

    async fn order_stats(&self) -> StoreResult<Vec<CategoryStat>> {
        let pipeline = vec![
            doc! { "$unwind": "$menuItemIds" },
            doc! { "$addFields": { "menuObjectId": {
                "$convert": { "input": "$menuItemIds", "to": "objectId", "onError": Bson::Null, "onNull": Bson::Null }
            } } },
            doc! { "$lookup": {
                "from": MENU_COLLECTION,
                "localField": "menuObjectId",
                "foreignField": "_id",
                "as": "menuItems",
            } },
            doc! { "$unwind": "$menuItems" },
            doc! { "$group": {
                "_id": "$menuItems.category",
                "quantity": { "$sum": 1 },
                "revenue": { "$sum": "$menuItems.price" },
            } },
            doc! { "$project": { "_id": 0, "category": "$_id", "quantity": 1, "revenue": 1 } },
            doc! { "$sort": { "category": 1 } },
        ];

        let mut cursor = self.payments.aggregate(pipeline).await?;
        let mut rows = Vec::new();
        while cursor.advance().await? {
            let row = cursor.deserialize_current()?;
            rows.push(CategoryStat {
                category: row.get_str("category").unwrap_or_default().to_string(),
                quantity: number(row.get("quantity")) as u64,
                revenue: round_cents(number(row.get("revenue"))),
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_renders_object_ids_as_hex() {
        let oid = ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").unwrap();
        let item: MenuItem = decode(doc! {
            "_id": oid,
            "name": "Caesar",
            "recipe": "Romaine",
            "image": "caesar.jpg",
            "category": "salad",
            "price": 9,
        })
        .unwrap();
        assert_eq!(item.id, "64b7f0c2a1b2c3d4e5f60718");
        assert_eq!(item.price, 9.0);
    }

    #[test]
    fn patch_sets_only_supplied_fields() {
        let patch = MenuItemPatch { price: Some(7.5), ..MenuItemPatch::default() };
        let set = to_document(&patch).unwrap();
        assert_eq!(set, doc! { "price": 7.5 });
    }

    fn record_at(date: &str) -> PaymentRecord {
        NewPayment {
            email: "a@b.test".into(),
            price: 12.5,
            transaction_id: Some("tx_1".into()),
            date: Some(date.parse().unwrap()),
            cart_ids: vec![],
            menu_item_ids: vec![],
            status: None,
        }
        .into_record(Utc::now())
    }

    #[test]
    fn payment_dates_are_written_as_bson_dates() {
        let record = record_at("2024-03-01T12:30:00Z");
        let document = payment_document(&record).unwrap();
        let stored = document.get_datetime("date").unwrap();
        assert_eq!(stored.timestamp_millis(), record.date.timestamp_millis());
    }

    #[test]
    fn decode_reads_bson_dates_back() {
        let record = record_at("2024-03-01T12:30:00.250Z");
        let mut document = payment_document(&record).unwrap();
        document.insert("_id", ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").unwrap());

        let payment: Payment = decode(document).unwrap();
        assert_eq!(payment.date, record.date);
        assert_eq!(payment.status, "pending");
    }

    #[test]
    fn decode_still_reads_string_dates() {
        let payment: Payment = decode(doc! {
            "_id": "64b7f0c2a1b2c3d4e5f60718",
            "email": "a@b.test",
            "price": 3.0,
            "date": "2023-11-05T08:00:00Z",
            "status": "paid",
        })
        .unwrap();
        assert_eq!(payment.date.to_rfc3339(), "2023-11-05T08:00:00+00:00");
    }

    #[test]
    fn numbers_accept_every_numeric_bson_type() {
        assert_eq!(number(Some(&Bson::Int32(3))), 3.0);
        assert_eq!(number(Some(&Bson::Int64(4))), 4.0);
        assert_eq!(number(Some(&Bson::Double(4.5))), 4.5);
        assert_eq!(number(None), 0.0);
    }
}
