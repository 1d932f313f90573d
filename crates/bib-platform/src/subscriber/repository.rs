//! Subscriber Store
//!
//! Narrow storage contract for subscriber records. The domain depends only
//! on this trait; backends are interchangeable. `MongoSubscriberStore` is the
//! production backend, `InMemorySubscriberStore` serves embedded mode and
//! tests.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};
use parking_lot::RwLock;

use super::entity::Subscriber;
use crate::shared::error::Result;

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Insert or replace the record with the subscriber's id.
    async fn save(&self, subscriber: &Subscriber) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Subscriber>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Subscriber>>;

    async fn find_all(&self) -> Result<Vec<Subscriber>>;

    async fn find_active(&self) -> Result<Vec<Subscriber>>;

    async fn find_loyal(&self) -> Result<Vec<Subscriber>>;

    async fn find_penalized(&self) -> Result<Vec<Subscriber>>;

    /// Case-insensitive substring match against name or surname.
    async fn search(&self, keyword: &str) -> Result<Vec<Subscriber>>;

    async fn count_loyal(&self) -> Result<u64>;
}

pub struct MongoSubscriberStore {
    collection: Collection<Subscriber>,
}

impl MongoSubscriberStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("subscribers"),
        }
    }
}

#[async_trait]
impl SubscriberStore for MongoSubscriberStore {
    async fn save(&self, subscriber: &Subscriber) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &subscriber.id }, subscriber)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Subscriber>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Subscriber>> {
        Ok(self.collection.find_one(doc! { "phone": phone }).await?)
    }

    async fn find_all(&self) -> Result<Vec<Subscriber>> {
        let cursor = self.collection.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_active(&self) -> Result<Vec<Subscriber>> {
        let cursor = self.collection.find(doc! { "active": true }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_loyal(&self) -> Result<Vec<Subscriber>> {
        let cursor = self.collection.find(doc! { "isLoyal": true }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_penalized(&self) -> Result<Vec<Subscriber>> {
        let cursor = self.collection.find(doc! { "hasPenalty": true }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Subscriber>> {
        use mongodb::bson::Regex;
        let pattern = Regex {
            pattern: keyword.to_string(),
            options: "i".to_string(),
        };
        let cursor = self
            .collection
            .find(doc! {
                "$or": [
                    { "name": { "$regex": &pattern } },
                    { "surname": { "$regex": &pattern } }
                ]
            })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_loyal(&self) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "isLoyal": true })
            .await?)
    }
}

/// In-memory backend. Listing order is insertion order.
pub struct InMemorySubscriberStore {
    records: RwLock<Vec<Subscriber>>,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemorySubscriberStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn save(&self, subscriber: &Subscriber) -> Result<()> {
        let mut records = self.records.write();
        match records.iter_mut().find(|s| s.id == subscriber.id) {
            Some(existing) => *existing = subscriber.clone(),
            None => records.push(subscriber.clone()),
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Subscriber>> {
        Ok(self.records.read().iter().find(|s| s.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|s| s.email == email)
            .cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Subscriber>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|s| s.phone == phone)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Subscriber>> {
        Ok(self.records.read().clone())
    }

    async fn find_active(&self) -> Result<Vec<Subscriber>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|s| s.active)
            .cloned()
            .collect())
    }

    async fn find_loyal(&self) -> Result<Vec<Subscriber>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|s| s.is_loyal)
            .cloned()
            .collect())
    }

    async fn find_penalized(&self) -> Result<Vec<Subscriber>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|s| s.has_penalty)
            .cloned()
            .collect())
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Subscriber>> {
        let keyword = keyword.to_lowercase();
        Ok(self
            .records
            .read()
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&keyword)
                    || s.surname.to_lowercase().contains(&keyword)
            })
            .cloned()
            .collect())
    }

    async fn count_loyal(&self) -> Result<u64> {
        Ok(self.records.read().iter().filter(|s| s.is_loyal).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::entity::Gender;

    fn subscriber(name: &str, surname: &str, email: &str, phone: &str) -> Subscriber {
        Subscriber::new(name, surname, email, phone, 30, Gender::Other)
    }

    #[tokio::test]
    async fn test_save_then_find() {
        let store = InMemorySubscriberStore::new();
        let s = subscriber("Victor", "Hugo", "victor@bibliotheque.org", "+331");
        store.save(&s).await.unwrap();

        assert_eq!(store.find_by_id(&s.id).await.unwrap().unwrap().id, s.id);
        assert!(store
            .find_by_email("victor@bibliotheque.org")
            .await
            .unwrap()
            .is_some());
        assert!(store.find_by_phone("+331").await.unwrap().is_some());
        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_existing_record() {
        let store = InMemorySubscriberStore::new();
        let mut s = subscriber("Victor", "Hugo", "victor@bibliotheque.org", "+331");
        store.save(&s).await.unwrap();

        s.consecutive_subscriptions = 2;
        store.save(&s).await.unwrap();

        assert_eq!(store.find_all().await.unwrap().len(), 1);
        assert_eq!(
            store
                .find_by_id(&s.id)
                .await
                .unwrap()
                .unwrap()
                .consecutive_subscriptions,
            2
        );
    }

    #[tokio::test]
    async fn test_listing_preserves_insertion_order() {
        let store = InMemorySubscriberStore::new();
        let a = subscriber("A", "Aa", "a@x.org", "+1");
        let b = subscriber("B", "Bb", "b@x.org", "+2");
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all[0].id, a.id);
        assert_eq!(all[1].id, b.id);
    }

    #[tokio::test]
    async fn test_filtered_listings() {
        let store = InMemorySubscriberStore::new();

        let mut loyal = subscriber("Loyal", "One", "l@x.org", "+1");
        loyal.consecutive_subscriptions = 3;
        loyal.is_loyal = true;

        let mut penalized = subscriber("Bad", "Apple", "p@x.org", "+2");
        penalized.has_penalty = true;

        let mut inactive = subscriber("Gone", "Away", "g@x.org", "+3");
        inactive.active = false;

        for s in [&loyal, &penalized, &inactive] {
            store.save(s).await.unwrap();
        }

        assert_eq!(store.find_active().await.unwrap().len(), 2);
        assert_eq!(store.find_loyal().await.unwrap().len(), 1);
        assert_eq!(store.find_penalized().await.unwrap().len(), 1);
        assert_eq!(store.count_loyal().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let store = InMemorySubscriberStore::new();
        store
            .save(&subscriber("Gabriel", "Marquez", "g@x.org", "+1"))
            .await
            .unwrap();
        store
            .save(&subscriber("Isabel", "Allende", "i@x.org", "+2"))
            .await
            .unwrap();

        assert_eq!(store.search("MARQ").await.unwrap().len(), 1);
        assert_eq!(store.search("abel").await.unwrap().len(), 1);
        assert_eq!(store.search("el").await.unwrap().len(), 2);
        assert!(store.search("zz").await.unwrap().is_empty());
    }
}
