use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::Collection;

use super::{MongoDB, RideRepository};
use crate::models::Ride;
use crate::utils::AppError;

pub const RIDES_COLLECTION: &str = "rides";

/// Caronas na coleção `rides` do MongoDB
pub struct MongoRideStore {
    db: MongoDB,
    rides: Collection<Ride>,
}

impl MongoRideStore {
    pub fn new(db: MongoDB) -> Self {
        let rides = db.collection::<Ride>(RIDES_COLLECTION);
        MongoRideStore { db, rides }
    }

    async fn find_many(&self, filter: Document) -> Result<Vec<Ride>, AppError> {
        let cursor = self.rides.find(filter).await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl RideRepository for MongoRideStore {
    async fn all(&self) -> Result<Vec<Ride>, AppError> {
        self.find_many(doc! {}).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Ride>, AppError> {
        Ok(self.rides.find_one(doc! { "id": id }).await?)
    }

    async fn find_by_school(&self, school: &str) -> Result<Vec<Ride>, AppError> {
        self.find_many(doc! { "school": school }).await
    }

    async fn find_by_driver(&self, email: &str) -> Result<Vec<Ride>, AppError> {
        self.find_many(doc! { "driverEmail": email }).await
    }

    async fn find_by_passenger(&self, email: &str) -> Result<Vec<Ride>, AppError> {
        // igualdade em campo de array casa qualquer elemento
        self.find_many(doc! { "passengers": email }).await
    }

    async fn find_by_pending(&self, email: &str) -> Result<Vec<Ride>, AppError> {
        self.find_many(doc! { "pendingRequests": email }).await
    }

    async fn insert(&self, ride: &Ride) -> Result<(), AppError> {
        self.rides.insert_one(ride).await?;
        Ok(())
    }

    async fn replace(&self, ride: &Ride) -> Result<bool, AppError> {
        let result = self.rides.replace_one(doc! { "id": &ride.id }, ride).await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = self.rides.delete_one(doc! { "id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.db.health_check().await.map(|_| ())
    }
}
