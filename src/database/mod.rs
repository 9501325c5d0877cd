use async_trait::async_trait;
use mongodb::{Client, Collection, Database};
use std::error::Error;

use crate::models::Ride;
use crate::utils::AppError;

pub mod json_store;
pub mod mongo_store;

pub use json_store::JsonRideStore;
pub use mongo_store::MongoRideStore;

/// Armazenamento de caronas.
///
/// Implementações só guardam e devolvem registros; as regras de negócio
/// ficam em `RideService`, que serializa as sequências ler-modificar-gravar.
#[async_trait]
pub trait RideRepository: Send + Sync {
    async fn all(&self) -> Result<Vec<Ride>, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Ride>, AppError>;

    async fn find_by_school(&self, school: &str) -> Result<Vec<Ride>, AppError>;

    async fn find_by_driver(&self, email: &str) -> Result<Vec<Ride>, AppError>;

    async fn find_by_passenger(&self, email: &str) -> Result<Vec<Ride>, AppError>;

    async fn find_by_pending(&self, email: &str) -> Result<Vec<Ride>, AppError>;

    async fn insert(&self, ride: &Ride) -> Result<(), AppError>;

    /// Returns false when no ride with that id exists
    async fn replace(&self, ride: &Ride) -> Result<bool, AppError>;

    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    /// Name reported by `/health`
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .rsplit('/')
            .next()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("gotogether");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates necessary indexes for the ride queries
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let rides = self.database().collection::<mongodb::bson::Document>(mongo_store::RIDES_COLLECTION);

        let indexes = vec![
            (
                "rides(id)",
                IndexModel::builder()
                    .keys(doc! { "id": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            ),
            ("rides(school)", IndexModel::builder().keys(doc! { "school": 1 }).build()),
            ("rides(driverEmail)", IndexModel::builder().keys(doc! { "driverEmail": 1 }).build()),
            ("rides(passengers)", IndexModel::builder().keys(doc! { "passengers": 1 }).build()),
            ("rides(status.status)", IndexModel::builder().keys(doc! { "status.status": 1 }).build()),
        ];

        for (name, index) in indexes {
            match rides.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", name),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Check if the connection is healthy
    pub async fn health_check(&self) -> Result<bool, AppError> {
        self.db.list_collection_names().await?;
        Ok(true)
    }
}
