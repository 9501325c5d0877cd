use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::RideRepository;
use crate::models::Ride;
use crate::utils::AppError;

/// Caronas em memória, carregadas de `rides.json` na inicialização.
///
/// Com `persist` ligado, o arquivo inteiro é regravado após cada mutação.
pub struct JsonRideStore {
    rides: RwLock<Vec<Ride>>,
    path: Option<PathBuf>,
}

impl JsonRideStore {
    /// Loads `path` record by record.
    ///
    /// Invalid records are skipped (the original file is kept as `.bak`).
    /// If the file exists but cannot be read or parsed, persistence is turned
    /// off so the file is never overwritten.
    pub async fn load(path: &Path, persist: bool) -> Self {
        let (rides, writable) = match tokio::fs::read_to_string(path).await {
            Ok(data) => match serde_json::from_str::<Vec<serde_json::Value>>(&data) {
                Ok(records) => Self::parse_records(path, records).await,
                Err(e) => {
                    log::error!(
                        "❌ Could not parse {}: {}, starting empty with persistence DISABLED",
                        path.display(),
                        e
                    );
                    (Vec::new(), false)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("⚠️  {} not found, starting empty", path.display());
                (Vec::new(), true)
            }
            Err(e) => {
                log::error!(
                    "❌ Could not read {}: {}, starting empty with persistence DISABLED",
                    path.display(),
                    e
                );
                (Vec::new(), false)
            }
        };

        JsonRideStore {
            rides: RwLock::new(rides),
            path: (persist && writable).then(|| path.to_path_buf()),
        }
    }

    async fn parse_records(path: &Path, records: Vec<serde_json::Value>) -> (Vec<Ride>, bool) {
        let total = records.len();
        let rides: Vec<Ride> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value::<Ride>(record) {
                Ok(ride) => Some(ride),
                Err(e) => {
                    log::warn!("⚠️  Skipping ride #{} in {}: {}", index, path.display(), e);
                    None
                }
            })
            .collect();

        log::info!("✅ Loaded {} of {} rides from {}", rides.len(), total, path.display());

        if rides.len() == total {
            return (rides, true);
        }

        // guarda o arquivo original antes da primeira regravação
        let backup = backup_path(path);
        match tokio::fs::copy(path, &backup).await {
            Ok(_) => {
                log::warn!("⚠️  Original rides file kept at {}", backup.display());
                (rides, true)
            }
            Err(e) => {
                log::error!("❌ Could not back up {}: {}, persistence DISABLED", path.display(), e);
                (rides, false)
            }
        }
    }

    #[cfg(test)]
    pub fn in_memory(rides: Vec<Ride>) -> Self {
        JsonRideStore {
            rides: RwLock::new(rides),
            path: None,
        }
    }

    /// Grava `next` e só então troca o conteúdo em memória
    async fn commit(&self, rides: &mut Vec<Ride>, next: Vec<Ride>) -> Result<(), AppError> {
        self.flush(&next).await?;
        *rides = next;
        Ok(())
    }

    async fn flush(&self, rides: &[Ride]) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::DatabaseError(format!("Failed to create data dir: {}", e)))?;
            }
        }

        let json = serde_json::to_string_pretty(rides)
            .map_err(|e| AppError::DatabaseError(format!("Failed to serialize rides: {}", e)))?;

        // grava num temporário e renomeia para não deixar o arquivo pela metade
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to write rides: {}", e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to replace rides file: {}", e)))?;

        Ok(())
    }

    async fn filtered<F>(&self, keep: F) -> Vec<Ride>
    where
        F: Fn(&Ride) -> bool,
    {
        self.rides
            .read()
            .await
            .iter()
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }
}

fn backup_path(path: &Path) -> PathBuf {
    path.with_extension("json.bak")
}

#[async_trait]
impl RideRepository for JsonRideStore {
    async fn all(&self) -> Result<Vec<Ride>, AppError> {
        Ok(self.rides.read().await.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Ride>, AppError> {
        Ok(self.rides.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_school(&self, school: &str) -> Result<Vec<Ride>, AppError> {
        Ok(self.filtered(|r| r.school == school).await)
    }

    async fn find_by_driver(&self, email: &str) -> Result<Vec<Ride>, AppError> {
        Ok(self.filtered(|r| r.driver_email == email).await)
    }

    async fn find_by_passenger(&self, email: &str) -> Result<Vec<Ride>, AppError> {
        Ok(self.filtered(|r| r.has_passenger(email)).await)
    }

    async fn find_by_pending(&self, email: &str) -> Result<Vec<Ride>, AppError> {
        Ok(self.filtered(|r| r.has_pending(email)).await)
    }

    async fn insert(&self, ride: &Ride) -> Result<(), AppError> {
        let mut rides = self.rides.write().await;
        let mut next = rides.clone();
        next.push(ride.clone());
        self.commit(&mut rides, next).await
    }

    async fn replace(&self, ride: &Ride) -> Result<bool, AppError> {
        let mut rides = self.rides.write().await;
        let Some(index) = rides.iter().position(|r| r.id == ride.id) else {
            return Ok(false);
        };

        let mut next = rides.clone();
        next[index] = ride.clone();
        self.commit(&mut rides, next).await?;
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut rides = self.rides.write().await;
        let next: Vec<Ride> = rides.iter().filter(|r| r.id != id).cloned().collect();
        if next.len() == rides.len() {
            return Ok(false);
        }

        self.commit(&mut rides, next).await?;
        Ok(true)
    }

    fn backend(&self) -> &'static str {
        "json"
    }
}
