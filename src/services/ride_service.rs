use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::LimiterConfig;
use crate::database::RideRepository;
use crate::models::ride::deserialize_optional_seats;
use crate::models::{parse_departure, Ride, RideError, RideStatus, RideStatusKind, StatusThresholds, StatusTransition, MAX_SEATS};
use crate::services::geo_service::{GeoService, DEFAULT_RADIUS_MILES};
use crate::services::request_limiter::RequestLimiter;
use crate::utils::{haversine_miles, round_to, AppError};

// Request/Response structures
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequest {
    pub from: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub departure_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_seats")]
    pub seats_available: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRideRequest {
    pub notes: Option<String>,
    pub departure_date: Option<String>,
    pub departure_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_seats")]
    pub seats_available: Option<u32>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct SearchRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    pub radius: Option<f64>,
    pub school: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PassengerActionRequest {
    pub email: String,
}

/// Resultado de uma varredura do ciclo de vida
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct SweepSummary {
    pub total: usize,
    pub auto_completed: usize,
    pub marked_for_delete: usize,
    pub hard_deleted: usize,
}

impl SweepSummary {
    pub fn changed(&self) -> bool {
        self.auto_completed > 0 || self.marked_for_delete > 0 || self.hard_deleted > 0
    }
}

/// Regras de negócio das caronas.
///
/// Toda sequência ler-modificar-gravar passa por `write_lock`, então pedidos,
/// aprovações e a varredura de status nunca se intercalam.
pub struct RideService {
    repo: Arc<dyn RideRepository>,
    write_lock: Mutex<()>,
    limiter: RequestLimiter,
    thresholds: StatusThresholds,
    utc_offset: FixedOffset,
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn sort_by_departure(rides: &mut [Ride]) {
    rides.sort_by(|a, b| {
        (&a.departure_date, &a.departure_time).cmp(&(&b.departure_date, &b.departure_time))
    });
}

fn ensure_driver(ride: &Ride, email: &str) -> Result<(), AppError> {
    if ride.is_driver(email) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the driver can manage this ride".to_string()))
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Ride not found".to_string())
}

impl RideService {
    pub fn new(
        repo: Arc<dyn RideRepository>,
        limiter: LimiterConfig,
        thresholds: StatusThresholds,
        utc_offset: FixedOffset,
    ) -> Self {
        RideService {
            repo,
            write_lock: Mutex::new(()),
            limiter: RequestLimiter::new(limiter),
            thresholds,
            utc_offset,
        }
    }

    pub fn repository(&self) -> &dyn RideRepository {
        self.repo.as_ref()
    }

    pub fn limiter(&self) -> &RequestLimiter {
        &self.limiter
    }

    /// Aplica `change` à carona sob o lock e grava o resultado
    async fn mutate<F>(&self, id: &str, change: F) -> Result<Ride, AppError>
    where
        F: FnOnce(&mut Ride) -> Result<(), AppError>,
    {
        let _guard = self.write_lock.lock().await;

        let mut ride = self.repo.find_by_id(id).await?.ok_or_else(not_found)?;
        change(&mut ride)?;

        if !self.repo.replace(&ride).await? {
            return Err(not_found());
        }
        Ok(ride)
    }

    // ==================== QUERIES ====================

    pub async fn get(&self, id: &str) -> Result<Ride, AppError> {
        self.repo.find_by_id(id).await?.ok_or_else(not_found)
    }

    pub async fn school_rides(&self, school: &str) -> Result<Vec<Ride>, AppError> {
        let mut rides = self.repo.find_by_school(school.trim()).await?;
        sort_by_departure(&mut rides);
        Ok(rides)
    }

    /// Com origem e destino informados o raio é ignorado
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Ride>, AppError> {
        let school = blank_to_none(request.school.as_deref())
            .ok_or_else(|| AppError::InvalidRequest("School parameter required".to_string()))?;
        let from = blank_to_none(request.from.as_deref());
        let to = blank_to_none(request.to.as_deref());
        let radius = request.radius.unwrap_or(DEFAULT_RADIUS_MILES);

        let mut rides: Vec<Ride> = self
            .repo
            .find_by_school(school)
            .await?
            .into_iter()
            .filter(|ride| ride.status.status != RideStatusKind::Delete)
            .filter(|ride| {
                if from.is_some_and(|f| f != ride.from) {
                    return false;
                }
                if to.is_some_and(|t| t != ride.destination) {
                    return false;
                }
                if from.is_some() && to.is_some() {
                    return true;
                }
                radius >= ride.distance
            })
            .collect();

        sort_by_departure(&mut rides);
        log::debug!("🔎 Search in {}: {} rides match", school, rides.len());
        Ok(rides)
    }

    pub async fn created_by(&self, email: &str) -> Result<Vec<Ride>, AppError> {
        let mut rides = self.repo.find_by_driver(email).await?;
        sort_by_departure(&mut rides);
        Ok(rides)
    }

    pub async fn joined_by(&self, email: &str) -> Result<Vec<Ride>, AppError> {
        let mut rides = self.repo.find_by_passenger(email).await?;
        sort_by_departure(&mut rides);
        Ok(rides)
    }

    pub async fn requested_by(&self, email: &str) -> Result<Vec<Ride>, AppError> {
        let mut rides = self.repo.find_by_pending(email).await?;
        sort_by_departure(&mut rides);
        Ok(rides)
    }

    // ==================== DRIVER OPERATIONS ====================

    pub async fn create(
        &self,
        driver_email: &str,
        school: &str,
        request: &CreateRideRequest,
        geo: &GeoService,
        now: DateTime<Utc>,
    ) -> Result<Ride, AppError> {
        let missing = || AppError::InvalidRequest("Missing required fields".to_string());

        let from = blank_to_none(request.from.as_deref()).ok_or_else(missing)?;
        let destination = blank_to_none(request.destination.as_deref()).ok_or_else(missing)?;
        let departure_date = blank_to_none(request.departure_date.as_deref()).ok_or_else(missing)?;
        let departure_time = blank_to_none(request.departure_time.as_deref()).ok_or_else(missing)?;
        let seats = request.seats_available.filter(|s| *s > 0).ok_or_else(missing)?;
        if seats > MAX_SEATS {
            return Err(RideError::InvalidSeats.into());
        }

        let school = school.trim();
        if school.is_empty() {
            return Err(AppError::InvalidRequest("Missing school".to_string()));
        }

        if parse_departure(departure_date, departure_time).is_none() {
            return Err(RideError::InvalidDeparture.into());
        }

        // Um dos extremos precisa ser um campus; o outro é "Cidade, Estado"
        let coords = if let Some(campus) = geo.find_university(from) {
            geo.find_city(destination)
                .map(|city| (campus.lat, campus.lng, city.lat, city.lng))
        } else if let Some(campus) = geo.find_university(destination) {
            geo.find_city(from)
                .map(|city| (city.lat, city.lng, campus.lat, campus.lng))
        } else {
            return Err(AppError::InvalidRequest("One location must be a campus".to_string()));
        };

        let (from_lat, from_lng, to_lat, to_lng) = coords
            .ok_or_else(|| AppError::InvalidRequest("Invalid from or destination".to_string()))?;

        let ride = Ride {
            id: Uuid::new_v4().to_string(),
            driver_email: driver_email.to_string(),
            school: school.to_string(),
            from: from.to_string(),
            destination: destination.to_string(),
            departure_date: departure_date.to_string(),
            departure_time: departure_time.to_string(),
            seats_available: seats,
            notes: request.notes.as_deref().unwrap_or("").trim().to_string(),
            distance: round_to(haversine_miles(from_lat, from_lng, to_lat, to_lng), 2),
            passengers: Vec::new(),
            pending_requests: Vec::new(),
            created_at: now,
            status: RideStatus::default(),
        };

        let _guard = self.write_lock.lock().await;
        self.repo.insert(&ride).await?;

        log::info!("🚗 Ride created: {} ({}) by {}", ride.id, ride.route(), driver_email);
        Ok(ride)
    }

    pub async fn update(&self, id: &str, driver_email: &str, request: &UpdateRideRequest) -> Result<Ride, AppError> {
        self.mutate(id, |ride| {
            ensure_driver(ride, driver_email)?;
            if ride.status.status != RideStatusKind::Active {
                return Err(RideError::NotActive(ride.status.status).into());
            }

            let date = blank_to_none(request.departure_date.as_deref())
                .unwrap_or(&ride.departure_date)
                .to_string();
            let time = blank_to_none(request.departure_time.as_deref())
                .unwrap_or(&ride.departure_time)
                .to_string();
            if parse_departure(&date, &time).is_none() {
                return Err(RideError::InvalidDeparture.into());
            }

            if let Some(seats) = request.seats_available {
                ride.set_capacity(seats)?;
            }
            if let Some(notes) = &request.notes {
                ride.notes = notes.trim().to_string();
            }
            ride.departure_date = date;
            ride.departure_time = time;
            Ok(())
        })
        .await
    }

    pub async fn delete(&self, id: &str, driver_email: &str) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;

        let ride = self.repo.find_by_id(id).await?.ok_or_else(not_found)?;
        ensure_driver(&ride, driver_email)?;

        if !self.repo.delete(id).await? {
            return Err(not_found());
        }
        log::info!("🗑️  Ride deleted by driver: {} ({})", id, ride.route());
        Ok(())
    }

    pub async fn approve(&self, id: &str, driver_email: &str, passenger: &str) -> Result<Ride, AppError> {
        let ride = self
            .mutate(id, |ride| {
                ensure_driver(ride, driver_email)?;
                ride.approve(passenger)?;
                Ok(())
            })
            .await?;

        log::info!("✅ Request approved: {} joined ride {}", passenger, id);
        Ok(ride)
    }

    pub async fn reject(
        &self,
        id: &str,
        driver_email: &str,
        passenger: &str,
        now: DateTime<Utc>,
    ) -> Result<Ride, AppError> {
        let mut removed = false;
        let ride = self
            .mutate(id, |ride| {
                ensure_driver(ride, driver_email)?;
                removed = ride.reject(passenger);
                Ok(())
            })
            .await?;

        // só quem tinha pedido pendente entra em cooldown
        if removed {
            self.limiter.set_cooldown(passenger, id, now);
            log::info!("🚫 Request rejected: {} on ride {}", passenger, id);
        }
        Ok(ride)
    }

    pub async fn remove_passenger(
        &self,
        id: &str,
        driver_email: &str,
        passenger: &str,
        now: DateTime<Utc>,
    ) -> Result<Ride, AppError> {
        let ride = self
            .mutate(id, |ride| {
                ensure_driver(ride, driver_email)?;
                ride.remove_passenger(passenger)?;
                Ok(())
            })
            .await?;

        self.limiter.set_cooldown(passenger, id, now);
        log::info!("➖ Passenger {} removed from ride {}", passenger, id);
        Ok(ride)
    }

    pub async fn mark_completed(&self, id: &str, driver_email: &str, now: DateTime<Utc>) -> Result<Ride, AppError> {
        let ride = self
            .mutate(id, |ride| {
                ensure_driver(ride, driver_email)?;
                ride.mark_completed(now)?;
                Ok(())
            })
            .await?;

        log::debug!("Ride manually marked as completed: {} ({})", ride.id, ride.route());
        Ok(ride)
    }

    pub async fn unmark_completed(&self, id: &str, driver_email: &str, now: DateTime<Utc>) -> Result<Ride, AppError> {
        let ride = self
            .mutate(id, |ride| {
                ensure_driver(ride, driver_email)?;
                ride.unmark_completed(now, self.utc_offset, &self.thresholds)?;
                Ok(())
            })
            .await?;

        log::debug!("Ride unmarked from completed: {} ({})", ride.id, ride.route());
        Ok(ride)
    }

    // ==================== PASSENGER OPERATIONS ====================

    pub async fn request_to_join(&self, id: &str, email: &str, now: DateTime<Utc>) -> Result<Ride, AppError> {
        self.limiter.check_cooldown(email, id, now)?;
        self.limiter.check_request_limit(email, now)?;

        let ride = self
            .mutate(id, |ride| {
                ride.request_to_join(email)?;
                Ok(())
            })
            .await?;

        log::info!("🙋 {} requested to join ride {}", email, id);
        Ok(ride)
    }

    /// Entrada direta, mantida para clientes antigos
    pub async fn join(&self, id: &str, email: &str, now: DateTime<Utc>) -> Result<Ride, AppError> {
        self.limiter.check_cooldown(email, id, now)?;

        let ride = self
            .mutate(id, |ride| {
                ride.join(email)?;
                Ok(())
            })
            .await?;

        log::info!("🙋 {} joined ride {}", email, id);
        Ok(ride)
    }

    pub async fn leave(&self, id: &str, email: &str, now: DateTime<Utc>) -> Result<Ride, AppError> {
        let ride = self
            .mutate(id, |ride| {
                ride.leave(email)?;
                Ok(())
            })
            .await?;

        self.limiter.set_cooldown(email, id, now);
        log::info!("👋 {} left ride {}", email, id);
        Ok(ride)
    }

    // ==================== STATUS LIFECYCLE ====================

    /// Uma passada do verificador: avança cada carona no máximo um passo
    pub async fn sweep_statuses(&self, now: DateTime<Utc>) -> Result<SweepSummary, AppError> {
        let _guard = self.write_lock.lock().await;

        let rides = self.repo.all().await?;
        let mut summary = SweepSummary {
            total: rides.len(),
            ..SweepSummary::default()
        };

        log::debug!("Checking ride statuses: {} rides at {}", rides.len(), now.to_rfc3339());

        for mut ride in rides {
            match ride.advance_status(now, self.utc_offset, &self.thresholds) {
                StatusTransition::None => {}
                StatusTransition::Completed => {
                    self.repo.replace(&ride).await?;
                    summary.auto_completed += 1;
                    log::debug!(
                        "Ride auto-marked as completed: {} ({}, departed {} {})",
                        ride.id,
                        ride.route(),
                        ride.departure_date,
                        ride.departure_time
                    );
                }
                StatusTransition::MarkedForDelete => {
                    self.repo.replace(&ride).await?;
                    summary.marked_for_delete += 1;
                    log::debug!("Ride marked for deletion: {} ({})", ride.id, ride.route());
                }
                StatusTransition::HardDelete => {
                    self.repo.delete(&ride.id).await?;
                    summary.hard_deleted += 1;
                    log::debug!("Ride hard-deleted: {} ({})", ride.id, ride.route());
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::JsonRideStore;
    use crate::services::geo_service::tests::sample_geo;
    use chrono::{Duration, TimeZone};

    pub fn service_with(rides: Vec<Ride>) -> RideService {
        RideService::new(
            Arc::new(JsonRideStore::in_memory(rides)),
            LimiterConfig::default(),
            StatusThresholds::default(),
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
    }

    fn create_request(from: &str, destination: &str) -> CreateRideRequest {
        CreateRideRequest {
            from: Some(from.to_string()),
            destination: Some(destination.to_string()),
            departure_date: Some("2025-10-09".to_string()),
            departure_time: Some("08:00".to_string()),
            seats_available: Some(2),
            notes: None,
        }
    }

    async fn created(service: &RideService, destination: &str) -> Ride {
        service
            .create(
                "driver@usu.edu",
                "Utah State University",
                &create_request("Utah State University", destination),
                &sample_geo(),
                now(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_computes_distance_from_campus() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;

        assert!(ride.distance > 35.0 && ride.distance < 40.0, "got {}", ride.distance);
        assert_eq!(ride.distance, round_to(ride.distance, 2));
        assert_eq!(ride.status, RideStatus::default());
        assert_eq!(service.get(&ride.id).await.unwrap().id, ride.id);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let service = service_with(vec![]);
        let geo = sample_geo();

        let mut missing = create_request("Utah State University", "Ogden, Utah");
        missing.seats_available = Some(0);
        let err = service
            .create("d@usu.edu", "Utah State University", &missing, &geo, now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields");

        let err = service
            .create("d@usu.edu", "Utah State University", &create_request("Ogden, Utah", "Logan, Utah"), &geo, now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "One location must be a campus");

        let err = service
            .create("d@usu.edu", "Utah State University", &create_request("Atlantis, Utah", "utah state university"), &geo, now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid from or destination");

        let mut bad_time = create_request("Utah State University", "Ogden, Utah");
        bad_time.departure_time = Some("8am".to_string());
        assert!(matches!(
            service.create("d@usu.edu", "Utah State University", &bad_time, &geo, now()).await,
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_request_approve_flow_respects_capacity() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;

        for email in ["a@usu.edu", "b@usu.edu", "c@usu.edu"] {
            service.request_to_join(&ride.id, email, now()).await.unwrap();
        }

        service.approve(&ride.id, "driver@usu.edu", "a@usu.edu").await.unwrap();
        service.approve(&ride.id, "driver@usu.edu", "b@usu.edu").await.unwrap();
        let err = service
            .approve(&ride.id, "driver@usu.edu", "c@usu.edu")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Ride is full");

        let ride = service.get(&ride.id).await.unwrap();
        assert_eq!(ride.passengers.len(), 2);
        assert_eq!(ride.pending_requests, vec!["c@usu.edu"]);
        assert_eq!(service.joined_by("a@usu.edu").await.unwrap().len(), 1);
        assert_eq!(service.requested_by("c@usu.edu").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_only_driver_can_approve() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;
        service.request_to_join(&ride.id, "a@usu.edu", now()).await.unwrap();

        assert!(matches!(
            service.approve(&ride.id, "a@usu.edu", "a@usu.edu").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.approve("missing", "driver@usu.edu", "a@usu.edu").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_approvals_never_overbook() {
        let service = Arc::new(service_with(vec![]));
        let ride = created(&service, "Ogden, Utah").await;

        let emails: Vec<String> = (0..6).map(|i| format!("p{}@usu.edu", i)).collect();
        for (i, email) in emails.iter().enumerate() {
            // cada pedido vem de um usuário diferente, então o limite não interfere
            service
                .request_to_join(&ride.id, email, now() + Duration::seconds(i as i64))
                .await
                .unwrap_or_else(|e| panic!("request {} failed: {}", email, e));
        }

        let handles: Vec<_> = emails
            .iter()
            .cloned()
            .map(|email| {
                let service = service.clone();
                let id = ride.id.clone();
                tokio::spawn(async move { service.approve(&id, "driver@usu.edu", &email).await })
            })
            .collect();

        let mut approved = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                approved += 1;
            }
        }

        assert_eq!(approved, 2);
        assert_eq!(service.get(&ride.id).await.unwrap().passengers.len(), 2);
    }

    #[tokio::test]
    async fn test_leave_sets_cooldown() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;

        service.request_to_join(&ride.id, "a@usu.edu", now()).await.unwrap();
        service.leave(&ride.id, "a@usu.edu", now()).await.unwrap();

        let err = service
            .request_to_join(&ride.id, "a@usu.edu", now() + Duration::minutes(2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(_)));

        service
            .request_to_join(&ride.id, "a@usu.edu", now() + Duration::minutes(11))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reject_and_remove_set_cooldown() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;

        service.request_to_join(&ride.id, "a@usu.edu", now()).await.unwrap();
        service.reject(&ride.id, "driver@usu.edu", "a@usu.edu", now()).await.unwrap();
        assert!(service.get(&ride.id).await.unwrap().pending_requests.is_empty());
        assert!(service.limiter().check_cooldown("a@usu.edu", &ride.id, now()).is_err());

        service.join(&ride.id, "b@usu.edu", now()).await.unwrap();
        service
            .remove_passenger(&ride.id, "driver@usu.edu", "b@usu.edu", now())
            .await
            .unwrap();
        assert!(service.limiter().check_cooldown("b@usu.edu", &ride.id, now()).is_err());

        let err = service
            .remove_passenger(&ride.id, "driver@usu.edu", "b@usu.edu", now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_request_cap_counts_failed_attempts() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;

        service.request_to_join(&ride.id, "a@usu.edu", now()).await.unwrap();
        // duplicado falha, mas conta para o limite
        assert!(service.request_to_join(&ride.id, "a@usu.edu", now()).await.is_err());
        assert!(service.request_to_join("missing", "a@usu.edu", now()).await.is_err());

        let err = service
            .request_to_join(&ride.id, "a@usu.edu", now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(_)));
    }

    #[tokio::test]
    async fn test_search_filters() {
        let service = service_with(vec![]);
        let ogden = created(&service, "Ogden, Utah").await;
        let slc = created(&service, "Salt Lake City, Utah").await;
        let logan = created(&service, "Logan, Utah").await;

        let all = service
            .search(&SearchRequest {
                school: Some("Utah State University".to_string()),
                radius: Some(500.0),
                ..SearchRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let close = service
            .search(&SearchRequest {
                school: Some("Utah State University".to_string()),
                radius: Some(40.0),
                ..SearchRequest::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = close.iter().map(|r| r.id.clone()).collect();
        assert!(ids.contains(&ogden.id) && ids.contains(&logan.id));
        assert!(!ids.contains(&slc.id));

        // origem e destino juntos ignoram o raio
        let exact = service
            .search(&SearchRequest {
                school: Some("Utah State University".to_string()),
                from: Some("Utah State University".to_string()),
                to: Some("Salt Lake City, Utah".to_string()),
                radius: Some(1.0),
            })
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, slc.id);

        assert!(matches!(
            service.search(&SearchRequest::default()).await,
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_update_guards_capacity() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;
        service.join(&ride.id, "a@usu.edu", now()).await.unwrap();
        service.join(&ride.id, "b@usu.edu", now()).await.unwrap();

        let err = service
            .update(
                &ride.id,
                "driver@usu.edu",
                &UpdateRideRequest {
                    seats_available: Some(1),
                    ..UpdateRideRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let updated = service
            .update(
                &ride.id,
                "driver@usu.edu",
                &UpdateRideRequest {
                    seats_available: Some(4),
                    notes: Some(" leaving from TSC ".to_string()),
                    departure_time: Some("09:15".to_string()),
                    ..UpdateRideRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.seats_available, 4);
        assert_eq!(updated.notes, "leaving from TSC");
        assert_eq!(updated.departure_time, "09:15");
    }

    #[tokio::test]
    async fn test_sweep_walks_full_lifecycle() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;
        let departure = Utc.with_ymd_and_hms(2025, 10, 9, 8, 0, 0).unwrap();

        let s = service.sweep_statuses(departure).await.unwrap();
        assert_eq!(s, SweepSummary { total: 1, ..SweepSummary::default() });
        assert!(!s.changed());

        let t1 = departure + Duration::hours(1);
        assert_eq!(service.sweep_statuses(t1).await.unwrap().auto_completed, 1);
        assert_eq!(service.get(&ride.id).await.unwrap().status.status, RideStatusKind::Completed);

        let t2 = t1 + Duration::hours(3);
        assert_eq!(service.sweep_statuses(t2).await.unwrap().marked_for_delete, 1);

        // rides marcadas para remoção somem da busca
        let found = service
            .search(&SearchRequest {
                school: Some("Utah State University".to_string()),
                ..SearchRequest::default()
            })
            .await
            .unwrap();
        assert!(found.is_empty());

        let t3 = t2 + Duration::hours(12);
        assert_eq!(service.sweep_statuses(t3).await.unwrap().hard_deleted, 1);
        assert!(matches!(service.get(&ride.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_manual_completion_by_driver() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;
        let departure = Utc.with_ymd_and_hms(2025, 10, 9, 8, 0, 0).unwrap();

        assert!(matches!(
            service.mark_completed(&ride.id, "a@usu.edu", departure).await,
            Err(AppError::Forbidden(_))
        ));

        service.mark_completed(&ride.id, "driver@usu.edu", departure).await.unwrap();
        let err = service
            .unmark_completed(&ride.id, "driver@usu.edu", departure + Duration::hours(2))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot unmark ride: departure was more than 1 hour ago");

        let ride = service
            .unmark_completed(&ride.id, "driver@usu.edu", departure + Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(ride.status.status, RideStatusKind::Active);
    }

    async fn created_on(service: &RideService, date: &str, time: &str) -> Ride {
        let mut request = create_request("Utah State University", "Ogden, Utah");
        request.departure_date = Some(date.to_string());
        request.departure_time = Some(time.to_string());
        service
            .create("driver@usu.edu", "Utah State University", &request, &sample_geo(), now())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_lists_sorted_by_departure() {
        let service = service_with(vec![]);
        let late = created_on(&service, "2025-10-12", "07:00").await;
        let early = created_on(&service, "2025-10-10", "18:00").await;
        let middle = created_on(&service, "2025-10-12", "06:30").await;
        let expected = vec![early.id.clone(), middle.id.clone(), late.id.clone()];

        let searched: Vec<_> = service
            .search(&SearchRequest {
                school: Some("Utah State University".to_string()),
                ..SearchRequest::default()
            })
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(searched, expected);

        let mine: Vec<_> = service
            .created_by("driver@usu.edu")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(mine, expected);

        for ride in [&late, &early, &middle] {
            service.join(&ride.id, "a@usu.edu", now()).await.unwrap();
        }
        let joined: Vec<_> = service
            .joined_by("a@usu.edu")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(joined, expected);
    }

    #[tokio::test]
    async fn test_update_rejected_once_ride_is_completed() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;
        service.mark_completed(&ride.id, "driver@usu.edu", now()).await.unwrap();

        let err = service
            .update(
                &ride.id,
                "driver@usu.edu",
                &UpdateRideRequest {
                    notes: Some("late change".to_string()),
                    ..UpdateRideRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Ride is no longer active (status: completed)");
        assert_eq!(service.get(&ride.id).await.unwrap().notes, "");
    }

    #[tokio::test]
    async fn test_legacy_join_errors_and_cooldown() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;

        service.join(&ride.id, "a@usu.edu", now()).await.unwrap();
        let err = service.join(&ride.id, "a@usu.edu", now()).await.unwrap_err();
        assert_eq!(err.to_string(), "Already joined");

        service.join(&ride.id, "b@usu.edu", now()).await.unwrap();
        let err = service.join(&ride.id, "c@usu.edu", now()).await.unwrap_err();
        assert_eq!(err.to_string(), "No seats available");

        service.leave(&ride.id, "b@usu.edu", now()).await.unwrap();
        let err = service
            .join(&ride.id, "b@usu.edu", now() + Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(_)));

        service
            .join(&ride.id, "b@usu.edu", now() + Duration::minutes(10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reject_without_pending_request_sets_no_cooldown() {
        let service = service_with(vec![]);
        let ride = created(&service, "Ogden, Utah").await;

        service
            .reject(&ride.id, "driver@usu.edu", "stranger@usu.edu", now())
            .await
            .unwrap();
        assert!(service
            .limiter()
            .check_cooldown("stranger@usu.edu", &ride.id, now())
            .is_ok());
        service
            .request_to_join(&ride.id, "stranger@usu.edu", now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_caps_seats() {
        let service = service_with(vec![]);
        let mut request = create_request("Utah State University", "Ogden, Utah");
        request.seats_available = Some(MAX_SEATS + 1);

        let err = service
            .create("d@usu.edu", "Utah State University", &request, &sample_geo(), now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("Seats available must be between 1 and {}", MAX_SEATS));
    }

    #[test]
    fn test_create_request_accepts_string_seats() {
        let request: CreateRideRequest = serde_json::from_value(serde_json::json!({
            "from": "Utah State University",
            "destination": "Ogden, Utah",
            "departureDate": "2025-10-09",
            "departureTime": "08:00",
            "seatsAvailable": "3"
        }))
        .unwrap();
        assert_eq!(request.seats_available, Some(3));

        let update: UpdateRideRequest = serde_json::from_value(serde_json::json!({ "notes": "hi" })).unwrap();
        assert_eq!(update.seats_available, None);
    }
}
