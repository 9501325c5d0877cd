use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Estado do ciclo de vida de uma carona
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RideStatusKind {
    Active,
    Completed,
    Delete,
}

impl fmt::Display for RideStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RideStatusKind::Active => write!(f, "active"),
            RideStatusKind::Completed => write!(f, "completed"),
            RideStatusKind::Delete => write!(f, "delete"),
        }
    }
}

/// Status tuple stored on every ride: `{status, status_at}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RideStatus {
    pub status: RideStatusKind,
    /// Instant of the last transition, null while active
    #[serde(default)]
    pub status_at: Option<DateTime<Utc>>,
}

impl Default for RideStatus {
    fn default() -> Self {
        RideStatus {
            status: RideStatusKind::Active,
            status_at: None,
        }
    }
}

impl RideStatus {
    pub fn at(status: RideStatusKind, now: DateTime<Utc>) -> Self {
        RideStatus {
            status,
            status_at: Some(now),
        }
    }
}

/// Carona publicada por um motorista
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: String,
    pub driver_email: String,
    pub school: String,
    pub from: String,
    pub destination: String,
    /// `YYYY-MM-DD`
    pub departure_date: String,
    /// `HH:MM` (segundos opcionais)
    pub departure_time: String,
    #[serde(deserialize_with = "deserialize_seats")]
    pub seats_available: u32,
    #[serde(default)]
    pub notes: String,
    /// Distância em milhas (2 casas decimais)
    #[serde(default, deserialize_with = "deserialize_distance")]
    pub distance: f64,
    #[serde(default)]
    pub passengers: Vec<String>,
    #[serde(default)]
    pub pending_requests: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: RideStatus,
}

/// Limite de vagas por carona
pub const MAX_SEATS: u32 = 50;

/// Clientes antigos mandavam números como string (`"3"`, `"83.70"`)
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrText::Number(n) => Ok(n),
            NumberOrText::Text(s) => s.trim().parse().map_err(E::custom),
        }
    }

    fn into_seats<E: serde::de::Error>(self) -> Result<u32, E> {
        let n = self.into_f64::<E>()?;
        if n.fract() != 0.0 || n < 0.0 || n > u32::MAX as f64 {
            return Err(E::custom(format!("invalid seat count: {}", n)));
        }
        Ok(n as u32)
    }
}

fn deserialize_distance<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(value) => value.into_f64(),
        None => Ok(0.0),
    }
}

fn deserialize_seats<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrText::deserialize(deserializer)?.into_seats()
}

/// Versão opcional para os bodies de criação/edição
pub(crate) fn deserialize_optional_seats<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberOrText>::deserialize(deserializer)?
        .map(NumberOrText::into_seats)
        .transpose()
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<RideStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RideStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// Falhas de regra de negócio do fluxo de caronas
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideError {
    NoSeatsAvailable,
    RideFull,
    AlreadyInRide,
    AlreadyJoined,
    AlreadyRequested,
    NoPendingRequest,
    NotInRide,
    NotAPassenger,
    DriverCannotJoin,
    NotActive(RideStatusKind),
    AlreadyCompleted,
    MarkedForDeletion,
    NotCompleted,
    UnmarkWindowElapsed,
    CapacityBelowPassengers { passengers: usize },
    InvalidSeats,
    InvalidDeparture,
}

impl fmt::Display for RideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RideError::NoSeatsAvailable => write!(f, "No seats available"),
            RideError::RideFull => write!(f, "Ride is full"),
            RideError::AlreadyInRide => write!(f, "Already in ride"),
            RideError::AlreadyJoined => write!(f, "Already joined"),
            RideError::AlreadyRequested => write!(f, "Already requested to join"),
            RideError::NoPendingRequest => write!(f, "No pending request found"),
            RideError::NotInRide => write!(f, "Not a passenger or pending request in this ride"),
            RideError::NotAPassenger => write!(f, "User is not a passenger in this ride"),
            RideError::DriverCannotJoin => write!(f, "Drivers cannot join their own ride"),
            RideError::NotActive(status) => write!(f, "Ride is no longer active (status: {})", status),
            RideError::AlreadyCompleted => write!(f, "Ride is already completed"),
            RideError::MarkedForDeletion => {
                write!(f, "Ride has been marked for deletion and cannot be modified")
            }
            RideError::NotCompleted => write!(f, "Ride is not currently marked as completed"),
            RideError::UnmarkWindowElapsed => {
                write!(f, "Cannot unmark ride: departure was more than 1 hour ago")
            }
            RideError::CapacityBelowPassengers { passengers } => write!(
                f,
                "Seats available cannot be lower than the {} approved passengers",
                passengers
            ),
            RideError::InvalidSeats => write!(f, "Seats available must be between 1 and {}", MAX_SEATS),
            RideError::InvalidDeparture => write!(f, "Invalid departure date or time"),
        }
    }
}

impl std::error::Error for RideError {}

/// Transição aplicada por uma varredura do verificador de status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    None,
    Completed,
    MarkedForDelete,
    HardDelete,
}

/// Limites de tempo do ciclo de vida
#[derive(Debug, Clone, Copy)]
pub struct StatusThresholds {
    /// active -> completed, contado a partir da partida
    pub completion: Duration,
    /// completed -> delete, contado a partir de `status_at`
    pub delete: Duration,
    /// delete -> removida do banco, contado a partir de `status_at`
    pub hard_delete: Duration,
    /// janela em que o motorista ainda pode desmarcar a conclusão
    pub unmark_window: Duration,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        StatusThresholds {
            completion: Duration::hours(1),
            delete: Duration::hours(3),
            hard_delete: Duration::hours(12),
            unmark_window: Duration::hours(1),
        }
    }
}

pub fn parse_departure(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .ok()?;
    Some(date.and_time(time))
}

impl Ride {
    pub fn remaining_seats(&self) -> u32 {
        self.seats_available
            .saturating_sub(self.passengers.len() as u32)
    }

    pub fn is_driver(&self, email: &str) -> bool {
        self.driver_email == email
    }

    pub fn has_passenger(&self, email: &str) -> bool {
        self.passengers.iter().any(|p| p == email)
    }

    pub fn has_pending(&self, email: &str) -> bool {
        self.pending_requests.iter().any(|p| p == email)
    }

    /// Departure as an instant, interpreting the wall-clock fields in `offset`
    pub fn departure_at(&self, offset: FixedOffset) -> Option<DateTime<Utc>> {
        parse_departure(&self.departure_date, &self.departure_time)?
            .and_local_timezone(offset)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn ensure_active(&self) -> Result<(), RideError> {
        match self.status.status {
            RideStatusKind::Active => Ok(()),
            other => Err(RideError::NotActive(other)),
        }
    }

    /// Passageiro pede para entrar; o motorista aprova depois
    pub fn request_to_join(&mut self, email: &str) -> Result<(), RideError> {
        if self.is_driver(email) {
            return Err(RideError::DriverCannotJoin);
        }
        self.ensure_active()?;
        if self.remaining_seats() == 0 {
            return Err(RideError::NoSeatsAvailable);
        }
        if self.has_passenger(email) {
            return Err(RideError::AlreadyInRide);
        }
        if self.has_pending(email) {
            return Err(RideError::AlreadyRequested);
        }

        self.pending_requests.push(email.to_string());
        Ok(())
    }

    /// Entrada direta sem aprovação (clientes antigos)
    pub fn join(&mut self, email: &str) -> Result<(), RideError> {
        if self.is_driver(email) {
            return Err(RideError::DriverCannotJoin);
        }
        self.ensure_active()?;
        if self.has_passenger(email) {
            return Err(RideError::AlreadyJoined);
        }
        if self.remaining_seats() == 0 {
            return Err(RideError::NoSeatsAvailable);
        }

        self.pending_requests.retain(|p| p != email);
        self.passengers.push(email.to_string());
        Ok(())
    }

    pub fn approve(&mut self, email: &str) -> Result<(), RideError> {
        self.ensure_active()?;
        if self.remaining_seats() == 0 {
            return Err(RideError::RideFull);
        }
        if !self.has_pending(email) {
            return Err(RideError::NoPendingRequest);
        }

        self.pending_requests.retain(|p| p != email);
        self.passengers.push(email.to_string());
        Ok(())
    }

    /// Idempotente: rejeitar um pedido inexistente não é erro
    pub fn reject(&mut self, email: &str) -> bool {
        let before = self.pending_requests.len();
        self.pending_requests.retain(|p| p != email);
        before != self.pending_requests.len()
    }

    /// Remove the caller from passengers and pending requests
    pub fn leave(&mut self, email: &str) -> Result<(), RideError> {
        if !self.has_passenger(email) && !self.has_pending(email) {
            return Err(RideError::NotInRide);
        }

        self.passengers.retain(|p| p != email);
        self.pending_requests.retain(|p| p != email);
        Ok(())
    }

    pub fn remove_passenger(&mut self, email: &str) -> Result<(), RideError> {
        if !self.has_passenger(email) {
            return Err(RideError::NotAPassenger);
        }

        self.passengers.retain(|p| p != email);
        Ok(())
    }

    pub fn set_capacity(&mut self, seats: u32) -> Result<(), RideError> {
        if seats == 0 || seats > MAX_SEATS {
            return Err(RideError::InvalidSeats);
        }
        if (seats as usize) < self.passengers.len() {
            return Err(RideError::CapacityBelowPassengers {
                passengers: self.passengers.len(),
            });
        }

        self.seats_available = seats;
        Ok(())
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) -> Result<(), RideError> {
        match self.status.status {
            RideStatusKind::Completed => Err(RideError::AlreadyCompleted),
            RideStatusKind::Delete => Err(RideError::MarkedForDeletion),
            RideStatusKind::Active => {
                self.status = RideStatus::at(RideStatusKind::Completed, now);
                Ok(())
            }
        }
    }

    pub fn unmark_completed(
        &mut self,
        now: DateTime<Utc>,
        offset: FixedOffset,
        thresholds: &StatusThresholds,
    ) -> Result<(), RideError> {
        match self.status.status {
            RideStatusKind::Delete => return Err(RideError::MarkedForDeletion),
            RideStatusKind::Active => return Err(RideError::NotCompleted),
            RideStatusKind::Completed => {}
        }

        let departure = self.departure_at(offset).ok_or(RideError::InvalidDeparture)?;
        if now - departure > thresholds.unmark_window {
            return Err(RideError::UnmarkWindowElapsed);
        }

        self.status = RideStatus::default();
        Ok(())
    }

    /// Avança no máximo um passo do ciclo de vida.
    ///
    /// `HardDelete` não altera a carona: quem chama deve removê-la do banco.
    pub fn advance_status(
        &mut self,
        now: DateTime<Utc>,
        offset: FixedOffset,
        thresholds: &StatusThresholds,
    ) -> StatusTransition {
        match (self.status.status, self.status.status_at) {
            (RideStatusKind::Active, _) => {
                let departed_long_enough = self
                    .departure_at(offset)
                    .map(|departure| now - departure >= thresholds.completion)
                    .unwrap_or(false);
                if departed_long_enough {
                    self.status = RideStatus::at(RideStatusKind::Completed, now);
                    return StatusTransition::Completed;
                }
                StatusTransition::None
            }
            (RideStatusKind::Completed, Some(at)) if now - at >= thresholds.delete => {
                self.status = RideStatus::at(RideStatusKind::Delete, now);
                StatusTransition::MarkedForDelete
            }
            (RideStatusKind::Delete, Some(at)) if now - at >= thresholds.hard_delete => {
                StatusTransition::HardDelete
            }
            _ => StatusTransition::None,
        }
    }

    pub fn route(&self) -> String {
        format!("{} → {}", self.from, self.destination)
    }
}
