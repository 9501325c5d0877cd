use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::LimiterConfig;
use crate::utils::AppError;

/// Freio contra abuso nos pedidos de carona:
/// - cooldown por (usuário, carona) depois de cancelar / ser rejeitado / removido
/// - no máximo N pedidos por usuário numa janela móvel
pub struct RequestLimiter {
    config: LimiterConfig,
    cooldowns: Mutex<HashMap<(String, String), DateTime<Utc>>>,
    recent_requests: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct LimiterStats {
    pub cooldowns: usize,
    pub tracked_users: usize,
}

impl RequestLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        RequestLimiter {
            config,
            cooldowns: Mutex::new(HashMap::new()),
            recent_requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Rejects with 429 while the (email, ride) cooldown is running
    pub fn check_cooldown(&self, email: &str, ride_id: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut cooldowns = self.cooldowns.lock().map_err(|_| poisoned())?;
        let key = (email.to_string(), ride_id.to_string());

        if let Some(started) = cooldowns.get(&key).copied() {
            let remaining = self.config.cooldown - (now - started);
            if remaining > chrono::Duration::zero() {
                let minutes_left = (remaining.num_seconds() + 59) / 60;
                return Err(AppError::TooManyRequests(format!(
                    "Please wait {} minutes before requesting to join this ride again",
                    minutes_left.max(1)
                )));
            }
            cooldowns.remove(&key);
        }

        Ok(())
    }

    /// Conta o pedido se ainda couber na janela
    pub fn check_request_limit(&self, email: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut recent = self.recent_requests.lock().map_err(|_| poisoned())?;
        let window = self.config.cooldown;

        let requests = recent.entry(email.to_string()).or_default();
        requests.retain(|at| now - *at < window);

        if requests.len() >= self.config.max_requests {
            return Err(AppError::TooManyRequests(format!(
                "You can only request to join up to {} rides within {} minutes",
                self.config.max_requests,
                window.num_minutes()
            )));
        }

        requests.push(now);
        Ok(())
    }

    /// Esquece quem não pede nada há uma janela inteira
    pub fn prune(&self, now: DateTime<Utc>) {
        let window = self.config.cooldown;
        if let Ok(mut recent) = self.recent_requests.lock() {
            recent.retain(|_, requests| {
                requests.retain(|at| now - *at < window);
                !requests.is_empty()
            });
        }
        if let Ok(mut cooldowns) = self.cooldowns.lock() {
            cooldowns.retain(|_, started| now - *started < window);
        }
    }

    pub fn set_cooldown(&self, email: &str, ride_id: &str, now: DateTime<Utc>) {
        if let Ok(mut cooldowns) = self.cooldowns.lock() {
            cooldowns.insert((email.to_string(), ride_id.to_string()), now);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cooldowns) = self.cooldowns.lock() {
            cooldowns.clear();
        }
        if let Ok(mut recent) = self.recent_requests.lock() {
            recent.clear();
        }
    }

    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            cooldowns: self.cooldowns.lock().map(|c| c.len()).unwrap_or(0),
            tracked_users: self.recent_requests.lock().map(|r| r.len()).unwrap_or(0),
        }
    }
}

fn poisoned() -> AppError {
    AppError::DatabaseError("request limiter lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 9, 12, 0, 0).unwrap()
    }

    fn limiter() -> RequestLimiter {
        RequestLimiter::new(LimiterConfig::default())
    }

    #[test]
    fn test_cooldown_blocks_same_ride_only() {
        let l = limiter();
        l.set_cooldown("a@usu.edu", "ride-1", t0());

        let err = l
            .check_cooldown("a@usu.edu", "ride-1", t0() + Duration::minutes(1))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please wait 9 minutes before requesting to join this ride again"
        );

        assert!(l.check_cooldown("a@usu.edu", "ride-2", t0()).is_ok());
        assert!(l.check_cooldown("b@usu.edu", "ride-1", t0()).is_ok());
    }

    #[test]
    fn test_cooldown_rounds_minutes_up_and_expires() {
        let l = limiter();
        l.set_cooldown("a@usu.edu", "ride-1", t0());

        let err = l
            .check_cooldown("a@usu.edu", "ride-1", t0() + Duration::seconds(9 * 60 + 30))
            .unwrap_err();
        assert!(err.to_string().contains("wait 1 minutes"));

        assert!(l
            .check_cooldown("a@usu.edu", "ride-1", t0() + Duration::minutes(10))
            .is_ok());
        assert_eq!(l.stats().cooldowns, 0);
    }

    #[test]
    fn test_request_cap_uses_rolling_window() {
        let l = limiter();
        for i in 0..3 {
            l.check_request_limit("a@usu.edu", t0() + Duration::minutes(i)).unwrap();
        }

        let err = l
            .check_request_limit("a@usu.edu", t0() + Duration::minutes(5))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "You can only request to join up to 3 rides within 10 minutes"
        );

        // o primeiro pedido sai da janela
        assert!(l
            .check_request_limit("a@usu.edu", t0() + Duration::minutes(10))
            .is_ok());
    }

    #[test]
    fn test_idle_users_are_forgotten() {
        let l = limiter();
        l.check_request_limit("a@usu.edu", t0()).unwrap();
        l.check_request_limit("b@usu.edu", t0() + Duration::minutes(8)).unwrap();
        l.set_cooldown("a@usu.edu", "ride-1", t0());
        assert_eq!(l.stats().tracked_users, 2);

        l.prune(t0() + Duration::minutes(11));
        let stats = l.stats();
        assert_eq!(stats.tracked_users, 1);
        assert_eq!(stats.cooldowns, 0);

        l.prune(t0() + Duration::minutes(30));
        assert_eq!(l.stats().tracked_users, 0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let l = limiter();
        l.set_cooldown("a@usu.edu", "ride-1", t0());
        l.check_request_limit("a@usu.edu", t0()).unwrap();
        l.clear();
        let stats = l.stats();
        assert_eq!(stats.cooldowns, 0);
        assert_eq!(stats.tracked_users, 0);
    }
}
