use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const DEBUG_ROLE: &str = "debug";

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub email: String,
    #[serde(default)]
    pub school: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iat: usize, // issued at
    pub exp: usize, // expiration
}

impl Claims {
    pub fn is_debug(&self) -> bool {
        self.role.as_deref() == Some(DEBUG_ROLE)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VerifyTokenResponse {
    pub success: bool,
    pub valid: bool,
    pub email: String,
    pub school: String,
    pub exp: usize,
}

/// Gera um token HS256. Usado pelo roteador de debug e pelos testes;
/// os tokens de usuários vêm do serviço de login.
pub fn issue_token(
    secret: &str,
    email: &str,
    school: &str,
    role: Option<&str>,
    ttl: Duration,
) -> Result<String, String> {
    let now = Utc::now();
    let claims = Claims {
        email: email.to_string(),
        school: school.to_string(),
        role: role.map(str::to_string),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("Failed to generate token: {}", e))
}

// Verify JWT token
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, String> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}

/// Extrai o token de um header `Authorization: Bearer <token>`
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
