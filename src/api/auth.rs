use actix_web::{web, HttpResponse};

use crate::middleware::auth::Claims;
use crate::services::auth_service::VerifyTokenResponse;

/// GET /api/auth/verify - O middleware já validou o token
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 401, description = "Access token required"),
        (status = 403, description = "Invalid token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_token(user: web::ReqData<Claims>) -> HttpResponse {
    log::debug!("✓ GET /auth/verify - {}", user.email);

    let claims = user.into_inner();
    HttpResponse::Ok().json(VerifyTokenResponse {
        success: true,
        valid: true,
        email: claims.email,
        school: claims.school,
        exp: claims.exp,
    })
}
