use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::services::auth_service::{self, bearer_token};
use crate::utils::AppError;

pub use crate::services::auth_service::Claims;

/// Quem pode passar por um escopo autenticado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// Usuários comuns; tokens de debug são recusados
    Users,
    /// Somente tokens com role de debug
    DebugOnly,
}

impl Access {
    fn check(self, claims: &Claims) -> Result<(), AppError> {
        match (self, claims.is_debug()) {
            (Access::Users, false) | (Access::DebugOnly, true) => Ok(()),
            (Access::Users, true) => Err(AppError::Forbidden("Debug token not accepted here".to_string())),
            (Access::DebugOnly, false) => Err(AppError::Forbidden("Debug token required".to_string())),
        }
    }
}

/// Valida o JWT do header `Authorization` e injeta `Claims` nas extensions
pub struct AuthMiddleware {
    secret: Rc<String>,
    access: Access,
}

impl AuthMiddleware {
    /// Rotas da API: aceita tokens de usuário, recusa tokens de debug
    pub fn new(secret: &str) -> Self {
        AuthMiddleware {
            secret: Rc::new(secret.to_string()),
            access: Access::Users,
        }
    }

    /// Rotas `/debug`: aceita apenas tokens de debug
    pub fn debug(secret: &str) -> Self {
        AuthMiddleware {
            secret: Rc::new(secret.to_string()),
            access: Access::DebugOnly,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            secret: self.secret.clone(),
            access: self.access,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    secret: Rc<String>,
    access: Access,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        let Some(token) = token else {
            return Box::pin(async move {
                Err(AppError::Unauthorized("Access token required".to_string()).into())
            });
        };

        let claims = match auth_service::verify_token(&self.secret, &token) {
            Ok(claims) => claims,
            Err(e) => {
                log::debug!("🔒 Rejected token on {}: {}", req.path(), e);
                return Box::pin(async move { Err(AppError::Forbidden("Invalid token".to_string()).into()) });
            }
        };

        if let Err(e) = self.access.check(&claims) {
            log::warn!("🔒 {} refused on {}: {}", claims.email, req.path(), e);
            return Box::pin(async move { Err(e.into()) });
        }

        req.extensions_mut().insert(claims);
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}
