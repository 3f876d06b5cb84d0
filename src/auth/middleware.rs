use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::auth::role_cache::RoleCache;
use crate::config::Config;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use sqlx::MySqlPool;

fn reject(req: ServiceRequest, resp: HttpResponse) -> Result<ServiceResponse<BoxBody>, Error> {
    Ok(req.into_response(resp.map_into_boxed_body()))
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let (config, role_cache, pool) = match (
        req.app_data::<Data<Config>>(),
        req.app_data::<Data<RoleCache>>(),
        req.app_data::<Data<MySqlPool>>(),
    ) {
        (Some(c), Some(r), Some(p)) => (c.clone(), r.clone(), p.clone()),
        _ => {
            tracing::error!("App data missing for auth middleware");
            return reject(
                req,
                HttpResponse::InternalServerError().json(json!({"error": "Internal Server Error"})),
            );
        }
    };

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v,
            Err(_) => {
                return reject(
                    req,
                    HttpResponse::Unauthorized()
                        .json(json!({"error": "Invalid Authorization header encoding"})),
                );
            }
        },
        None => {
            return reject(
                req,
                HttpResponse::Unauthorized().json(json!({"error": "Missing Authorization header"})),
            );
        }
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            return reject(
                req,
                HttpResponse::Unauthorized()
                    .json(json!({"error": "Authorization header must start with Bearer"})),
            );
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Access => c,
        Ok(_) => {
            return reject(
                req,
                HttpResponse::Unauthorized().json(json!({"error": "Access token required"})),
            );
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token rejected");
            return reject(
                req,
                HttpResponse::Unauthorized().json(json!({"error": "Invalid or expired token"})),
            );
        }
    };

    let principal = crate::auth::role_cache::Principal {
        kind: claims.kind,
        id: claims.principal_id,
    };

    // role and status come from the profile, not the token, so changes apply
    // as soon as the cache entry is invalidated
    let profile = match role_cache.profile(pool.get_ref(), principal).await {
        Ok(p) => p,
        Err(e) => return reject(req, e.error_response()),
    };

    if !profile.is_active {
        tracing::info!(kind = %principal.kind, id = principal.id, "Inactive principal rejected");
        return reject(
            req,
            HttpResponse::Forbidden().json(json!({"error": "Account is deactivated"})),
        );
    }

    let auth_user = AuthUser {
        principal,
        subject: claims.sub,
        role: profile.role,
        can_access_salary: profile.can_access_salary,
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
