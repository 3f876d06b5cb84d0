use crate::{
    auth::{
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, validate_password_policy, verify_password},
        role_cache::{AccessProfile, Principal, RoleCache},
    },
    config::Config,
    error::{AppError, AppResult},
    model::{role::Role, user::User},
    models::{
        Claims, EmployeeCredentials, EmployeeLoginReq, LoginReqDto, LoginResponse, TokenType,
    },
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{debug, error, info, instrument};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

async fn store_refresh_token<'c, E>(executor: E, claims: &Claims) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'c, Database = MySql>,
{
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (principal_kind, principal_id, jti, expires_at)
        VALUES (?, ?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(claims.kind.to_string())
    .bind(claims.principal_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(executor)
    .await?;
    Ok(())
}

/// Revokes every live refresh token of a principal (deactivation, password change).
pub async fn revoke_principal_tokens(pool: &MySqlPool, principal: Principal) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE principal_kind = ? AND principal_id = ? AND revoked = FALSE",
    )
    .bind(principal.kind.to_string())
    .bind(principal.id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Signs an access/refresh pair and records the refresh token.
async fn issue_tokens(
    pool: &MySqlPool,
    config: &Config,
    subject: &TokenSubject<'_>,
) -> AppResult<(String, String)> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)?;

    debug!(jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool, &refresh_claims).await?;

    Ok((access_token, refresh_token))
}

/// Marks the first successful login of an employee. Returns true only for
/// the call that actually set the timestamp.
pub async fn record_employee_first_login(pool: &MySqlPool, employee_id: u64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE employees SET first_login_at = NOW() WHERE id = ? AND first_login_at IS NULL",
    )
    .bind(employee_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Verifies the current password, applies the policy to the new one and
/// stores its hash. Existing refresh tokens are revoked.
pub async fn change_employee_password(
    pool: &MySqlPool,
    employee_id: u64,
    current_password: &str,
    new_password: &str,
) -> AppResult<()> {
    let stored = sqlx::query_scalar::<_, String>("SELECT password FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Employee"))?;

    if verify_password(current_password, &stored).is_err() {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }
    if current_password == new_password {
        return Err(AppError::validation(
            "New password must differ from the current password",
        ));
    }
    validate_password_policy(new_password)?;

    let hashed = hash_password(new_password)?;
    sqlx::query("UPDATE employees SET password = ? WHERE id = ?")
        .bind(hashed)
        .bind(employee_id)
        .execute(pool)
        .await?;

    let revoked = revoke_principal_tokens(pool, Principal::employee(employee_id)).await?;
    info!(employee_id, revoked, "Employee password changed");
    Ok(())
}

/// Staff login with email and password.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is deactivated")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, role_cache, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    role_cache: web::Data<RoleCache>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    let email = user.email.trim().to_lowercase();
    if email.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(AppError::validation("Email and password are required").into());
    }

    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password, full_name, role, is_active, can_access_salary
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Database error while fetching user");
        AppError::Db(e)
    })?;

    let db_user = match db_user {
        Some(u) => u,
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::Unauthorized("Invalid credentials".into()).into());
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()).into());
    }

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account deactivated");
        return Err(AppError::forbidden("Account is deactivated").into());
    }

    let role = db_user.role().filter(|r| r.is_staff()).ok_or_else(|| {
        error!(user_id = db_user.id, role = %db_user.role, "User has an unknown role");
        AppError::Internal(format!("unknown role {}", db_user.role))
    })?;

    let principal = Principal::user(db_user.id);
    let subject = TokenSubject {
        principal,
        sub: &db_user.email,
        role,
    };
    let (access_token, refresh_token) = issue_tokens(pool.get_ref(), &config, &subject).await?;

    role_cache
        .insert(
            principal,
            AccessProfile {
                role,
                is_active: true,
                can_access_salary: db_user.can_access_salary,
            },
        )
        .await;

    // not fatal for the login
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        role: role.to_string(),
        first_login: false,
    }))
}

/// Employee self-service login with employee code and password.
#[utoipa::path(
    post,
    path = "/auth/employee-login",
    request_body = EmployeeLoginReq,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Employee is inactive")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "employee_login",
    skip(pool, config, role_cache, body),
    fields(employee_code = %body.employee_code)
)]
pub async fn employee_login(
    body: web::Json<EmployeeLoginReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    role_cache: web::Data<RoleCache>,
) -> actix_web::Result<impl Responder> {
    let code = body.employee_code.trim();
    if code.is_empty() || body.password.is_empty() {
        return Err(AppError::validation("Employee code and password are required").into());
    }

    let creds = sqlx::query_as::<_, EmployeeCredentials>(
        r#"
        SELECT id, employee_code, password, is_active, first_login_at
        FROM employees
        WHERE employee_code = ?
        "#,
    )
    .bind(code)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(AppError::Db)?
    .ok_or_else(|| {
        info!("Invalid credentials: employee not found");
        AppError::Unauthorized("Invalid credentials".into())
    })?;

    if let Err(e) = verify_password(&body.password, &creds.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()).into());
    }

    if !creds.is_active {
        return Err(AppError::forbidden("Employee is inactive").into());
    }

    let principal = Principal::employee(creds.id);
    let subject = TokenSubject {
        principal,
        sub: &creds.employee_code,
        role: Role::Employee,
    };
    let (access_token, refresh_token) = issue_tokens(pool.get_ref(), &config, &subject).await?;

    let first_login = if creds.first_login_at.is_none() {
        record_employee_first_login(pool.get_ref(), creds.id)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, employee_id = creds.id, "Failed to record first login");
                false
            })
    } else {
        false
    };

    role_cache
        .insert(
            principal,
            AccessProfile {
                role: Role::Employee,
                is_active: true,
                can_access_salary: false,
            },
        )
        .await;

    info!(employee_id = creds.id, first_login, "Employee login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        role: Role::Employee.to_string(),
        first_login,
    }))
}

async fn rotate(
    tx: &mut Transaction<'_, MySql>,
    config: &Config,
    claims: &Claims,
    role: Role,
) -> AppResult<(String, String)> {
    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE AND expires_at > NOW()",
    )
    .bind(&claims.jti)
    .execute(&mut **tx)
    .await?;

    // already used, revoked or unknown
    if revoked.rows_affected() == 0 {
        return Err(AppError::Unauthorized("Refresh token is no longer valid".into()));
    }

    let subject = TokenSubject {
        principal: Principal {
            kind: claims.kind,
            id: claims.principal_id,
        },
        sub: &claims.sub,
        role,
    };
    let access_token =
        generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, new_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl)?;
    store_refresh_token(&mut **tx, &new_claims).await?;

    Ok((access_token, refresh_token))
}

/// Exchanges a refresh token for a new pair; the old refresh token is revoked.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = Object,
         example = json!({"access_token": "...", "refresh_token": "..."})),
        (status = 401, description = "Missing, invalid or reused refresh token"),
        (status = 403, description = "Account is deactivated")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    role_cache: web::Data<RoleCache>,
) -> actix_web::Result<impl Responder> {
    let token = bearer(&req).ok_or_else(|| AppError::Unauthorized("No token".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required".into()).into());
    }

    let principal = Principal {
        kind: claims.kind,
        id: claims.principal_id,
    };
    let profile = role_cache.profile(pool.get_ref(), principal).await?;
    if !profile.is_active {
        return Err(AppError::forbidden("Account is deactivated").into());
    }

    let mut tx = pool.begin().await.map_err(AppError::Db)?;
    let (access_token, refresh_token) = rotate(&mut tx, &config, &claims, profile.role).await?;
    tx.commit().await.map_err(AppError::Db)?;

    debug!(kind = %principal.kind, id = principal.id, "Refresh token rotated");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "access_token": access_token,
        "refresh_token": refresh_token
    })))
}

/// Revokes the presented refresh token. Always answers 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    // idempotent, even if the token was unknown
    HttpResponse::NoContent().finish()
}
