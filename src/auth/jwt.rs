use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    auth::role_cache::Principal,
    error::{AppError, AppResult},
    model::role::Role,
    models::{Claims, TokenType},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

/// Who a token is issued to.
pub struct TokenSubject<'a> {
    pub principal: Principal,
    pub sub: &'a str,
    pub role: Role,
}

impl TokenSubject<'_> {
    fn claims(&self, token_type: TokenType, ttl: usize) -> Claims {
        Claims {
            sub: self.sub.to_string(),
            kind: self.principal.kind,
            principal_id: self.principal.id,
            role: self.role.to_string(),
            exp: now() + ttl,
            jti: Uuid::new_v4().to_string(),
            token_type,
            employee_id: self.principal.employee_id(),
        }
    }
}

fn sign(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

pub fn generate_access_token(
    subject: &TokenSubject<'_>,
    secret: &str,
    ttl: usize,
) -> AppResult<String> {
    sign(&subject.claims(TokenType::Access, ttl), secret)
}

pub fn generate_refresh_token(
    subject: &TokenSubject<'_>,
    secret: &str,
    ttl: usize,
) -> AppResult<(String, Claims)> {
    let claims = subject.claims(TokenType::Refresh, ttl);
    let token = sign(&claims, secret)?;
    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrincipalKind;

    const SECRET: &str = "unit-test-secret";

    fn employee() -> TokenSubject<'static> {
        TokenSubject {
            principal: Principal::employee(42),
            sub: "EMP-042",
            role: Role::Employee,
        }
    }

    #[test]
    fn access_token_carries_principal() {
        let token = generate_access_token(&employee(), SECRET, 900).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();

        assert_eq!(claims.kind, PrincipalKind::Employee);
        assert_eq!(claims.principal_id, 42);
        assert_eq!(claims.employee_id, Some(42));
        assert_eq!(claims.role, "employee");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_tokens_get_unique_ids() {
        let subject = TokenSubject {
            principal: Principal::user(1),
            sub: "admin@company.ph",
            role: Role::Admin,
        };
        let (_, a) = generate_refresh_token(&subject, SECRET, 60).unwrap();
        let (_, b) = generate_refresh_token(&subject, SECRET, 60).unwrap();

        assert_eq!(a.token_type, TokenType::Refresh);
        assert_eq!(a.employee_id, None);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&employee(), SECRET, 900).unwrap();
        assert!(verify_token(&token, "another-secret").is_err());
    }
}
