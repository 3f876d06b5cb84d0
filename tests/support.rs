//! Shared fixtures: an app wired like `main`, a lazily connected pool and a
//! pre-seeded access-profile cache, so guard checks run without a database.

#![allow(dead_code)]

use std::net::SocketAddr;

use actix_web::test::TestRequest;
use hrpay::auth::jwt::{TokenSubject, generate_access_token};
use hrpay::auth::role_cache::{AccessProfile, Principal, RoleCache};
use hrpay::config::Config;
use hrpay::model::role::Role;
use sqlx::MySqlPool;

pub const SECRET: &str = "integration-test-secret";

pub struct TestState {
    pub config: Config,
    pub pool: MySqlPool,
    pub role_cache: RoleCache,
}

impl TestState {
    pub fn new() -> Self {
        let config = Config::for_tests(SECRET);
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();
        let role_cache = RoleCache::from_config(&config);
        Self {
            config,
            pool,
            role_cache,
        }
    }

    /// Seeds the cache so the middleware never has to load this principal.
    pub async fn seed(&self, principal: Principal, role: Role, is_active: bool, salary: bool) {
        self.role_cache
            .insert(
                principal,
                AccessProfile {
                    role,
                    is_active,
                    can_access_salary: salary,
                },
            )
            .await;
    }

    pub fn token(&self, principal: Principal, sub: &str, role: Role) -> String {
        let subject = TokenSubject {
            principal,
            sub,
            role,
        };
        generate_access_token(&subject, SECRET, self.config.access_token_ttl).unwrap()
    }
}

/// Builds the service exactly as `main` does, minus Swagger and logging.
#[allow(unused_macros)]
macro_rules! init_app {
    ($state:expr) => {{
        let state = $state;
        let config = state.config.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(state.pool.clone()))
                .app_data(actix_web::web::Data::new(config.clone()))
                .app_data(actix_web::web::Data::new(state.role_cache))
                .configure(|cfg| hrpay::routes::configure(cfg, config.clone())),
        )
        .await
    }};
}

/// The rate limiter keys on the peer address, which test requests lack.
pub fn anonymous(req: TestRequest) -> TestRequest {
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
    req.peer_addr(peer)
}

pub fn authed(req: TestRequest, token: &str) -> TestRequest {
    anonymous(req).insert_header(("Authorization", format!("Bearer {token}")))
}
