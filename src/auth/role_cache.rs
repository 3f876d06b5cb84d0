//! Per-principal access profiles (role, active flag, salary access) cached
//! with a TTL so the middleware does not hit the database on every request.
//!
//! Concurrent misses for the same principal share one load. When loads keep
//! failing the cache stops calling the database for an exponentially growing
//! window and answers with [`AppError::Backoff`] instead.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::future::Cache;
use sqlx::MySqlPool;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::role::Role;
use crate::models::PrincipalKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal {
    pub kind: PrincipalKind,
    pub id: u64,
}

impl Principal {
    pub fn user(id: u64) -> Self {
        Self {
            kind: PrincipalKind::User,
            id,
        }
    }

    pub fn employee(id: u64) -> Self {
        Self {
            kind: PrincipalKind::Employee,
            id,
        }
    }

    pub fn employee_id(&self) -> Option<u64> {
        (self.kind == PrincipalKind::Employee).then_some(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessProfile {
    pub role: Role,
    pub is_active: bool,
    pub can_access_salary: bool,
}

#[derive(Debug)]
enum LoadError {
    Missing,
    Db(sqlx::Error),
}

/// Delay before the next attempt after `failures` consecutive failures.
pub fn backoff_delay(failures: u32, base_ms: u64, max_ms: u64) -> u64 {
    if failures == 0 {
        return 0;
    }
    let shift = (failures - 1).min(32);
    base_ms.saturating_mul(1u64 << shift).min(max_ms)
}

pub struct RoleCache {
    profiles: Cache<Principal, AccessProfile>,
    failures: AtomicU32,
    /// Milliseconds since `epoch` before which loads are refused.
    blocked_until_ms: AtomicU64,
    epoch: Instant,
    base_ms: u64,
    max_ms: u64,
}

impl RoleCache {
    pub fn new(ttl: Duration, base_ms: u64, max_ms: u64) -> Self {
        Self {
            profiles: Cache::builder()
                .max_capacity(50_000)
                .time_to_live(ttl)
                .build(),
            failures: AtomicU32::new(0),
            blocked_until_ms: AtomicU64::new(0),
            epoch: Instant::now(),
            base_ms,
            max_ms,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_secs(config.role_cache_ttl_secs),
            config.auth_backoff_base_ms,
            config.auth_backoff_max_ms,
        )
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub async fn insert(&self, principal: Principal, profile: AccessProfile) {
        self.profiles.insert(principal, profile).await;
    }

    pub async fn invalidate(&self, principal: Principal) {
        self.profiles.invalidate(&principal).await;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::Acquire)
    }

    /// Cached profile, or the result of `loader` shared by every concurrent
    /// caller for the same principal.
    pub async fn get_or_load<F, Fut>(&self, principal: Principal, loader: F) -> AppResult<AccessProfile>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<AccessProfile>, sqlx::Error>>,
    {
        if let Some(profile) = self.profiles.get(&principal).await {
            return Ok(profile);
        }

        let blocked_until = self.blocked_until_ms.load(Ordering::Acquire);
        let now = self.now_ms();
        if now < blocked_until {
            return Err(AppError::Backoff {
                retry_after_ms: blocked_until - now,
            });
        }

        let loaded = self
            .profiles
            .try_get_with(principal, async move {
                match loader().await {
                    Ok(Some(profile)) => Ok(profile),
                    Ok(None) => Err(LoadError::Missing),
                    Err(e) => Err(LoadError::Db(e)),
                }
            })
            .await;

        match loaded {
            Ok(profile) => {
                self.failures.store(0, Ordering::Release);
                Ok(profile)
            }
            Err(err) => match err.as_ref() {
                LoadError::Missing => Err(AppError::Unauthorized("Account no longer exists".into())),
                LoadError::Db(e) => {
                    let failures = self.failures.fetch_add(1, Ordering::AcqRel) + 1;
                    let delay = backoff_delay(failures, self.base_ms, self.max_ms);
                    self.blocked_until_ms
                        .fetch_max(self.now_ms() + delay, Ordering::AcqRel);
                    tracing::error!(
                        error = %e,
                        kind = %principal.kind,
                        id = principal.id,
                        failures,
                        retry_after_ms = delay,
                        "Access profile load failed"
                    );
                    Err(AppError::Backoff {
                        retry_after_ms: delay,
                    })
                }
            },
        }
    }

    pub async fn profile(&self, pool: &MySqlPool, principal: Principal) -> AppResult<AccessProfile> {
        self.get_or_load(principal, || load_profile(pool, principal))
            .await
    }
}

/// Current role and status of a principal straight from the database.
pub async fn load_profile(
    pool: &MySqlPool,
    principal: Principal,
) -> Result<Option<AccessProfile>, sqlx::Error> {
    match principal.kind {
        PrincipalKind::User => {
            let row = sqlx::query_as::<_, (String, bool, bool)>(
                "SELECT role, is_active, can_access_salary FROM users WHERE id = ?",
            )
            .bind(principal.id)
            .fetch_optional(pool)
            .await?;

            Ok(row.and_then(|(role, is_active, can_access_salary)| {
                let role = Role::assignable(&role)?;
                Some(AccessProfile {
                    role,
                    is_active,
                    can_access_salary,
                })
            }))
        }
        PrincipalKind::Employee => {
            let row = sqlx::query_scalar::<_, bool>("SELECT is_active FROM employees WHERE id = ?")
                .bind(principal.id)
                .fetch_optional(pool)
                .await?;

            Ok(row.map(|is_active| AccessProfile {
                role: Role::Employee,
                is_active,
                can_access_salary: false,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn cache() -> RoleCache {
        RoleCache::new(Duration::from_secs(60), 500, 30_000)
    }

    fn hr() -> AccessProfile {
        AccessProfile {
            role: Role::Hr,
            is_active: true,
            can_access_salary: false,
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        assert_eq!(backoff_delay(0, 500, 30_000), 0);
        assert_eq!(backoff_delay(1, 500, 30_000), 500);
        assert_eq!(backoff_delay(2, 500, 30_000), 1_000);
        assert_eq!(backoff_delay(4, 500, 30_000), 4_000);
        assert_eq!(backoff_delay(10, 500, 30_000), 30_000);
        assert_eq!(backoff_delay(u32::MAX, 500, 30_000), 30_000);
    }

    #[actix_web::test]
    async fn concurrent_misses_share_one_load() {
        let cache = cache();
        let counter = AtomicUsize::new(0);
        let (cache_ref, calls) = (&cache, &counter);

        let lookups = (0..8).map(move |_| {
            cache_ref.get_or_load(Principal::user(7), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                actix_web::rt::time::sleep(Duration::from_millis(20)).await;
                Ok(Some(hr()))
            })
        });
        let results = futures::future::join_all(lookups).await;

        assert!(results.iter().all(|r| r.as_ref().ok() == Some(&hr())));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn invalidate_forces_a_reload() {
        let cache = cache();
        let principal = Principal::employee(3);
        cache
            .insert(
                principal,
                AccessProfile {
                    role: Role::Employee,
                    is_active: true,
                    can_access_salary: false,
                },
            )
            .await;

        cache.invalidate(principal).await;
        let reloaded = cache
            .get_or_load(principal, || async {
                Ok(Some(AccessProfile {
                    role: Role::Employee,
                    is_active: false,
                    can_access_salary: false,
                }))
            })
            .await
            .unwrap();
        assert!(!reloaded.is_active);
    }

    #[actix_web::test]
    async fn failures_open_a_backoff_window() {
        let cache = cache();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let first = cache
            .get_or_load(Principal::user(1), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(sqlx::Error::PoolTimedOut)
            })
            .await;
        assert!(matches!(first, Err(AppError::Backoff { retry_after_ms: 500 })));
        assert_eq!(cache.consecutive_failures(), 1);

        // inside the window the loader is not called at all
        let second = cache
            .get_or_load(Principal::user(2), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(hr()))
            })
            .await;
        assert!(matches!(second, Err(AppError::Backoff { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn cached_profiles_survive_a_backoff_window() {
        let cache = cache();
        cache.insert(Principal::user(9), hr()).await;

        let _ = cache
            .get_or_load(Principal::user(1), || async { Err(sqlx::Error::PoolTimedOut) })
            .await;
        let cached = cache
            .get_or_load(Principal::user(9), || async { Ok(None) })
            .await;
        assert_eq!(cached.unwrap(), hr());
    }

    #[actix_web::test]
    async fn missing_principal_is_unauthorized_and_not_a_failure() {
        let cache = cache();
        let result = cache
            .get_or_load(Principal::employee(404), || async { Ok(None) })
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert_eq!(cache.consecutive_failures(), 0);
    }
}
