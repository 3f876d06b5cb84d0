use anyhow::Result;
use futures_util::TryStreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use super::email_filter::normalize;

const CAPACITY: u64 = 100_000;
const TTL: Duration = Duration::from_secs(24 * 60 * 60);

// confirmed-taken emails only; absence proves nothing
static TAKEN: Lazy<Cache<String, ()>> =
    Lazy::new(|| Cache::builder().max_capacity(CAPACITY).time_to_live(TTL).build());

pub async fn mark_taken(email: &str) {
    TAKEN.insert(normalize(email), ()).await;
}

pub async fn forget(email: &str) {
    TAKEN.invalidate(&normalize(email)).await;
}

pub async fn is_taken(email: &str) -> bool {
    TAKEN.contains_key(&normalize(email))
}

/// Preloads emails of staff who logged in during the last `days` days.
pub async fn warmup_email_cache(pool: &MySqlPool, days: u32, chunk: usize) -> Result<()> {
    let mut rows = sqlx::query_scalar::<_, String>(
        "SELECT email FROM users WHERE last_login_at >= NOW() - INTERVAL ? DAY",
    )
    .bind(days)
    .fetch(pool)
    .try_chunks(chunk.max(1));

    let mut loaded = 0usize;
    while let Some(emails) = rows.try_next().await.map_err(|e| e.1)? {
        loaded += emails.len();
        futures::future::join_all(emails.iter().map(|email| mark_taken(email))).await;
    }

    log::info!("Email cache seeded with {loaded} recent logins (last {days} days)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn forgotten_emails_are_no_longer_taken() {
        assert!(!is_taken("cache.test@company.ph").await);
        mark_taken(" Cache.Test@company.ph").await;
        assert!(is_taken("cache.test@company.ph").await);
        forget("CACHE.TEST@company.ph").await;
        assert!(!is_taken("cache.test@company.ph").await);
    }
}
