//! Probabilistic set of registered staff emails. A miss means the email is
//! free; a hit still needs the cache or the database to confirm.

use anyhow::{Context, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::TryStreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::{PoisonError, RwLock};

const FILTER_CAPACITY: usize = 50_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static REGISTERED: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Canonical form used for every lookup: trimmed and lowercased.
#[inline]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn update<F: FnOnce(&mut CuckooFilter<String>)>(f: F) {
    // a panicked writer leaves the filter usable, at worst with extra hits
    f(&mut REGISTERED.write().unwrap_or_else(PoisonError::into_inner));
}

pub fn might_exist(email: &str) -> bool {
    REGISTERED
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&normalize(email))
}

pub fn insert(email: &str) {
    let key = normalize(email);
    update(|filter| {
        filter.add(&key);
    });
}

pub fn remove(email: &str) {
    let key = normalize(email);
    update(|filter| {
        filter.remove(&key);
    });
}

/// Seeds the filter with every staff email, `chunk` rows per write lock.
pub async fn warmup_email_filter(pool: &MySqlPool, chunk: usize) -> Result<()> {
    let mut rows = sqlx::query_scalar::<_, String>("SELECT email FROM users")
        .fetch(pool)
        .try_chunks(chunk.max(1));

    let mut loaded = 0usize;
    while let Some(emails) = rows
        .try_next()
        .await
        .map_err(|e| e.1)
        .context("streaming staff emails")?
    {
        loaded += emails.len();
        update(|filter| {
            for email in &emails {
                filter.add(&normalize(email));
            }
        });
    }

    tracing::info!(loaded, "Email filter seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case_and_padding() {
        insert("Filter.Test@Company.PH");
        assert!(might_exist("filter.test@company.ph"));
        assert!(might_exist("  FILTER.TEST@company.ph "));

        remove("filter.test@company.ph");
        assert!(!might_exist("filter.test@company.ph"));
    }

    #[test]
    fn normalize_trims_before_lowercasing() {
        assert_eq!(normalize("\tHR.Lead@Company.ph \n"), "hr.lead@company.ph");
    }
}
