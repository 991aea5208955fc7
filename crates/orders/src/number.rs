//! Order number allocation.
//!
//! Numbers look like `ORD-20260314093015-042`: a UTC timestamp down to the
//! second plus a zero-padded random suffix in `000..=999`. Uniqueness is
//! checked against the order store; the loop is bounded.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tablefront_core::{DomainError, RepositoryError};

use crate::repository::OrderNumberLookup;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

const PREFIX: &str = "ORD-";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Human-readable, unique order reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new(at: DateTime<Utc>, suffix: u16) -> Result<Self, DomainError> {
        if suffix > 999 {
            return Err(DomainError::validation(format!(
                "order number suffix must be below 1000, got {suffix}"
            )));
        }
        Ok(Self(format!(
            "{PREFIX}{}-{suffix:03}",
            at.format(TIMESTAMP_FORMAT)
        )))
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::validation(format!("invalid order number '{raw}'"));

        let rest = raw.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let (stamp, suffix) = rest.split_once('-').ok_or_else(invalid)?;

        let all_digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(stamp, 14) || !all_digits(suffix, 3) {
            return Err(invalid());
        }
        chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).map_err(|_| invalid())?;

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for OrderNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.0
    }
}

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("order number lookup failed: {0}")]
    Lookup(#[from] RepositoryError),
}

/// Domain service allocating order numbers not yet present in the store.
pub struct OrderNumberGenerator<L> {
    lookup: L,
    clock: Arc<dyn Clock>,
    rng: Mutex<SmallRng>,
    max_attempts: u32,
}

impl<L> core::fmt::Debug for OrderNumberGenerator<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OrderNumberGenerator")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl<L> OrderNumberGenerator<L>
where
    L: OrderNumberLookup,
{
    pub fn new(lookup: L) -> Self {
        Self::with_parts(
            lookup,
            Arc::new(SystemClock),
            SmallRng::from_entropy(),
            DEFAULT_MAX_ATTEMPTS,
        )
    }

    /// Fully injectable constructor (deterministic tests).
    pub fn with_parts(lookup: L, clock: Arc<dyn Clock>, rng: SmallRng, max_attempts: u32) -> Self {
        Self {
            lookup,
            clock,
            rng: Mutex::new(rng),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Produce a number the lookup reports as unused.
    ///
    /// Gives up with `DomainError::ExhaustedRetries` after `max_attempts`
    /// candidates were all taken.
    pub async fn generate(&self) -> Result<OrderNumber, OrderNumberError> {
        for _ in 0..self.max_attempts {
            let candidate = OrderNumber::new(self.clock.now(), self.next_suffix())?;
            if !self.lookup.exists_by_order_number(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(DomainError::ExhaustedRetries {
            attempts: self.max_attempts,
        }
        .into())
    }

    fn next_suffix(&self) -> u16 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..1000)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use tablefront_core::RepositoryResult;

    use super::*;

    struct AlwaysTaken {
        calls: AtomicU32,
    }

    #[async_trait]
    impl OrderNumberLookup for AlwaysTaken {
        async fn exists_by_order_number(&self, _: &OrderNumber) -> RepositoryResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    struct Taken(Mutex<HashSet<OrderNumber>>);

    #[async_trait]
    impl OrderNumberLookup for Taken {
        async fn exists_by_order_number(&self, n: &OrderNumber) -> RepositoryResult<bool> {
            Ok(self.0.lock().unwrap().contains(n))
        }
    }

    struct Broken;

    #[async_trait]
    impl OrderNumberLookup for Broken {
        async fn exists_by_order_number(&self, _: &OrderNumber) -> RepositoryResult<bool> {
            Err(RepositoryError::Backend("connection refused".to_string()))
        }
    }

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 15).unwrap()))
    }

    #[test]
    fn format_is_prefix_timestamp_and_padded_suffix() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 15).unwrap();
        assert_eq!(OrderNumber::new(at, 7).unwrap().as_str(), "ORD-20260314093015-007");
        assert!(OrderNumber::new(at, 1000).is_err());
    }

    #[test]
    fn parse_rejects_malformed_numbers() {
        assert!(OrderNumber::parse("ORD-20260314093015-007").is_ok());
        for raw in ["", "ORD-2026-007", "ord-20260314093015-007", "ORD-20261314093015-007", "ORD-20260314093015-07"] {
            assert!(OrderNumber::parse(raw).is_err(), "{raw}");
        }
    }

    #[tokio::test]
    async fn gives_up_after_the_bound() {
        let lookup = Arc::new(AlwaysTaken {
            calls: AtomicU32::new(0),
        });
        let generator =
            OrderNumberGenerator::with_parts(lookup.clone(), fixed_clock(), SmallRng::seed_from_u64(1), 10);

        let err = generator.generate().await.unwrap_err();

        assert_eq!(
            err,
            OrderNumberError::Domain(DomainError::ExhaustedRetries { attempts: 10 })
        );
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn never_returns_an_existing_number() {
        let taken: HashSet<OrderNumber> = (0..990)
            .map(|s| OrderNumber::new(fixed_clock().now(), s).unwrap())
            .collect();
        let generator = OrderNumberGenerator::with_parts(
            Taken(Mutex::new(taken.clone())),
            fixed_clock(),
            SmallRng::seed_from_u64(7),
            10_000,
        );

        for _ in 0..20 {
            let n = generator.generate().await.unwrap();
            assert!(!taken.contains(&n), "{n} was already taken");
            assert!(n.as_str().starts_with("ORD-20260314093015-99"));
        }
    }

    #[tokio::test]
    async fn lookup_failures_are_propagated() {
        let generator = OrderNumberGenerator::new(Broken);
        assert!(matches!(
            generator.generate().await,
            Err(OrderNumberError::Lookup(RepositoryError::Backend(_)))
        ));
    }

    #[tokio::test]
    async fn free_store_yields_first_candidate() {
        let generator = OrderNumberGenerator::with_parts(
            Taken(Mutex::new(HashSet::new())),
            fixed_clock(),
            SmallRng::seed_from_u64(3),
            1,
        );
        let n = generator.generate().await.unwrap();
        assert!(OrderNumber::parse(n.as_str()).is_ok());
    }
}
