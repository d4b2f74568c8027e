use chrono::{DateTime, Duration, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Seconds between encounter checks.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;
/// A check fires when a uniform draw in [0, 1) exceeds this.
pub const DEFAULT_THRESHOLD: f64 = 0.1;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

impl Rarity {
    /// Relative weight used by [`RarityWeighted`].
    pub fn weight(self) -> u32 {
        match self {
            Rarity::Common => 60,
            Rarity::Uncommon => 25,
            Rarity::Rare => 12,
            Rarity::Legendary => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cat {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
}

impl Cat {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rarity: Rarity) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rarity,
        }
    }
}

/// A simulated cat encounter. Transient; never stored with the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryEvent {
    pub triggered_at: DateTime<Utc>,
    pub cat: Cat,
}

/// How to pick a cat out of the catalog.
pub trait SelectionPolicy {
    fn select<'a>(&self, cats: &'a [Cat], rng: &mut dyn RngCore) -> Option<&'a Cat>;
}

/// Every cat equally likely
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSelection;

impl SelectionPolicy for UniformSelection {
    fn select<'a>(&self, cats: &'a [Cat], rng: &mut dyn RngCore) -> Option<&'a Cat> {
        cats.choose(rng)
    }
}

/// Common cats show up far more often than legendary ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct RarityWeighted;

impl SelectionPolicy for RarityWeighted {
    fn select<'a>(&self, cats: &'a [Cat], rng: &mut dyn RngCore) -> Option<&'a Cat> {
        let dist = WeightedIndex::new(cats.iter().map(|c| c.rarity.weight())).ok()?;
        cats.get(dist.sample(rng))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatCatalog {
    cats: Vec<Cat>,
}

impl CatCatalog {
    pub fn new(cats: Vec<Cat>) -> Self {
        Self { cats }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            Cat::new("cheese", "Cheese", Rarity::Common),
            Cat::new("mackerel", "Mackerel Tabby", Rarity::Common),
            Cat::new("nabi", "Nabi", Rarity::Common),
            Cat::new("socks", "Socks", Rarity::Common),
            Cat::new("tuxedo", "Tuxedo", Rarity::Uncommon),
            Cat::new("calico", "Calico", Rarity::Uncommon),
            Cat::new("russian-blue", "Russian Blue", Rarity::Rare),
            Cat::new("odd-eye", "Odd-Eyed White", Rarity::Rare),
            Cat::new("palace-guardian", "Palace Guardian", Rarity::Legendary),
        ])
    }

    pub fn cats(&self) -> &[Cat] {
        &self.cats
    }

    pub fn is_empty(&self) -> bool {
        self.cats.is_empty()
    }

    pub fn select(&self, policy: &dyn SelectionPolicy, rng: &mut dyn RngCore) -> Option<Cat> {
        policy.select(&self.cats, rng).cloned()
    }
}

/// Interval-gated random encounter check.
///
/// The pending check is a single optional deadline, so arming again replaces
/// it and disarming drops it; there is never more than one outstanding.
#[derive(Debug, Clone)]
pub struct DiscoveryTrigger<R> {
    interval: Duration,
    threshold: f64,
    next_check_at: Option<DateTime<Utc>>,
    rng: R,
}

impl<R: Rng> DiscoveryTrigger<R> {
    pub fn new(interval: std::time::Duration, threshold: f64, rng: R) -> Self {
        Self {
            interval: Duration::from_std(interval).unwrap_or_else(|_| Duration::days(365)),
            threshold,
            next_check_at: None,
            rng,
        }
    }

    /// Schedule the next check one full interval after `now`.
    pub fn arm(&mut self, now: DateTime<Utc>) {
        self.next_check_at = now.checked_add_signed(self.interval);
        debug!(next = ?self.next_check_at, "discovery armed");
    }

    pub fn disarm(&mut self) {
        if self.next_check_at.take().is_some() {
            debug!("discovery disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.next_check_at.is_some()
    }

    pub fn next_check_at(&self) -> Option<DateTime<Utc>> {
        self.next_check_at
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Run the check if it is due.
    ///
    /// A due check reschedules itself one interval after `now` regardless of
    /// the outcome; missed intervals are not replayed.
    pub fn poll(
        &mut self,
        now: DateTime<Utc>,
        catalog: &CatCatalog,
        policy: &dyn SelectionPolicy,
    ) -> Option<DiscoveryEvent> {
        let due = self.next_check_at?;
        if now < due {
            return None;
        }
        self.next_check_at = now.checked_add_signed(self.interval);

        let draw: f64 = self.rng.gen();
        if draw <= self.threshold {
            debug!(draw, threshold = self.threshold, "no encounter this time");
            return None;
        }

        let cat = catalog.select(policy, &mut self.rng)?;
        info!(cat = %cat.name, rarity = %cat.rarity, "cat encountered");
        Some(DiscoveryEvent {
            triggered_at: now,
            cat,
        })
    }
}
