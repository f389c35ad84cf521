//! # Staleness Policy
//! Decides, per URL and provider, whether a share count must be re-fetched.
//!
//! A `(url, provider)` slot is fresh until one minute after its last fetch and
//! stale afterwards. Only articles modified within the freshness window are
//! polled at all; older articles keep their last counts forever. The site
//! root's subscriber count (Feedly) ignores the window and is polled every run.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::cache::{ProviderId, ShareCountRecord};

pub const DEFAULT_WINDOW_DAYS: i64 = 14;
const MAX_WINDOW_DAYS: i64 = 36_500;

/// Minimum age of a fetch before the slot becomes eligible again.
pub fn debounce() -> Duration {
    Duration::minutes(1)
}

/// Providers whose refresh is switched off regardless of staleness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DisabledSpec")]
pub struct DisabledProviders(BTreeSet<ProviderId>);

impl DisabledProviders {
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `"facebook, Pocket"`.
    /// Empty items are ignored; unknown names are an error.
    pub fn parse(list: &str) -> Result<Self> {
        Self::from_names(list.split(','))
    }

    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for n in names {
            let t = n.as_ref().trim();
            if t.is_empty() {
                continue;
            }
            set.insert(t.parse::<ProviderId>()?);
        }
        Ok(Self(set))
    }

    pub fn contains(&self, provider: ProviderId) -> bool {
        self.0.contains(&provider)
    }

    pub fn iter(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ProviderId> for DisabledProviders {
    fn from_iter<T: IntoIterator<Item = ProviderId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Accepts either `"a,b"` or `["a", "b"]` in config files.
#[derive(Deserialize)]
#[serde(untagged)]
enum DisabledSpec {
    List(Vec<String>),
    Csv(String),
}

impl TryFrom<DisabledSpec> for DisabledProviders {
    type Error = anyhow::Error;

    fn try_from(raw: DisabledSpec) -> Result<Self> {
        match raw {
            DisabledSpec::List(v) => Self::from_names(v),
            DisabledSpec::Csv(s) => Self::parse(&s),
        }
    }
}

/// True iff `provider` is enabled and its last fetch is older than the debounce guard.
/// A slot that was never fetched is always stale.
pub fn should_refresh(
    last_fetch: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    disabled: &DisabledProviders,
    provider: ProviderId,
) -> bool {
    if disabled.contains(provider) {
        return false;
    }
    match last_fetch {
        None => true,
        Some(at) => at < now - debounce(),
    }
}

#[derive(Debug, Clone)]
pub struct StalenessPolicy {
    window: Duration,
    disabled: DisabledProviders,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_DAYS, DisabledProviders::none())
    }
}

impl StalenessPolicy {
    pub fn new(window_days: i64, disabled: DisabledProviders) -> Self {
        Self {
            window: Duration::days(window_days.clamp(0, MAX_WINDOW_DAYS)),
            disabled,
        }
    }

    pub fn window_days(&self) -> i64 {
        self.window.num_days()
    }

    pub fn disabled(&self) -> &DisabledProviders {
        &self.disabled
    }

    /// Article modified after `now - window`. Unknown modification time is outside.
    pub fn in_window(&self, last_modified: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        last_modified.is_some_and(|m| m > now - self.window)
    }

    pub fn should_refresh(
        &self,
        last_fetch: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        provider: ProviderId,
    ) -> bool {
        should_refresh(last_fetch, now, &self.disabled, provider)
    }

    /// Providers from `available` that must be fetched for this URL now.
    pub fn due_providers(
        &self,
        record: Option<&ShareCountRecord>,
        last_modified: Option<DateTime<Utc>>,
        is_site_root: bool,
        available: &[ProviderId],
        now: DateTime<Utc>,
    ) -> Vec<ProviderId> {
        let in_window = self.in_window(last_modified, now);
        let mut due = Vec::new();
        for &p in available {
            if p == ProviderId::Feedly {
                if is_site_root && !self.disabled.contains(p) {
                    due.push(p);
                }
                continue;
            }
            if !in_window {
                continue;
            }
            let last = record.and_then(|r| r.fetched_at(p));
            if self.should_refresh(last, now, p) {
                due.push(p);
            }
        }
        due
    }
}
