// wirelessctl - wireless client history for Meraki Dashboard networks
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Time-bounded memoization for upstream reads.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Maps a key to the last fetched value until its TTL runs out.
///
/// The lock is held across the fetch, so two callers asking for the same
/// key inside one window trigger a single upstream call.
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key` or runs `fetch` and stores its
    /// result. Errors are returned as-is and never stored.
    pub fn get_or_try_insert_with<F>(&self, key: &K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("cache lock poisoned"))?;

        let now = self.clock.now();
        if let Some(entry) = entries.get(key)
            && entry.is_live(now)
        {
            return Ok(entry.value.clone());
        }

        let value = fetch()?;
        let now = self.clock.now();
        entries.retain(|_, e| e.is_live(now));
        entries.insert(
            key.clone(),
            Entry {
                value: value.clone(),
                expires_at: now.checked_add(self.ttl),
            },
        );
        Ok(value)
    }
}

#[cfg(test)]
pub(crate) struct ManualClock(Mutex<Instant>);

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Instant::now())))
    }

    pub(crate) fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.0.lock().unwrap()
    }
}
