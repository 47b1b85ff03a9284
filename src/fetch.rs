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

//! Cached reads against the Dashboard API.
//!
//! Each read has its own [`TtlCache`]; only cache misses reach the API, and
//! each of those is counted and logged.

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::client::DashboardApi;
use crate::config::CacheTtls;
use crate::model::{HistoryPoint, HistoryQuery, Network, Organization, Ssid, normalize_history};

/// Number of upstream calls made by this process.
#[derive(Debug, Default)]
pub struct CallCounter {
    calls: AtomicU64,
}

impl CallCounter {
    pub fn record(&self, endpoint: &str) -> u64 {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        info!("[API CALL #{}] Fetching: {}", n, endpoint);
        n
    }

    pub fn get(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

pub struct Dashboard<A> {
    api: A,
    calls: CallCounter,
    organizations: TtlCache<(), Vec<Organization>>,
    networks: TtlCache<String, Vec<Network>>,
    ssids: TtlCache<String, Vec<Ssid>>,
    history: TtlCache<HistoryQuery, Vec<HistoryPoint>>,
}

impl<A: DashboardApi> Dashboard<A> {
    pub fn new(api: A, ttls: CacheTtls) -> Self {
        Self::with_clock(api, ttls, Arc::new(SystemClock))
    }

    pub fn with_clock(api: A, ttls: CacheTtls, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            calls: CallCounter::default(),
            organizations: TtlCache::new(ttls.medium, clock.clone()),
            networks: TtlCache::new(ttls.medium, clock.clone()),
            ssids: TtlCache::new(ttls.medium, clock.clone()),
            history: TtlCache::new(ttls.short, clock),
        }
    }

    pub fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.organizations.get_or_try_insert_with(&(), || {
            self.calls.record("organizations.getOrganizations");
            self.api.organizations()
        })
    }

    pub fn list_networks(&self, organization_id: &str) -> Result<Vec<Network>> {
        self.networks
            .get_or_try_insert_with(&organization_id.to_string(), || {
                self.calls.record(&format!(
                    "organizations.getOrganizationNetworks ({organization_id})"
                ));
                self.api.networks(organization_id)
            })
    }

    pub fn list_ssids(&self, network_id: &str) -> Result<Vec<Ssid>> {
        self.ssids.get_or_try_insert_with(&network_id.to_string(), || {
            self.calls
                .record(&format!("wireless.getNetworkWirelessSsids ({network_id})"));
            self.api.ssids(network_id)
        })
    }

    /// Client count history for one network, optionally one SSID.
    ///
    /// Never fails: an upstream error is logged and yields an empty series so
    /// one broken network cannot abort a multi-network report. Failures are
    /// not cached.
    pub fn client_history(&self, query: &HistoryQuery) -> Vec<HistoryPoint> {
        let result = self.history.get_or_try_insert_with(query, || {
            self.calls.record(&format!(
                "wireless.getNetworkWirelessClientCountHistory ({})",
                query.describe()
            ));
            let records = self.api.client_count_history(query)?;
            let normalized = normalize_history(&records);
            if normalized.coerced > 0 {
                warn!(
                    "{} of {} history rows for {} had no usable clientCount; counted as 0",
                    normalized.coerced,
                    records.len(),
                    query.describe()
                );
            }
            if normalized.skipped > 0 {
                warn!(
                    "Dropped {} history rows for {} with a missing or repeated startTs",
                    normalized.skipped,
                    query.describe()
                );
            }
            Ok(normalized.points)
        });

        match result {
            Ok(points) => points,
            Err(err) => {
                error!("API Error on {}: {:#}", query.network_id, err);
                Vec::new()
            }
        }
    }

    pub fn call_count(&self) -> u64 {
        self.calls.get()
    }
}
