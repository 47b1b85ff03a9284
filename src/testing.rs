//! In-memory [`DashboardApi`] used by unit tests.

use anyhow::{Result, anyhow};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::client::DashboardApi;
use crate::model::{HistoryQuery, Network, Organization, Ssid};

#[derive(Default)]
pub struct FakeApi {
    organizations: Vec<Organization>,
    networks: HashMap<String, Vec<Network>>,
    ssids: HashMap<String, Vec<Ssid>>,
    history: HashMap<(String, Option<u32>), Vec<Value>>,
    failing_history: HashSet<String>,
    failing_ssids: HashSet<String>,
    latency: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn with_organization(mut self, id: &str, name: &str) -> Self {
        self.organizations.push(Organization {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_network(mut self, org_id: &str, id: &str, name: &str, products: &[&str]) -> Self {
        self.networks.entry(org_id.into()).or_default().push(Network {
            id: id.into(),
            name: name.into(),
            product_types: products.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    pub fn with_ssid(mut self, network_id: &str, number: u32, name: &str, enabled: bool) -> Self {
        self.ssids.entry(network_id.into()).or_default().push(Ssid {
            number,
            name: name.into(),
            enabled,
        });
        self
    }

    pub fn with_history(mut self, network_id: &str, ssid: Option<u32>, records: Vec<Value>) -> Self {
        self.history.insert((network_id.into(), ssid), records);
        self
    }

    pub fn failing_history(mut self, network_id: &str) -> Self {
        self.failing_history.insert(network_id.into());
        self
    }

    pub fn failing_ssids(mut self, network_id: &str) -> Self {
        self.failing_ssids.insert(network_id.into());
        self
    }

    /// Every call sleeps for `latency` after being recorded.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of upstream calls recorded under exactly `key`.
    pub fn calls_to(&self, key: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == key).count()
    }

    /// Number of upstream calls whose key starts with `prefix`.
    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, key: String) {
        self.calls.lock().unwrap().push(key);
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
    }
}

impl DashboardApi for FakeApi {
    fn organizations(&self) -> Result<Vec<Organization>> {
        self.record("organizations".into());
        Ok(self.organizations.clone())
    }

    fn networks(&self, organization_id: &str) -> Result<Vec<Network>> {
        self.record(format!("networks:{organization_id}"));
        Ok(self
            .networks
            .get(organization_id)
            .cloned()
            .unwrap_or_default())
    }

    fn ssids(&self, network_id: &str) -> Result<Vec<Ssid>> {
        self.record(format!("ssids:{network_id}"));
        if self.failing_ssids.contains(network_id) {
            return Err(anyhow!("ssids unavailable for {network_id}"));
        }
        Ok(self.ssids.get(network_id).cloned().unwrap_or_default())
    }

    fn client_count_history(&self, query: &HistoryQuery) -> Result<Vec<Value>> {
        match query.ssid {
            Some(n) => self.record(format!("history:{}:{}", query.network_id, n)),
            None => self.record(format!("history:{}", query.network_id)),
        }
        if self.failing_history.contains(&query.network_id) {
            return Err(anyhow!("500 Internal Server Error"));
        }
        Ok(self
            .history
            .get(&(query.network_id.clone(), query.ssid))
            .cloned()
            .unwrap_or_default())
    }
}
