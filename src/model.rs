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

//! Typed records returned by the Dashboard API and the normalization applied
//! to raw client count history before it reaches the aggregation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::validate::DateRange;

/// Product type tag that marks a network as eligible for history queries.
pub const WIRELESS_PRODUCT: &str = "wireless";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub product_types: Vec<String>,
}

impl Network {
    pub fn is_wireless(&self) -> bool {
        self.product_types.iter().any(|p| p == WIRELESS_PRODUCT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ssid {
    pub number: u32,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Time bucket width accepted by the client count history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    Hourly,
    Daily,
}

impl Resolution {
    pub fn seconds(self) -> u32 {
        match self {
            Resolution::Hourly => 3600,
            Resolution::Daily => 86400,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Hourly => write!(f, "1 Hour"),
            Resolution::Daily => write!(f, "1 Day"),
        }
    }
}

/// Arguments of one history fetch. Also the cache key for that fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryQuery {
    pub network_id: String,
    pub t0: String,
    pub t1: String,
    pub resolution: Resolution,
    pub ssid: Option<u32>,
}

impl HistoryQuery {
    pub fn new(
        network_id: &str,
        range: &DateRange,
        resolution: Resolution,
        ssid: Option<u32>,
    ) -> Self {
        Self {
            network_id: network_id.to_string(),
            t0: range.t0(),
            t1: range.t1(),
            resolution,
            ssid,
        }
    }

    /// Human-readable key arguments used in log lines.
    pub fn describe(&self) -> String {
        match self.ssid {
            Some(number) => format!("Net: {}, SSID: {}", self.network_id, number),
            None => format!("Net: {}", self.network_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    #[serde(rename = "startTs")]
    pub start_ts: DateTime<Utc>,
    #[serde(rename = "clientCount")]
    pub client_count: f64,
}

/// Result of turning raw history records into [`HistoryPoint`]s.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalizedHistory {
    pub points: Vec<HistoryPoint>,
    /// Rows whose client count was missing, non-numeric or negative and became 0.
    pub coerced: usize,
    /// Rows dropped for an unreadable timestamp or a repeated bucket.
    pub skipped: usize,
}

pub fn normalize_history(records: &[Value]) -> NormalizedHistory {
    let mut out = NormalizedHistory::default();
    let mut seen = HashSet::new();

    for record in records {
        let Some(start_ts) = record
            .get("startTs")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
        else {
            out.skipped += 1;
            continue;
        };

        if !seen.insert(start_ts) {
            out.skipped += 1;
            continue;
        }

        let client_count = match coerce_count(record.get("clientCount")) {
            Some(count) => count,
            None => {
                out.coerced += 1;
                0.0
            }
        };

        out.points.push(HistoryPoint {
            start_ts,
            client_count,
        });
    }

    out
}

fn coerce_count(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (number.is_finite() && number >= 0.0).then_some(number)
}
