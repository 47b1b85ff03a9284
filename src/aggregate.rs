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

//! Fan-out over the selected networks (and optionally their SSIDs), labeling
//! and union of the per-unit series, and the cross-series total.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::client::DashboardApi;
use crate::fetch::Dashboard;
use crate::model::{HistoryPoint, HistoryQuery, Resolution};
use crate::progress::ProgressReporter;
use crate::targets::Target;
use crate::validate::DateRange;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("no client data found for the selected criteria")]
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledPoint {
    #[serde(rename = "startTs")]
    pub start_ts: DateTime<Utc>,
    #[serde(rename = "clientCount")]
    pub client_count: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalPoint {
    #[serde(rename = "startTs")]
    pub start_ts: DateTime<Utc>,
    #[serde(rename = "clientCount")]
    pub client_count: f64,
}

/// Combined table of one run plus its per-timestamp total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    /// Series labels in the order they were produced.
    pub labels: Vec<String>,
    pub rows: Vec<LabeledPoint>,
    pub total: Vec<TotalPoint>,
}

pub struct AggregationRequest<'a> {
    pub targets: &'a [Target],
    pub range: &'a DateRange,
    pub resolution: Resolution,
    pub split_by_ssid: bool,
}

#[derive(Default)]
struct Combined {
    labels: Vec<String>,
    seen: HashSet<String>,
    rows: Vec<LabeledPoint>,
}

impl Combined {
    fn push(&mut self, label: String, unit_key: &str, points: Vec<HistoryPoint>) {
        if points.is_empty() {
            return;
        }
        // Two networks (or SSIDs) may share a display name, and a name may
        // already look like a suffixed one.
        let mut candidate = label.clone();
        let mut attempt = 1;
        while self.seen.contains(&candidate) {
            candidate = if attempt == 1 {
                format!("{label} [{unit_key}]")
            } else {
                format!("{label} [{unit_key}] ({attempt})")
            };
            attempt += 1;
        }
        let label = candidate;
        self.seen.insert(label.clone());
        self.labels.push(label.clone());
        self.rows.extend(points.into_iter().map(|p| LabeledPoint {
            start_ts: p.start_ts,
            client_count: p.client_count,
            label: label.clone(),
        }));
    }
}

pub fn run_aggregation<A: DashboardApi>(
    dashboard: &Dashboard<A>,
    request: &AggregationRequest<'_>,
    progress: &mut dyn ProgressReporter,
) -> Result<Aggregation, AggregateError> {
    let mut total_steps = request.targets.len();
    let mut completed = 0;
    let mut combined = Combined::default();

    for target in request.targets {
        if request.split_by_ssid {
            completed += 1;
            progress.report(
                &format!("Fetching SSIDs for {}", target.name),
                completed,
                total_steps,
            );
            let ssids = match dashboard.list_ssids(&target.id) {
                Ok(ssids) => ssids,
                Err(err) => {
                    error!("API Error on {}: {:#}", target.id, err);
                    continue;
                }
            };
            let enabled: Vec<_> = ssids.into_iter().filter(|s| s.enabled).collect();
            total_steps += enabled.len();

            for ssid in enabled {
                completed += 1;
                progress.report(
                    &format!("{} - {}", target.name, ssid.name),
                    completed,
                    total_steps,
                );
                let query = HistoryQuery::new(
                    &target.id,
                    request.range,
                    request.resolution,
                    Some(ssid.number),
                );
                let points = dashboard.client_history(&query);
                combined.push(
                    format!("{} ({})", target.name, ssid.name),
                    &format!("{}#{}", target.id, ssid.number),
                    points,
                );
            }
        } else {
            completed += 1;
            progress.report(&target.name, completed, total_steps);
            let query = HistoryQuery::new(&target.id, request.range, request.resolution, None);
            let points = dashboard.client_history(&query);
            combined.push(target.name.clone(), &target.id, points);
        }
    }
    progress.finish();

    if combined.rows.is_empty() {
        warn!("No client data found for the selected criteria.");
        return Err(AggregateError::NoData);
    }

    info!(
        "Data collection complete. Processing {} data sets.",
        combined.labels.len()
    );
    let total = total_series(&combined.rows);

    Ok(Aggregation {
        labels: combined.labels,
        rows: combined.rows,
        total,
    })
}

/// Sum of client counts per timestamp over the labels present at that timestamp.
pub fn total_series(rows: &[LabeledPoint]) -> Vec<TotalPoint> {
    let mut sums: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for row in rows {
        *sums.entry(row.start_ts).or_default() += row.client_count;
    }
    sums.into_iter()
        .map(|(start_ts, client_count)| TotalPoint {
            start_ts,
            client_count,
        })
        .collect()
}
