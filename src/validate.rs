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

use chrono::NaiveDate;
use thiserror::Error;

/// The history endpoint only serves data this many days back.
pub const MAX_LOOKBACK_DAYS: i64 = 30;
/// Largest t0..t1 span the history endpoint accepts.
pub const MAX_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("Start date ({start}) is older than 30 days ({days} days ago).")]
    StartTooOld { start: NaiveDate, days: i64 },
    #[error("Window size ({days} days) exceeds 30-day limit.")]
    WindowTooLarge { days: i64 },
    #[error("End date ({end}) is before start date ({start}).")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Error)]
#[error("{}", join(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inclusive range of calendar days that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Checks every constraint against `today` and reports all of them at once.
    pub fn validated(
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let mut violations = Vec::new();

        let age = (today - start).num_days();
        if age > MAX_LOOKBACK_DAYS {
            violations.push(Violation::StartTooOld { start, days: age });
        }

        let window = (end - start).num_days();
        if window > MAX_WINDOW_DAYS {
            violations.push(Violation::WindowTooLarge { days: window });
        }
        if window < 0 {
            violations.push(Violation::EndBeforeStart { start, end });
        }

        if violations.is_empty() {
            Ok(Self { start, end })
        } else {
            Err(ValidationError { violations })
        }
    }

    #[cfg(test)]
    pub fn new_unchecked(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn t0(&self) -> String {
        self.start.format("%Y-%m-%dT00:00:00Z").to_string()
    }

    pub fn t1(&self) -> String {
        self.end.format("%Y-%m-%dT23:59:59Z").to_string()
    }
}
