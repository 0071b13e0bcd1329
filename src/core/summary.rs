//! Pass/fail roll-ups over committed records

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::tolerance::PointResult;
use crate::entities::record::{CommittedRecord, MeasuredPoint};

/// Counts over evaluated points
///
/// Points whose spec band could not be parsed carry no result and are not
/// counted as checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub checked_points: usize,
    pub pass: usize,
    pub fail: usize,
    pub fail_plus: usize,
    pub fail_minus: usize,
    /// `pass / checked * 100`; zero when nothing was checked
    pub pass_rate_percent: f64,
}

impl Summary {
    pub fn from_results(results: impl IntoIterator<Item = PointResult>) -> Self {
        let mut summary = Summary::default();
        for result in results {
            summary.add(result);
        }
        summary.finish()
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a MeasuredPoint>) -> Self {
        Self::from_results(points.into_iter().filter_map(|p| p.result))
    }

    fn add(&mut self, result: PointResult) {
        self.checked_points += 1;
        match result {
            PointResult::Pass => self.pass += 1,
            PointResult::FailPlus => {
                self.fail += 1;
                self.fail_plus += 1;
            }
            PointResult::FailMinus => {
                self.fail += 1;
                self.fail_minus += 1;
            }
        }
    }

    fn finish(mut self) -> Self {
        self.pass_rate_percent = if self.checked_points == 0 {
            0.0
        } else {
            self.pass as f64 * 100.0 / self.checked_points as f64
        };
        self
    }

    /// Combine two summaries, recomputing the rate from the merged counts
    pub fn merge(self, other: Summary) -> Summary {
        Summary {
            checked_points: self.checked_points + other.checked_points,
            pass: self.pass + other.pass,
            fail: self.fail + other.fail,
            fail_plus: self.fail_plus + other.fail_plus,
            fail_minus: self.fail_minus + other.fail_minus,
            pass_rate_percent: 0.0,
        }
        .finish()
    }
}

/// Roll a set of records into one summary
pub fn summarize<'a>(records: impl IntoIterator<Item = &'a CommittedRecord>) -> Summary {
    Summary::from_points(records.into_iter().flat_map(|r| r.points.iter()))
}

/// Results of one point name across records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointTally {
    pub point_name: String,
    pub checked: usize,
    pub pass: usize,
    pub fail_plus: usize,
    pub fail_minus: usize,
}

impl PointTally {
    pub fn fail(&self) -> usize {
        self.fail_plus + self.fail_minus
    }
}

/// Per-point tallies in first-seen order
pub fn point_breakdown<'a>(records: impl IntoIterator<Item = &'a CommittedRecord>) -> Vec<PointTally> {
    let mut tallies: Vec<PointTally> = Vec::new();
    for point in records.into_iter().flat_map(|r| r.points.iter()) {
        let Some(result) = point.result else {
            continue;
        };
        let position = match tallies.iter().position(|t| t.point_name == point.point_name) {
            Some(position) => position,
            None => {
                tallies.push(PointTally {
                    point_name: point.point_name.clone(),
                    ..PointTally::default()
                });
                tallies.len() - 1
            }
        };
        let tally = &mut tallies[position];
        tally.checked += 1;
        match result {
            PointResult::Pass => tally.pass += 1,
            PointResult::FailPlus => tally.fail_plus += 1,
            PointResult::FailMinus => tally.fail_minus += 1,
        }
    }
    tallies
}

/// Distinct names of points that failed at least once
pub fn failing_points<'a>(records: impl IntoIterator<Item = &'a CommittedRecord>) -> BTreeSet<String> {
    records
        .into_iter()
        .flat_map(|r| r.points.iter())
        .filter(|p| p.result.is_some_and(|r| r.is_fail()))
        .map(|p| p.point_name.clone())
        .collect()
}
