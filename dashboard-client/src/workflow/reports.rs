//! Read-only aggregation and filtering over fetched collections.
//!
//! Filtering never mutates the source; pagination clamps to the filtered
//! result via `requisition_core::pagination`.

use crate::models::report::Report;
use crate::models::requisition::{Requisition, RequisitionStatus};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// Date window for report filtering. A custom range with `start > end` is an
/// empty window, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Today,
    ThisWeek,
    ThisMonth,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl DateWindow {
    /// Inclusive bounds of the window relative to `today`.
    fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            DateWindow::Today => (today, today),
            DateWindow::ThisWeek => {
                let weekday = today.weekday().num_days_from_monday() as i64;
                (today - Duration::days(weekday), today)
            }
            DateWindow::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                (first, today)
            }
            DateWindow::Custom { start, end } => (*start, *end),
        }
    }

    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let (start, end) = self.bounds(today);
        // An inverted range contains nothing
        start <= date && date <= end
    }
}

/// Filter reports by an optional date window and free-text search. The
/// source slice is untouched; matches are returned by reference.
pub fn filter_reports<'a>(
    reports: &'a [Report],
    window: Option<DateWindow>,
    search: Option<&str>,
    today: NaiveDate,
) -> Vec<&'a Report> {
    let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());

    reports
        .iter()
        .filter(|report| match window {
            Some(window) => window.contains(report.created_at.date_naive(), today),
            None => true,
        })
        .filter(|report| match &needle {
            Some(needle) => {
                report.title.to_lowercase().contains(needle)
                    || report
                        .body
                        .as_deref()
                        .map(|body| body.to_lowercase().contains(needle))
                        .unwrap_or(false)
            }
            None => true,
        })
        .collect()
}

/// Requisition counts per aggregate status, for the dashboard cards.
pub fn status_tally(requisitions: &[Requisition]) -> BTreeMap<RequisitionStatus, usize> {
    let mut tally = BTreeMap::new();
    for requisition in requisitions {
        *tally.entry(requisition.status).or_insert(0) += 1;
    }
    tally
}
