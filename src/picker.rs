//! Competitor selection from an uploaded CSV dataset.
//!
//! Consumed as an opaque "pick a competitor record" lookup by the run
//! coordinator: filter rows whose product text contains the keyword
//! phrase, prefer the most recent creation date, break ties on parent
//! revenue. When nothing matches the keyword, fall back to the first row
//! rather than returning nothing; a weak competitor beats an empty cell.

use std::path::Path;

use chrono::NaiveDate;

use crate::currency;
use crate::error::{Result, ScribeError};

/// Column headers expected in the export.
const COL_PRODUCT_DETAILS: &str = "Product Details";
const COL_URL: &str = "URL";
const COL_PARENT_REVENUE: &str = "Parent Level Revenue";
const COL_CREATION_DATE: &str = "Creation Date";

/// Date formats seen across exports.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%b-%Y", "%b %d, %Y"];

/// One competitor candidate.
#[derive(Debug, Clone, Default)]
pub struct CompetitorRecord {
    pub product_details: String,
    pub url: String,
    pub parent_level_revenue: String,
    pub creation_date: String,
}

impl CompetitorRecord {
    fn revenue_value(&self) -> f64 {
        currency::normalize_amount(&self.parent_level_revenue).unwrap_or(0.0)
    }

    fn created(&self) -> Option<NaiveDate> {
        parse_date(&self.creation_date)
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Load the dataset from a CSV export. Missing columns surface as a
/// configuration problem for that product's lookup.
pub fn load_dataset(path: &Path) -> Result<Vec<CompetitorRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        ScribeError::Configuration(format!("cannot read competitor CSV {}: {e}", path.display()))
    })?;
    let headers = reader
        .headers()
        .map_err(|e| ScribeError::Configuration(format!("competitor CSV has no header: {e}")))?
        .clone();
    let idx = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (details, url, revenue, created) = match (
        idx(COL_PRODUCT_DETAILS),
        idx(COL_URL),
        idx(COL_PARENT_REVENUE),
        idx(COL_CREATION_DATE),
    ) {
        (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
        _ => {
            return Err(ScribeError::Configuration(format!(
                "competitor CSV {} is missing expected columns",
                path.display()
            )))
        }
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row
            .map_err(|e| ScribeError::Configuration(format!("competitor CSV row error: {e}")))?;
        let get = |i: usize| row.get(i).unwrap_or_default().trim().to_string();
        records.push(CompetitorRecord {
            product_details: get(details),
            url: get(url),
            parent_level_revenue: get(revenue),
            creation_date: get(created),
        });
    }
    Ok(records)
}

/// Pick the best candidate for a keyword phrase.
pub fn pick_best<'a>(
    records: &'a [CompetitorRecord],
    keyword_phrase: &str,
) -> Option<&'a CompetitorRecord> {
    if records.is_empty() {
        return None;
    }
    let needle = keyword_phrase.trim().to_lowercase();
    let matching: Vec<&CompetitorRecord> = records
        .iter()
        .filter(|r| r.product_details.to_lowercase().contains(&needle))
        .collect();
    if matching.is_empty() {
        return records.first();
    }
    if matching.len() == 1 {
        return Some(matching[0]);
    }
    matching.into_iter().max_by(|a, b| {
        (a.created(), a.revenue_value())
            .partial_cmp(&(b.created(), b.revenue_value()))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}
