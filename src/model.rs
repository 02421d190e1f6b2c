//! Core data model: seller segments, country tabs, metrics, and the
//! submission payload accepted by the run boundary.

use serde::{Deserialize, Serialize};

use crate::currency;

/// Seller classification. Determines the target spreadsheet and the
/// column-layout variant; fixed for the lifetime of a brand block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerSegment {
    NewSeller,
    ExistingSeller,
    Vendor,
}

impl SellerSegment {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellerSegment::NewSeller => "new_seller",
            SellerSegment::ExistingSeller => "existing_seller",
            SellerSegment::Vendor => "vendor",
        }
    }
}

/// Supported country tabs. One worksheet tab per code, per segment
/// spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountryCode {
    US,
    UK,
    CAN,
    AUS,
    DE,
    UAE,
}

impl CountryCode {
    pub const ALL: [CountryCode; 6] = [
        CountryCode::US,
        CountryCode::UK,
        CountryCode::CAN,
        CountryCode::AUS,
        CountryCode::DE,
        CountryCode::UAE,
    ];

    /// Worksheet tab title for this country.
    pub fn tab_title(&self) -> &'static str {
        match self {
            CountryCode::US => "US",
            CountryCode::UK => "UK",
            CountryCode::CAN => "CAN",
            CountryCode::AUS => "AUS",
            CountryCode::DE => "DE",
            CountryCode::UAE => "UAE",
        }
    }

    /// Normalize a free-form country name. `AU` is folded into `AUS` at
    /// the boundary; anything outside the supported set is rejected.
    pub fn parse(name: &str) -> Option<CountryCode> {
        match name.trim().to_ascii_uppercase().as_str() {
            "US" => Some(CountryCode::US),
            "UK" => Some(CountryCode::UK),
            "CAN" => Some(CountryCode::CAN),
            "AU" | "AUS" => Some(CountryCode::AUS),
            "DE" => Some(CountryCode::DE),
            "UAE" => Some(CountryCode::UAE),
            _ => None,
        }
    }
}

/// A single extracted value: display text plus the normalized number.
///
/// The number, when present, is always derived from the text by the
/// currency normalizer, even when extraction used a fallback path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metric {
    pub text: String,
    pub number: Option<f64>,
}

impl Metric {
    /// Build a metric from captured display text, normalizing to
    /// two-decimal per-unit currency precision.
    pub fn money(text: impl Into<String>) -> Self {
        let text = text.into();
        let number = currency::normalize_money(&text);
        Metric { text, number }
    }

    /// Build a metric from captured display text, normalizing to a whole
    /// count (revenue aggregates, unit counts).
    pub fn count(text: impl Into<String>) -> Self {
        let text = text.into();
        let number = currency::normalize_count(&text).map(|n| n as f64);
        Metric { text, number }
    }

}

/// Unit/revenue/profit projection for one scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub units: Option<i64>,
    pub revenue: Option<f64>,
    pub profit: Option<f64>,
}

/// Projections for the three planning scenarios, produced by an upstream
/// estimation service and consumed opaquely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Projection {
    pub low: ScenarioProjection,
    pub base: ScenarioProjection,
    pub high: ScenarioProjection,
}

/// Price / fee metrics read from the profitability calculator panel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfitabilityMetrics {
    pub product_price: Metric,
    pub fulfillment_fee: Metric,
    pub storage_fee_jan_sep: Metric,
    pub storage_fee_oct_dec: Metric,
}

impl ProfitabilityMetrics {
    /// The storage fee in effect for the given month (1-12). The overlay
    /// publishes two rate schedules; Oct-Dec selects the peak-season rate.
    pub fn active_storage_fee(&self, month: u32) -> &Metric {
        if month >= 10 {
            &self.storage_fee_oct_dec
        } else {
            &self.storage_fee_jan_sep
        }
    }
}

/// Everything extracted for one product, immutable once captured and
/// consumed once when written to the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub category_revenue: Metric,
    pub parent_monthly_revenue: Metric,
    pub profitability: Option<ProfitabilityMetrics>,
    pub projection: Option<Projection>,
}

/// One product entry of a submitted run, plus its extraction result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "productname")]
    pub product_name: String,
    pub url: String,
    pub keyword: String,
    #[serde(rename = "categoryUrl")]
    pub category_url: String,
    /// Path to the competitor dataset for this product, if one was
    /// uploaded alongside the submission.
    #[serde(rename = "csvPath", default, skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExtractionResult>,
}

/// Products grouped under one country tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryBlock {
    pub name: String,
    pub products: Vec<ProductRecord>,
}

/// One brand block: a seller segment plus its per-country product lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandBlock {
    pub brand: String,
    pub seller_type: SellerSegment,
    pub countries: Vec<CountryBlock>,
}

/// A full submitted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub brands: Vec<BrandBlock>,
}

impl Submission {
    /// Drop countries outside the supported set (warning per drop) and
    /// brand blocks left empty afterwards. Returns the number of country
    /// blocks that survived.
    pub fn normalize(&mut self) -> usize {
        let mut kept = 0;
        for brand in &mut self.brands {
            brand.countries.retain(|c| {
                let ok = CountryCode::parse(&c.name).is_some();
                if !ok {
                    tracing::warn!(brand = %brand.brand, country = %c.name, "dropping unsupported country");
                }
                ok
            });
            for country in &mut brand.countries {
                // canonical tab title, with AU folded into AUS
                if let Some(code) = CountryCode::parse(&country.name) {
                    country.name = code.tab_title().to_string();
                }
            }
            kept += brand.countries.len();
        }
        self.brands.retain(|b| !b.countries.is_empty());
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_parse_normalizes_au() {
        assert_eq!(CountryCode::parse("AU"), Some(CountryCode::AUS));
        assert_eq!(CountryCode::parse("aus"), Some(CountryCode::AUS));
        assert_eq!(CountryCode::parse(" uk "), Some(CountryCode::UK));
        assert_eq!(CountryCode::parse("FR"), None);
    }

    #[test]
    fn metric_number_tracks_text() {
        let m = Metric::count("4,768,718");
        assert_eq!(m.number, Some(4_768_718.0));
        let m = Metric::money("$7.88");
        assert_eq!(m.number, Some(7.88));
        let m = Metric::money("—");
        assert_eq!(m.number, None);
    }

    #[test]
    fn storage_fee_selection_by_month() {
        let pm = ProfitabilityMetrics {
            storage_fee_jan_sep: Metric::money("$1.00"),
            storage_fee_oct_dec: Metric::money("$2.40"),
            ..Default::default()
        };
        assert_eq!(pm.active_storage_fee(9).number, Some(1.00));
        assert_eq!(pm.active_storage_fee(10).number, Some(2.40));
        assert_eq!(pm.active_storage_fee(12).number, Some(2.40));
    }

    #[test]
    fn normalize_drops_unknown_countries_and_empty_brands() {
        let mut sub = Submission {
            brands: vec![BrandBlock {
                brand: "Acme".into(),
                seller_type: SellerSegment::NewSeller,
                countries: vec![
                    CountryBlock {
                        name: "AU".into(),
                        products: vec![],
                    },
                    CountryBlock {
                        name: "FR".into(),
                        products: vec![],
                    },
                ],
            }],
        };
        assert_eq!(sub.normalize(), 1);
        assert_eq!(sub.brands[0].countries[0].name, "AUS");
    }

    #[test]
    fn submission_payload_round_trips() {
        let json = r#"{
            "brands": [{
                "brand": "Big wipes",
                "seller_type": "new_seller",
                "countries": [{
                    "name": "UK",
                    "products": [{
                        "productname": "Grip Football",
                        "url": "https://www.amazon.co.uk/dp/B0012SNLJG",
                        "keyword": "football",
                        "categoryUrl": "https://www.amazon.co.uk/s?k=football",
                        "projection": {
                            "low": {"units": 63, "revenue": 798.0, "profit": 450.0},
                            "base": {"units": 96, "revenue": 1152.0, "profit": 300.0},
                            "high": {"units": 135, "revenue": 1560.0, "profit": 400.0}
                        }
                    }]
                }]
            }]
        }"#;
        let sub: Submission = serde_json::from_str(json).unwrap();
        assert_eq!(sub.brands[0].seller_type, SellerSegment::NewSeller);
        let p = &sub.brands[0].countries[0].products[0];
        assert_eq!(p.projection.as_ref().unwrap().base.units, Some(96));
    }
}
