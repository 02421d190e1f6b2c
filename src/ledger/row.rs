//! Building the 32-slot logical row for one extracted product.

use crate::ledger::columns::*;
use crate::ledger::layout::{self, MetricGroup};
use crate::model::{CountryCode, ProductRecord, SellerSegment};

/// Render a spreadsheet hyperlink formula with embedded quotes doubled.
pub fn hyperlink(url: &str, text: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    let esc = |s: &str| s.replace('"', "\"\"");
    let label = if text.is_empty() { "link" } else { text };
    format!("=HYPERLINK(\"{}\",\"{}\")", esc(url), esc(label))
}

/// Build the logical row for one product. Only the slots the scribe owns
/// are populated; empty strings mean "leave the cell alone" downstream.
///
/// New-seller policy: there is no live product yet, so the product link
/// doubles into the adjacent competitor slot and the current monthly
/// revenue cell is forced empty.
pub fn build_row(
    product: &ProductRecord,
    segment: SellerSegment,
    country: CountryCode,
) -> Vec<String> {
    let mut row = vec![String::new(); ROW_WIDTH];

    row[COL_CATEGORY] = if product.category_url.is_empty() {
        product.keyword.clone()
    } else {
        hyperlink(&product.category_url, &product.keyword)
    };
    row[COL_PRODUCT] = if product.url.is_empty() {
        product.product_name.clone()
    } else {
        hyperlink(&product.url, &product.product_name)
    };

    if let Some(result) = &product.result {
        row[COL_CURRENT_MONTHLY_REV] = result.parent_monthly_revenue.text.clone();
        row[COL_CATEGORY_MONTHLY_REV] = result.category_revenue.text.clone();

        if let Some(projection) = &result.projection {
            let [low, base, high] = layout::resolve(segment, country, MetricGroup::ProjectedUnits);
            if let Some(units) = projection.low.units {
                row[low] = units.to_string();
            }
            if let Some(units) = projection.base.units {
                row[base] = units.to_string();
            }
            if let Some(units) = projection.high.units {
                row[high] = units.to_string();
            }
        }
    }

    if segment == SellerSegment::NewSeller {
        row[COL_PRODUCT + 1] = row[COL_PRODUCT].clone();
        row[COL_CURRENT_MONTHLY_REV] = String::new();
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExtractionResult, Metric, Projection, ScenarioProjection};

    fn product(projection: Option<Projection>) -> ProductRecord {
        ProductRecord {
            product_name: "Grip \"Pro\" Football".into(),
            url: "https://www.amazon.co.uk/dp/B0012SNLJG".into(),
            keyword: "football".into(),
            category_url: "https://www.amazon.co.uk/s?k=football".into(),
            csv_path: None,
            projection: None,
            result: Some(ExtractionResult {
                category_revenue: Metric::count("4,768,718"),
                parent_monthly_revenue: Metric::money("$231,767.51"),
                profitability: None,
                projection,
            }),
        }
    }

    fn projection(low: i64, base: i64, high: i64) -> Projection {
        Projection {
            low: ScenarioProjection {
                units: Some(low),
                ..Default::default()
            },
            base: ScenarioProjection {
                units: Some(base),
                ..Default::default()
            },
            high: ScenarioProjection {
                units: Some(high),
                ..Default::default()
            },
        }
    }

    #[test]
    fn hyperlink_escapes_embedded_quotes() {
        assert_eq!(
            hyperlink("https://x.example/a", "say \"hi\""),
            "=HYPERLINK(\"https://x.example/a\",\"say \"\"hi\"\"\")"
        );
        assert_eq!(hyperlink("", "text"), "");
        assert_eq!(
            hyperlink("https://x.example", ""),
            "=HYPERLINK(\"https://x.example\",\"link\")"
        );
    }

    #[test]
    fn existing_seller_row_at_shifted_offsets() {
        let p = product(Some(projection(63, 96, 135)));
        let row = build_row(&p, SellerSegment::ExistingSeller, CountryCode::UK);
        assert_eq!(row[COL_CURRENT_MONTHLY_REV], "$231,767.51");
        assert_eq!(row[COL_CATEGORY_MONTHLY_REV], "4,768,718");
        // UK is abroad for sellers: units at base + 1
        assert_eq!(row[19], "63");
        assert_eq!(row[23], "96");
        assert_eq!(row[27], "135");
        assert!(row[COL_CATEGORY].starts_with("=HYPERLINK("));
    }

    #[test]
    fn new_seller_forces_current_revenue_empty_and_copies_link() {
        let p = product(Some(projection(63, 96, 135)));
        let row = build_row(&p, SellerSegment::NewSeller, CountryCode::UK);
        assert_eq!(row[COL_CURRENT_MONTHLY_REV], "");
        assert_eq!(row[COL_PRODUCT + 1], row[COL_PRODUCT]);
        // new-seller UK: units at base - 1
        assert_eq!(row[17], "63");
        assert_eq!(row[21], "96");
        assert_eq!(row[25], "135");
    }

    #[test]
    fn missing_projection_leaves_unit_cells_untouched() {
        let p = product(None);
        let row = build_row(&p, SellerSegment::ExistingSeller, CountryCode::US);
        assert_eq!(row[COL_UNITS_LOW], "");
        assert_eq!(row[COL_UNITS_BASE], "");
        assert_eq!(row[COL_UNITS_HIGH], "");
    }
}
