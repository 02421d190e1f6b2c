//! Run orchestration: brand → country → product, extraction through the
//! shared browser session, then ledger writes.
//!
//! One run at a time, products strictly in submission order. Per-product
//! and per-competitor failures are recorded and skipped after the retry
//! ceiling; a missing country tab skips that country with a warning;
//! configuration problems fail the whole run before any extraction.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Datelike;
use serde::Serialize;

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::error::{Result, ScribeError};
use crate::extract::category::CategoryRevenueExtractor;
use crate::extract::profitability::{harmonize_currency, ProfitabilityExtractor};
use crate::ledger::columns::*;
use crate::ledger::layout::{self, MetricGroup};
use crate::ledger::row::{build_row, hyperlink};
use crate::ledger::writer::RowLedgerWriter;
use crate::model::{
    BrandBlock, CountryBlock, CountryCode, ExtractionResult, ProductRecord, SellerSegment,
    Submission,
};
use crate::picker;
use crate::retry::{with_retry, RetryPolicy};
use crate::sheets::SheetsApi;

/// Outcome of one product within a run.
#[derive(Debug, Clone, Serialize)]
pub struct ProductOutcome {
    pub brand: String,
    pub country: String,
    pub keyword: String,
    /// 1-based ledger row written, when the product got that far.
    pub row: Option<u32>,
    pub error: Option<String>,
}

/// Everything that happened in one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub outcomes: Vec<ProductOutcome>,
}

pub struct RunCoordinator<'a> {
    cfg: &'a Config,
    sheets: &'a dyn SheetsApi,
    session: &'a dyn BrowserSession,
    retry: RetryPolicy,
    /// Settle delay after opening a category page, before hunting the
    /// overlay tab.
    category_open_settle: Duration,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(cfg: &'a Config, sheets: &'a dyn SheetsApi, session: &'a dyn BrowserSession) -> Self {
        RunCoordinator {
            cfg,
            sheets,
            session,
            retry: RetryPolicy::default(),
            category_open_settle: Duration::from_secs(5),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[cfg(test)]
    pub fn with_category_settle(mut self, settle: Duration) -> Self {
        self.category_open_settle = settle;
        self
    }

    /// Execute a full submission. Only configuration problems fail the
    /// run as a whole; everything else lands in the report.
    pub async fn execute(&self, mut submission: Submission) -> Result<RunReport> {
        submission.normalize();

        // every segment's spreadsheet must resolve before any extraction
        for brand in &submission.brands {
            self.cfg.spreadsheet_for(brand.seller_type)?;
        }

        let mut report = RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            outcomes: Vec::new(),
        };
        for brand in &submission.brands {
            self.process_brand(brand, &mut report).await;
        }
        Ok(report)
    }

    async fn process_brand(&self, brand: &BrandBlock, report: &mut RunReport) {
        let segment = brand.seller_type;
        // validated in execute()
        let spreadsheet = match self.cfg.spreadsheet_for(segment) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(brand = %brand.brand, error = %e, "segment unresolvable");
                return;
            }
        };
        tracing::info!(brand = %brand.brand, segment = segment.as_str(), spreadsheet, "processing brand block");

        for country_block in &brand.countries {
            let Some(country) = CountryCode::parse(&country_block.name) else {
                continue;
            };
            let writer = match RowLedgerWriter::open(self.sheets, spreadsheet, country.tab_title())
                .await
            {
                Ok(w) => w,
                Err(e) => {
                    tracing::warn!(brand = %brand.brand, country = %country_block.name, error = %e,
                        "skipping country");
                    continue;
                }
            };
            self.process_country(brand, segment, country, country_block, &writer, report)
                .await;
        }
    }

    async fn process_country(
        &self,
        brand: &BrandBlock,
        segment: SellerSegment,
        country: CountryCode,
        block: &CountryBlock,
        writer: &RowLedgerWriter<'_>,
        report: &mut RunReport,
    ) {
        for product in &block.products {
            let outcome = self
                .process_product(brand, segment, country, product, writer)
                .await;
            if let Some(err) = &outcome.error {
                tracing::error!(brand = %brand.brand, country = country.tab_title(),
                    keyword = %product.keyword, row = ?outcome.row, error = %err,
                    "product failed, continuing with the next one");
            }
            report.outcomes.push(outcome);
        }
    }

    async fn process_product(
        &self,
        brand: &BrandBlock,
        segment: SellerSegment,
        country: CountryCode,
        product: &ProductRecord,
        writer: &RowLedgerWriter<'_>,
    ) -> ProductOutcome {
        let mut outcome = ProductOutcome {
            brand: brand.brand.clone(),
            country: country.tab_title().to_string(),
            keyword: product.keyword.clone(),
            row: None,
            error: None,
        };

        // 1) drive the overlay and read the aggregates
        let result = match self.extract_product(product).await {
            Ok(r) => r,
            Err(e) => {
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };

        // 2) build the logical row and write it
        let mut enriched = product.clone();
        enriched.result = Some(result);
        let row_vals = build_row(&enriched, segment, country);

        let row1 = match self.write_ledger_row(writer, &row_vals).await {
            Ok(r) => r,
            Err(e) => {
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };
        outcome.row = Some(row1);
        tracing::info!(country = country.tab_title(), row = row1, keyword = %product.keyword,
            "ledger row written");

        // 3) competitor pass, when a dataset accompanied the product
        if let Some(csv_path) = &product.csv_path {
            if let Err(e) = self
                .competitor_pass(segment, country, product, csv_path, writer, row1)
                .await
            {
                outcome.error = Some(format!("competitor lookup: {e}"));
            }
        }

        outcome
    }

    /// Extraction for the main pass: open the category page, let the
    /// overlay inject itself, read the aggregates. Retry-wrapped as one
    /// unit; the overlay state is rebuilt on every attempt.
    async fn extract_product(&self, product: &ProductRecord) -> Result<ExtractionResult> {
        let reading = with_retry(self.retry, "category revenue", || async {
            let page = self
                .session
                .open_page("about:blank")
                .await
                .map_err(|e| ScribeError::Browser(e.to_string()))?;
            page.navigate(&product.category_url, Duration::from_secs(30))
                .await
                .map_err(|e| ScribeError::Browser(e.to_string()))?;
            page.bring_to_front()
                .await
                .map_err(|e| ScribeError::Browser(e.to_string()))?;
            tokio::time::sleep(self.category_open_settle).await;

            CategoryRevenueExtractor::new(self.session).extract().await
        })
        .await?;

        Ok(ExtractionResult {
            category_revenue: reading.total_revenue,
            parent_monthly_revenue: reading.parent_revenue.unwrap_or_default(),
            profitability: None,
            projection: product.projection.clone(),
        })
    }

    /// Duplicate the template row, then overwrite the cells the scribe
    /// owns and mark them.
    async fn write_ledger_row(
        &self,
        writer: &RowLedgerWriter<'_>,
        row_vals: &[String],
    ) -> Result<u32> {
        let row1 = writer.duplicate_last_row().await?;
        let next_no = writer.next_sequence_number().await?;

        let mut cells = BTreeMap::new();
        cells.insert(COL_NO, next_no.to_string());
        for (col, value) in row_vals.iter().enumerate() {
            if !value.is_empty() {
                cells.insert(col, value.clone());
            }
        }
        writer.write_cells(row1, &cells).await?;

        let written: Vec<usize> = cells.keys().copied().collect();
        writer.highlight(row1, &written).await?;
        Ok(row1)
    }

    /// Pick the competitor, write its link and revenue, then extract and
    /// write its pricing metrics at the segment's offsets.
    async fn competitor_pass(
        &self,
        segment: SellerSegment,
        country: CountryCode,
        product: &ProductRecord,
        csv_path: &str,
        writer: &RowLedgerWriter<'_>,
        row1: u32,
    ) -> Result<()> {
        let dataset = picker::load_dataset(std::path::Path::new(csv_path))?;
        let Some(best) = picker::pick_best(&dataset, &product.keyword) else {
            tracing::warn!(keyword = %product.keyword, "competitor dataset empty");
            return Ok(());
        };
        tracing::info!(competitor = %best.product_details, row = row1, "competitor selected");

        // the new-seller template keeps the competitor pair next to the
        // product cell instead of the dedicated columns
        let (link_col, mrev_col) = if segment == SellerSegment::NewSeller {
            (COL_PRODUCT + 1, COL_PRODUCT + 2)
        } else {
            (COL_COMPETITOR, COL_COMPETITOR_MONTHLY_REV)
        };
        let mut cells = BTreeMap::new();
        if !best.url.is_empty() || !best.product_details.is_empty() {
            cells.insert(link_col, hyperlink(&best.url, &best.product_details));
        }
        cells.insert(mrev_col, best.parent_level_revenue.clone());
        writer.write_cells(row1, &cells).await?;
        writer
            .highlight(row1, &cells.keys().copied().collect::<Vec<_>>())
            .await?;

        if best.url.is_empty() {
            return Ok(());
        }

        // competitor pricing from the calculator panel
        let mut metrics = with_retry(self.retry, "competitor profitability", || async {
            ProfitabilityExtractor::new(self.session)
                .extract(&best.url)
                .await
        })
        .await?;
        harmonize_currency(&mut metrics);

        let month = chrono::Local::now().month();
        let storage = metrics.active_storage_fee(month).clone();

        let [price_col, fee_col, storage_col] =
            layout::resolve(segment, country, MetricGroup::CompetitorPricing);
        let mut cells = BTreeMap::new();
        if let Some(price) = metrics.product_price.number {
            cells.insert(price_col, format!("{price:.2}"));
        }
        // vendor templates derive the fulfillment fee by formula
        if segment != SellerSegment::Vendor {
            if let Some(fee) = metrics.fulfillment_fee.number {
                cells.insert(fee_col, format!("{fee:.2}"));
            }
        }
        if let Some(fee) = storage.number {
            cells.insert(storage_col, format!("{fee:.2}"));
        }
        writer.write_cells(row1, &cells).await?;
        writer
            .highlight(row1, &cells.keys().copied().collect::<Vec<_>>())
            .await?;
        tracing::info!(row = row1, "competitor pricing written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testing::{FakePage, FakeSession};
    use crate::ledger::writer::testing::{FakeSheets, FakeTab};
    use crate::model::{Projection, ScenarioProjection};
    use serde_json::json;

    fn test_config() -> Config {
        Config {
            new_seller_spreadsheet_id: "ns-sheet".into(),
            existing_seller_spreadsheet_id: "es-sheet".into(),
            vendor_spreadsheet_id: String::new(),
            client_email: "robot@example.iam".into(),
            private_key: "key".into(),
            chrome_path: None,
            user_data_dir: None,
            profile_dir: "Default".into(),
            cdp_port: None,
            http_port: 4000,
        }
    }

    fn uk_overlay_page() -> FakePage {
        FakePage::new("https://www.amazon.co.uk/s?k=football")
            .respond("includes('Xray')", json!(true))
            .respond("sc-iYRSqv", json!("4,768,718"))
    }

    fn submission(segment: SellerSegment) -> Submission {
        Submission {
            brands: vec![BrandBlock {
                brand: "Big wipes".into(),
                seller_type: segment,
                countries: vec![CountryBlock {
                    name: "UK".into(),
                    products: vec![ProductRecord {
                        product_name: "Grip Football".into(),
                        url: "https://www.amazon.co.uk/dp/B0012SNLJG".into(),
                        keyword: "football".into(),
                        category_url: "https://www.amazon.co.uk/s?k=football".into(),
                        csv_path: None,
                        projection: Some(Projection {
                            low: ScenarioProjection {
                                units: Some(63),
                                ..Default::default()
                            },
                            base: ScenarioProjection {
                                units: Some(96),
                                ..Default::default()
                            },
                            high: ScenarioProjection {
                                units: Some(135),
                                ..Default::default()
                            },
                        }),
                        result: None,
                    }],
                }],
            }],
        }
    }

    #[tokio::test]
    async fn new_seller_uk_run_writes_units_at_shifted_offsets() {
        let cfg = test_config();
        let sheets = FakeSheets::with_tab(
            "ns-sheet",
            "UK",
            FakeTab::with_rows(7, vec![vec!["No."], vec!["4", "prior row"]]),
        );
        let session = FakeSession::new(vec![uk_overlay_page()]);
        let coordinator = RunCoordinator::new(&cfg, &sheets, &session)
            .with_retry_policy(RetryPolicy::immediate(2))
            .with_category_settle(Duration::from_millis(1));

        let report = coordinator
            .execute(submission(SellerSegment::NewSeller))
            .await
            .unwrap();
        assert_eq!(report.outcomes.len(), 1);
        let outcome = &report.outcomes[0];
        assert!(outcome.error.is_none(), "error: {:?}", outcome.error);
        assert_eq!(outcome.row, Some(3));

        let row = sheets.row_values("ns-sheet", "UK", 3);
        // sequence = prior max + 1
        assert_eq!(row[COL_NO], "5");
        // new-seller UK: units at base - 1
        assert_eq!(row[17], "63");
        assert_eq!(row[21], "96");
        assert_eq!(row[25], "135");
        // current monthly revenue forced empty for new sellers
        assert_eq!(row[COL_CURRENT_MONTHLY_REV], "");
        assert_eq!(row[COL_CATEGORY_MONTHLY_REV], "4,768,718");
        assert!(row[COL_CATEGORY].contains("football"));
        // written cells carry the review marker
        assert!(sheets.cell("ns-sheet", "UK", 3, 17).highlighted);
        assert!(!sheets.cell("ns-sheet", "UK", 3, 30).highlighted);
    }

    #[tokio::test]
    async fn overlay_failure_is_recorded_not_fatal() {
        let cfg = test_config();
        let sheets = FakeSheets::with_tab("es-sheet", "UK", FakeTab::with_rows(7, vec![]));
        // no overlay anywhere
        let session = FakeSession::new(vec![]);
        let coordinator = RunCoordinator::new(&cfg, &sheets, &session)
            .with_retry_policy(RetryPolicy::immediate(2))
            .with_category_settle(Duration::from_millis(1));

        let report = coordinator
            .execute(submission(SellerSegment::ExistingSeller))
            .await
            .unwrap();
        let outcome = &report.outcomes[0];
        assert!(outcome.row.is_none());
        assert!(outcome.error.as_ref().unwrap().contains("overlay"));
    }

    #[tokio::test]
    async fn missing_tab_skips_country_and_run_continues() {
        let cfg = test_config();
        // spreadsheet exists but has no UK tab
        let sheets = FakeSheets::with_tab("es-sheet", "US", FakeTab::with_rows(7, vec![]));
        let session = FakeSession::new(vec![uk_overlay_page()]);
        let coordinator = RunCoordinator::new(&cfg, &sheets, &session)
            .with_retry_policy(RetryPolicy::immediate(1))
            .with_category_settle(Duration::from_millis(1));

        let report = coordinator
            .execute(submission(SellerSegment::ExistingSeller))
            .await
            .unwrap();
        // the country was skipped eagerly: no outcome, no retry burn
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn unconfigured_segment_fails_before_extraction() {
        let cfg = test_config();
        let sheets = FakeSheets::default();
        let session = FakeSession::new(vec![]);
        let coordinator = RunCoordinator::new(&cfg, &sheets, &session);
        let err = coordinator
            .execute(submission(SellerSegment::Vendor))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::Configuration(_)));
    }
}
