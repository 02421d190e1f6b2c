//! Profitability metric extraction from the calculator panel.
//!
//! Flow: open the product page (isolating the tab per policy), open the
//! calculator through a three-tier click fallback, wait for the
//! marketplace's field set per its variant descriptor, then read price,
//! fulfillment fee, and the two seasonal storage fees. Whatever path
//! captured a value, the number always comes from the currency
//! normalizer.

use std::time::Duration;

use crate::browser::{evaluate_with_timeout, script, BrowserSession, PageDriver};
use crate::currency;
use crate::error::{Result, ScribeError};
use crate::extract::locator::{AncestorWalk, LocateStrategy};
use crate::extract::marketplace::{FeeSource, FieldWait, Marketplace, PriceSource, StorageSource};
use crate::extract::{selectors, settle};
use crate::model::{Metric, ProfitabilityMetrics};

/// Tuning for the calculator flow.
#[derive(Debug, Clone)]
pub struct ProfitabilityConfig {
    /// Navigation timeout for the product page.
    pub nav_timeout: Duration,
    /// Per-tier timeout while hunting the calculator trigger.
    pub calc_tier_timeout: Duration,
    /// Overall budget for the field-presence wait.
    pub field_wait_budget: Duration,
    /// Close every other tab before opening the product page.
    pub close_all_tabs_first: bool,
    /// Close sibling tabs once the product page is open.
    pub close_others_after_open: bool,
}

impl Default for ProfitabilityConfig {
    fn default() -> Self {
        ProfitabilityConfig {
            nav_timeout: Duration::from_secs(30),
            calc_tier_timeout: Duration::from_secs(15),
            field_wait_budget: Duration::from_secs(60),
            close_all_tabs_first: false,
            close_others_after_open: true,
        }
    }
}

pub struct ProfitabilityExtractor<'a> {
    session: &'a dyn BrowserSession,
    cfg: ProfitabilityConfig,
}

impl<'a> ProfitabilityExtractor<'a> {
    pub fn new(session: &'a dyn BrowserSession) -> Self {
        ProfitabilityExtractor {
            session,
            cfg: ProfitabilityConfig::default(),
        }
    }

    pub fn with_config(session: &'a dyn BrowserSession, cfg: ProfitabilityConfig) -> Self {
        ProfitabilityExtractor { session, cfg }
    }

    /// Run the full calculator flow against a product URL.
    pub async fn extract(&self, product_url: &str) -> Result<ProfitabilityMetrics> {
        let marketplace = Marketplace::from_url(product_url);
        let variant = marketplace.variant();
        tracing::info!(url = product_url, code = marketplace.code(), "opening product page");

        if self.cfg.close_all_tabs_first {
            let n = self
                .session
                .close_pages_except(None)
                .await
                .map_err(|e| ScribeError::Browser(e.to_string()))?;
            if n > 0 {
                tracing::debug!(closed = n, "closed tabs before opening product");
            }
        }

        let page = self
            .session
            .open_page(product_url)
            .await
            .map_err(|e| ScribeError::Browser(e.to_string()))?;
        page.bring_to_front()
            .await
            .map_err(|e| ScribeError::Browser(e.to_string()))?;

        if self.cfg.close_others_after_open {
            let id = page.id();
            let n = self
                .session
                .close_pages_except(Some(&id))
                .await
                .map_err(|e| ScribeError::Browser(e.to_string()))?;
            if n > 0 {
                tracing::debug!(closed = n, "closed sibling tabs, product tab isolated");
            }
        }

        self.open_calculator(page.as_ref()).await?;
        self.wait_for_fields(page.as_ref(), variant.wait).await?;
        self.read_fields(page.as_ref(), marketplace).await
    }

    /// Click the calculator trigger: attribute locator, then role+text
    /// pattern, then any calculator-text element.
    async fn open_calculator(&self, page: &dyn PageDriver) -> Result<()> {
        let tiers = [
            ("test-id", script::click(selectors::CALCULATOR_TRIGGER)),
            (
                "role-text",
                script::click_by_text("button,div[role=button]", "profitability|calculator"),
            ),
            (
                "any-text",
                script::click_by_text("div,button,span,a", "Calculator"),
            ),
        ];
        for (tier, js) in tiers {
            let deadline = tokio::time::Instant::now() + self.cfg.calc_tier_timeout;
            while tokio::time::Instant::now() < deadline {
                match evaluate_with_timeout(page, &js, Duration::from_secs(3)).await {
                    Ok(Some(v)) if v.as_bool() == Some(true) => {
                        tracing::debug!(tier, "calculator trigger clicked");
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(tier, error = %e, "calculator click errored");
                    }
                }
                tokio::time::sleep(settle::FIELD_POLL).await;
            }
        }
        Err(ScribeError::CalculatorNotOpened(
            "trigger not clickable through any locator tier".to_string(),
        ))
    }

    /// Wait for the marketplace's field set per its descriptor.
    async fn wait_for_fields(&self, page: &dyn PageDriver, wait: FieldWait) -> Result<()> {
        let required = [
            selectors::STORAGE_FEE_JAN_SEP,
            selectors::STORAGE_FEE_OCT_DEC,
            selectors::PRICE_INPUT,
        ];
        match wait {
            FieldWait::Skip => Ok(()),
            FieldWait::BestEffort => {
                let _ = self.fields_present(page, &required).await;
                Ok(())
            }
            FieldWait::Required => {
                let deadline = tokio::time::Instant::now() + self.cfg.field_wait_budget;
                while tokio::time::Instant::now() < deadline {
                    if self.fields_present(page, &required).await {
                        return Ok(());
                    }
                    tokio::time::sleep(settle::FIELD_POLL).await;
                }
                Err(ScribeError::CalculatorNotOpened(format!(
                    "calculator fields absent after {}s",
                    self.cfg.field_wait_budget.as_secs()
                )))
            }
        }
    }

    async fn fields_present(&self, page: &dyn PageDriver, required: &[&str]) -> bool {
        for selector in required {
            let js = script::element_present(selector);
            match evaluate_with_timeout(page, &js, Duration::from_millis(2500)).await {
                Ok(Some(v)) if v.as_bool() == Some(true) => {}
                _ => return false,
            }
        }
        true
    }

    /// Read the four metrics through the marketplace variant.
    async fn read_fields(
        &self,
        page: &dyn PageDriver,
        marketplace: Marketplace,
    ) -> Result<ProfitabilityMetrics> {
        let variant = marketplace.variant();

        let (jan_sep, oct_dec) = match variant.storage {
            StorageSource::TestIdPanels => {
                let jan = self
                    .text_at(page, selectors::STORAGE_FEE_JAN_SEP, 0)
                    .await
                    .unwrap_or_default();
                let oct = self
                    .text_at(page, selectors::STORAGE_FEE_OCT_DEC, 0)
                    .await
                    .unwrap_or_default();
                (jan, oct)
            }
            StorageSource::SharedCell { index } => {
                let shared = self
                    .text_at(page, selectors::CALCULATOR_CELL, index)
                    .await
                    .unwrap_or_default();
                (shared.clone(), shared)
            }
        };

        let price = match variant.price {
            PriceSource::TestIdInput => {
                let js = script::input_value(selectors::PRICE_INPUT);
                self.string_result(page, &js).await.unwrap_or_default()
            }
            PriceSource::ContainerInput => {
                let js = script::input_value_near_class(&selectors::PRICE_WRAPPER_CLASSES);
                self.string_result(page, &js).await.unwrap_or_default()
            }
        };

        let fee = self.read_fulfillment_fee(page, variant.fee).await?;

        Ok(ProfitabilityMetrics {
            product_price: Metric::money(price),
            fulfillment_fee: Metric::money(fee),
            storage_fee_jan_sep: Metric::money(jan_sep),
            storage_fee_oct_dec: Metric::money(oct_dec),
        })
    }

    /// Fulfillment fee: variant source first, label-proximity tree-walk
    /// behind it. This is the one field with a dedicated fallback: its
    /// cell position is the least stable across extension builds.
    async fn read_fulfillment_fee(&self, page: &dyn PageDriver, source: FeeSource) -> Result<String> {
        let direct = match source {
            FeeSource::PrimaryPanel => self.text_at(page, selectors::FEE_PANEL_PRIMARY, 0).await,
            FeeSource::IndexedCell { index } => {
                self.text_at(page, selectors::CALCULATOR_CELL, index)
                    .await
                    .map(|t| from_first_digit(&t))
            }
        };
        if let Some(text) = direct {
            if !text.trim().is_empty() {
                return Ok(text);
            }
        }

        tracing::debug!("fulfillment fee cell missed, falling back to label proximity");
        let walk = AncestorWalk {
            depth: 6,
            timeout: Duration::from_secs(3),
        };
        match walk.locate(page, "FBA Fees").await {
            Ok(Some(text)) if !text.trim().is_empty() => Ok(text),
            _ => Err(ScribeError::ValueNotFound {
                label: "FBA Fees".to_string(),
                strategies: 2,
            }),
        }
    }

    async fn text_at(&self, page: &dyn PageDriver, selector: &str, nth: usize) -> Option<String> {
        let js = script::inner_text(selector, nth);
        self.string_result(page, &js).await
    }

    async fn string_result(&self, page: &dyn PageDriver, js: &str) -> Option<String> {
        match evaluate_with_timeout(page, js, Duration::from_secs(3)).await {
            Ok(Some(v)) => v.as_str().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            _ => None,
        }
    }
}

/// Slice a cell's text from its first digit: cells prefix values with
/// label fragments on some marketplaces ("Storage fee AED 1.25").
fn from_first_digit(text: &str) -> String {
    match text.find(|c: char| c.is_ascii_digit()) {
        Some(idx) => text[idx..].to_string(),
        None => text.to_string(),
    }
}

/// Re-render a metric set in one detected currency style, preferring the
/// normalized numbers. Metrics with no parseable number keep their
/// captured text.
pub fn harmonize_currency(metrics: &mut ProfitabilityMetrics) {
    let symbol = currency::detect_symbol(
        [
            metrics.product_price.text.as_str(),
            metrics.fulfillment_fee.text.as_str(),
            metrics.storage_fee_jan_sep.text.as_str(),
            metrics.storage_fee_oct_dec.text.as_str(),
        ]
        .into_iter(),
    );
    for metric in [
        &mut metrics.product_price,
        &mut metrics.fulfillment_fee,
        &mut metrics.storage_fee_jan_sep,
        &mut metrics.storage_fee_oct_dec,
    ] {
        if let Some(n) = metric.number {
            metric.text = currency::format_money(symbol, n);
        }
    }
}
