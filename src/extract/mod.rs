//! Metric extraction against the research extension's overlay.
//!
//! The overlay DOM carries no stable identifiers (generated class names
//! rotate with extension releases), so every reader runs a strategy chain
//! (exact selector, then geometric proximity, then ancestor tree-walk)
//! and every wait carries an explicit timeout.

pub mod category;
pub mod locator;
pub mod marketplace;
pub mod profitability;

use std::time::Duration;

/// Known overlay selectors. Extension-build-specific; fastest path when
/// they still match, with strategy fallbacks behind each.
pub mod selectors {
    /// Aggregate revenue value tile on the results overlay.
    pub const OVERLAY_REVENUE_VALUE: &str = "div.sc-iYRSqv.jktLat";
    /// Calculator trigger control on a product page.
    pub const CALCULATOR_TRIGGER: &str = "div[data-testid=\"calculator\"]";
    /// Calculator panel fields (markets that expose test ids).
    pub const STORAGE_FEE_JAN_SEP: &str =
        "div[data-testid=\"calculator-profitability-storageFeeJanSep\"]";
    pub const STORAGE_FEE_OCT_DEC: &str =
        "div[data-testid=\"calculator-profitability-storageFeeOctDec\"]";
    pub const PRICE_INPUT: &str = "input[data-testid=\"calculator-profitability-price\"]";
    /// Generic value cell in the calculator panel; field identity is
    /// positional and varies per marketplace.
    pub const CALCULATOR_CELL: &str = "div.sc-zbfRe.bUrasH";
    /// Fulfillment-fee panel on the primary marketplace.
    pub const FEE_PANEL_PRIMARY: &str = "div.sc-gsnOKb.jESxTP";
    /// Class fragments marking the price field wrapper where no test id
    /// exists.
    pub const PRICE_WRAPPER_CLASSES: [&str; 2] = ["sc-kdYKFS", "lgKsUy"];
}

/// Named settle delays. The overlay re-renders asynchronously with no
/// observable completion signal, so these are approximations, not
/// synchronization.
pub mod settle {
    use super::Duration;

    /// After triggering a results expansion.
    pub const AFTER_EXPAND: Duration = Duration::from_secs(30);
    /// After raising the overlay tab to the foreground.
    pub const AFTER_FOCUS: Duration = Duration::from_millis(500);
    /// Between field-presence probes while the calculator renders.
    pub const FIELD_POLL: Duration = Duration::from_millis(300);
}
