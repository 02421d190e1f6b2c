//! Logical column positions for the 32-slot ledger row.
//!
//! These are the *base* positions of the shared ledger template. Physical
//! positions for the projected-units and competitor-pricing groups shift
//! per (segment, country); see [`crate::ledger::layout`]. Everything else
//! sits at its base position on every variant.
//!
//! # Important
//!
//! The mappings must match the live spreadsheet templates. When a template
//! is re-laid-out, these constants and the layout delta table must be
//! updated together.

/// Total logical columns per row (0..=31).
pub const ROW_WIDTH: usize = 32;

/// Auto-incrementing sequence number ("No.").
pub const COL_NO: usize = 0;
/// Category keyword, hyperlinked to the category search URL.
pub const COL_CATEGORY: usize = 1;
/// Product name, hyperlinked to the product URL.
pub const COL_PRODUCT: usize = 2;
/// The product's current monthly (parent-level) revenue.
pub const COL_CURRENT_MONTHLY_REV: usize = 3;
/// Category monthly revenue (aggregate from the results overlay).
pub const COL_CATEGORY_MONTHLY_REV: usize = 4;

/// Competitor link cell.
pub const COL_COMPETITOR: usize = 6;
/// Competitor monthly revenue.
pub const COL_COMPETITOR_MONTHLY_REV: usize = 7;

/// Competitor pricing group (moves together per segment/region).
pub const COL_PRICE: usize = 9;
pub const COL_FULFILLMENT_FEE: usize = 11;
pub const COL_STORAGE_FEE: usize = 13;

/// Per-scenario triples: profit-per-unit, units, revenue. The units
/// columns form the projected-units group (moves together per
/// segment/region); the flanking columns are formula-derived in the
/// template and never written by the scribe.
pub const COL_PPU_LOW: usize = 17;
pub const COL_UNITS_LOW: usize = 18;
pub const COL_REV_LOW: usize = 19;
pub const COL_PPU_BASE: usize = 21;
pub const COL_UNITS_BASE: usize = 22;
pub const COL_REV_BASE: usize = 23;
pub const COL_PPU_HIGH: usize = 25;
pub const COL_UNITS_HIGH: usize = 26;
pub const COL_REV_HIGH: usize = 27;
