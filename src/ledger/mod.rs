//! Ledger subsystem: logical columns, per-segment layout resolution, row
//! building, and the row writer.

pub mod columns;
pub mod layout;
pub mod row;
pub mod writer;
