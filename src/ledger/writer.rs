//! Row-ledger writing: duplicate the last filled row, overwrite only the
//! cells the scribe owns, mark them for review.
//!
//! The insertion position is "below the last filled row at the time of
//! insertion". Concurrent external edits can shift that position; there is
//! no optimistic locking. An accepted limitation of the backend.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::sheets::{SheetsApi, TabMeta};

/// Writer bound to one spreadsheet and one tab.
pub struct RowLedgerWriter<'a> {
    api: &'a dyn SheetsApi,
    spreadsheet: String,
    tab: String,
    meta: TabMeta,
}

impl std::fmt::Debug for RowLedgerWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowLedgerWriter")
            .field("spreadsheet", &self.spreadsheet)
            .field("tab", &self.tab)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl<'a> RowLedgerWriter<'a> {
    /// Resolve the tab eagerly; a missing tab fails here, before any
    /// extraction result is consumed.
    pub async fn open(api: &'a dyn SheetsApi, spreadsheet: &str, tab: &str) -> Result<Self> {
        let meta = api.tab_meta(spreadsheet, tab).await?;
        Ok(RowLedgerWriter {
            api,
            spreadsheet: spreadsheet.to_string(),
            tab: tab.to_string(),
            meta,
        })
    }

    pub fn sheet_id(&self) -> i64 {
        self.meta.sheet_id
    }

    /// First fully empty row, scanning column A from row 1 (1-based).
    async fn first_empty_row(&self) -> Result<u32> {
        let used = self.api.column_a(&self.spreadsheet, &self.tab).await?.len();
        Ok(used as u32 + 1)
    }

    /// Insert a new row below the last filled row and duplicate that row's
    /// values, formulas, and formatting into it. On an empty tab, insert a
    /// blank row at the top instead. Returns the new row's 1-based
    /// position.
    pub async fn duplicate_last_row(&self) -> Result<u32> {
        let first_empty = self.first_empty_row().await?;
        let last_filled = first_empty.saturating_sub(1);
        if last_filled < 1 {
            self.api
                .insert_blank_row(&self.spreadsheet, self.meta.sheet_id, 0)
                .await?;
            return Ok(1);
        }

        // insert at 0-based index == last_filled places the new row
        // directly below it
        let new_row1 = last_filled + 1;
        self.api
            .insert_blank_row(&self.spreadsheet, self.meta.sheet_id, last_filled)
            .await?;
        self.api
            .copy_row_full(
                &self.spreadsheet,
                self.meta.sheet_id,
                last_filled - 1,
                new_row1 - 1,
                self.meta.column_count,
            )
            .await?;
        Ok(new_row1)
    }

    /// Write only the supplied non-empty cells; everything else in the row
    /// keeps its duplicated formulas and values. Empty strings are skips,
    /// never erasures.
    pub async fn write_cells(&self, row1: u32, cells: &BTreeMap<usize, String>) -> Result<()> {
        let non_empty: BTreeMap<usize, String> = cells
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        if non_empty.is_empty() {
            return Ok(());
        }
        self.api
            .write_cells(&self.spreadsheet, &self.tab, row1, &non_empty)
            .await
    }

    /// Next "No." value: last integer-parseable entry in column A plus
    /// one, or 1 when the column holds none.
    pub async fn next_sequence_number(&self) -> Result<i64> {
        let column = self.api.column_a(&self.spreadsheet, &self.tab).await?;
        for value in column.iter().rev() {
            if let Ok(n) = value.trim().parse::<i64>() {
                return Ok(n + 1);
            }
        }
        Ok(1)
    }

    /// Mark machine-written cells: black background, white foreground.
    pub async fn highlight(&self, row1: u32, cols: &[usize]) -> Result<()> {
        self.api
            .format_cells_inverted(&self.spreadsheet, self.meta.sheet_id, row1 - 1, cols)
            .await
    }

    /// One row's current values, padded to the logical width.
    pub async fn read_row_padded(&self, row1: u32, width: usize) -> Result<Vec<String>> {
        let mut row = self.api.read_row(&self.spreadsheet, &self.tab, row1).await?;
        row.resize(width, String::new());
        Ok(row)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakeSheets, FakeTab};
    use super::*;
    use crate::error::ScribeError;

    fn seeded() -> FakeSheets {
        // header row, then a formatted template row carrying a formula
        let mut tab = FakeTab::with_rows(7, vec![vec!["No.", "Category"], vec!["1", "football"]]);
        tab.rows[1][20].value = "=S2*R2".to_string();
        tab.rows[1][20].highlighted = true;
        FakeSheets::with_tab("sheet-1", "UK", tab)
    }

    #[tokio::test]
    async fn missing_tab_fails_on_open() {
        let api = seeded();
        let err = RowLedgerWriter::open(&api, "sheet-1", "UAE")
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::TabNotFound { .. }));
    }

    #[tokio::test]
    async fn duplicate_carries_values_formulas_and_formatting() {
        let api = seeded();
        let writer = RowLedgerWriter::open(&api, "sheet-1", "UK").await.unwrap();
        let row1 = writer.duplicate_last_row().await.unwrap();
        assert_eq!(row1, 3);
        // full duplication of the last filled row
        assert_eq!(api.row_values("sheet-1", "UK", 3)[0], "1");
        let cell = api.cell("sheet-1", "UK", 3, 20);
        assert_eq!(cell.value, "=S2*R2");
        assert!(cell.highlighted);
    }

    #[tokio::test]
    async fn empty_tab_gets_row_one() {
        let api = FakeSheets::with_tab("sheet-1", "UK", FakeTab::with_rows(7, vec![]));
        let writer = RowLedgerWriter::open(&api, "sheet-1", "UK").await.unwrap();
        assert_eq!(writer.duplicate_last_row().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn partial_write_preserves_unwritten_columns() {
        let api = seeded();
        let writer = RowLedgerWriter::open(&api, "sheet-1", "UK").await.unwrap();
        let row1 = writer.duplicate_last_row().await.unwrap();

        let mut cells = BTreeMap::new();
        cells.insert(0, "2".to_string());
        cells.insert(1, "soccer ball".to_string());
        cells.insert(20, String::new()); // skip marker, not an erasure
        writer.write_cells(row1, &cells).await.unwrap();

        let row = api.row_values("sheet-1", "UK", row1 as usize);
        assert_eq!(row[0], "2");
        assert_eq!(row[1], "soccer ball");
        assert_eq!(row[20], "=S2*R2");
    }

    #[tokio::test]
    async fn sequence_numbers_increase_from_last_parseable() {
        let api = seeded();
        let writer = RowLedgerWriter::open(&api, "sheet-1", "UK").await.unwrap();
        assert_eq!(writer.next_sequence_number().await.unwrap(), 2);

        let row1 = writer.duplicate_last_row().await.unwrap();
        let mut cells = BTreeMap::new();
        cells.insert(0, "2".to_string());
        writer.write_cells(row1, &cells).await.unwrap();
        assert_eq!(writer.next_sequence_number().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn sequence_starts_at_one_on_empty_column() {
        let api = FakeSheets::with_tab("sheet-1", "UK", FakeTab::with_rows(7, vec![]));
        let writer = RowLedgerWriter::open(&api, "sheet-1", "UK").await.unwrap();
        assert_eq!(writer.next_sequence_number().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn read_row_padded_fills_to_width() {
        let api = seeded();
        let writer = RowLedgerWriter::open(&api, "sheet-1", "UK").await.unwrap();
        let row = writer.read_row_padded(2, 40).await.unwrap();
        assert_eq!(row.len(), 40);
        assert_eq!(row[0], "1");
        assert_eq!(row[39], "");
    }

    #[tokio::test]
    async fn highlight_marks_only_given_columns() {
        let api = seeded();
        let writer = RowLedgerWriter::open(&api, "sheet-1", "UK").await.unwrap();
        let row1 = writer.duplicate_last_row().await.unwrap();
        writer.highlight(row1, &[0, 1, 4]).await.unwrap();
        assert!(api.cell("sheet-1", "UK", row1 as usize, 0).highlighted);
        assert!(api.cell("sheet-1", "UK", row1 as usize, 4).highlighted);
        assert!(!api.cell("sheet-1", "UK", row1 as usize, 5).highlighted);
    }
}
