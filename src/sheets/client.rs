//! REST client for the spreadsheet backend.
//!
//! Thin request/response mapping onto the v4 surface: metadata reads,
//! ranged value reads, user-entered value writes, and structural batch
//! updates (insert row / copy row / repeat-cell format). Per-call
//! timeouts are delegated to the underlying HTTP client.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::auth::TokenProvider;
use super::{column_letter, SheetsApi, TabMeta};
use crate::error::{Result, ScribeError};
use crate::ledger::columns::ROW_WIDTH;

const DEFAULT_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// REST-backed `SheetsApi` implementation.
pub struct SheetsClient {
    http: reqwest::Client,
    base: String,
    auth: Option<Arc<TokenProvider>>,
}

impl SheetsClient {
    pub fn new(auth: Arc<TokenProvider>) -> Self {
        SheetsClient {
            http: reqwest::Client::new(),
            base: DEFAULT_BASE.to_string(),
            auth: Some(auth),
        }
    }

    /// Unauthenticated client against an alternate base URL (tests).
    pub fn with_base_url(base: &str) -> Self {
        SheetsClient {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
            auth: None,
        }
    }

    async fn bearer(&self) -> Result<Option<String>> {
        match &self.auth {
            Some(provider) => Ok(Some(provider.token().await?)),
            None => Ok(None),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let mut req = self.http.get(url).timeout(CALL_TIMEOUT);
        if let Some(token) = self.bearer().await? {
            req = req.bearer_auth(token);
        }
        let response = req
            .send()
            .await
            .map_err(|e| ScribeError::RemoteWrite(format!("GET {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(ScribeError::RemoteWrite(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ScribeError::RemoteWrite(format!("GET {url}: malformed body: {e}")))
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<()> {
        let mut req = self.http.post(url).timeout(CALL_TIMEOUT).json(body);
        if let Some(token) = self.bearer().await? {
            req = req.bearer_auth(token);
        }
        let response = req
            .send()
            .await
            .map_err(|e| ScribeError::RemoteWrite(format!("POST {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(ScribeError::RemoteWrite(format!(
                "POST {url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn values_url(&self, spreadsheet: &str, range: &str) -> String {
        format!("{}/{}/values/{}", self.base, spreadsheet, range)
    }

    async fn read_values(&self, spreadsheet: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(spreadsheet, range);
        let body = self.get_json(&url).await?;
        let rows = body
            .get("values")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|row| {
                row.as_array()
                    .map(|cells| {
                        cells
                            .iter()
                            .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect())
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn tab_meta(&self, spreadsheet: &str, tab: &str) -> Result<TabMeta> {
        let url = format!("{}/{}?fields=sheets.properties", self.base, spreadsheet);
        let body = self.get_json(&url).await?;
        let sheets = body
            .get("sheets")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        for sheet in sheets {
            let props = sheet.get("properties").cloned().unwrap_or(Value::Null);
            if props.get("title").and_then(|t| t.as_str()) == Some(tab) {
                let sheet_id = props
                    .get("sheetId")
                    .and_then(|v| v.as_i64())
                    .unwrap_or_default();
                let column_count = props
                    .get("gridProperties")
                    .and_then(|g| g.get("columnCount"))
                    .and_then(|v| v.as_u64())
                    .unwrap_or(ROW_WIDTH as u64) as u32;
                return Ok(TabMeta {
                    sheet_id,
                    // a tab narrower than the logical row still gets the
                    // full-width copy range
                    column_count: column_count.max(ROW_WIDTH as u32),
                });
            }
        }
        Err(ScribeError::TabNotFound {
            spreadsheet: spreadsheet.to_string(),
            tab: tab.to_string(),
        })
    }

    async fn column_a(&self, spreadsheet: &str, tab: &str) -> Result<Vec<String>> {
        let rows = self
            .read_values(spreadsheet, &format!("{tab}!A1:A"))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    async fn read_row(&self, spreadsheet: &str, tab: &str, row1: u32) -> Result<Vec<String>> {
        let last = column_letter(ROW_WIDTH - 1);
        let rows = self
            .read_values(spreadsheet, &format!("{tab}!A{row1}:{last}{row1}"))
            .await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn insert_blank_row(&self, spreadsheet: &str, sheet_id: i64, row0: u32) -> Result<()> {
        let url = format!("{}/{}:batchUpdate", self.base, spreadsheet);
        let body = json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row0,
                        "endIndex": row0 + 1,
                    },
                    "inheritFromBefore": false,
                }
            }]
        });
        self.post_json(&url, &body).await
    }

    async fn copy_row_full(
        &self,
        spreadsheet: &str,
        sheet_id: i64,
        src_row0: u32,
        dst_row0: u32,
        column_count: u32,
    ) -> Result<()> {
        let url = format!("{}/{}:batchUpdate", self.base, spreadsheet);
        let body = json!({
            "requests": [{
                "copyPaste": {
                    "source": {
                        "sheetId": sheet_id,
                        "startRowIndex": src_row0,
                        "endRowIndex": src_row0 + 1,
                        "startColumnIndex": 0,
                        "endColumnIndex": column_count,
                    },
                    "destination": {
                        "sheetId": sheet_id,
                        "startRowIndex": dst_row0,
                        "endRowIndex": dst_row0 + 1,
                        "startColumnIndex": 0,
                        "endColumnIndex": column_count,
                    },
                    "pasteType": "PASTE_NORMAL",
                    "pasteOrientation": "NORMAL",
                }
            }]
        });
        self.post_json(&url, &body).await
    }

    async fn write_cells(
        &self,
        spreadsheet: &str,
        tab: &str,
        row1: u32,
        cells: &BTreeMap<usize, String>,
    ) -> Result<()> {
        let data: Vec<Value> = cells
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(col, value)| {
                let letter = column_letter(*col);
                json!({
                    "range": format!("{tab}!{letter}{row1}:{letter}{row1}"),
                    "values": [[value]],
                })
            })
            .collect();
        if data.is_empty() {
            return Ok(());
        }
        let url = format!("{}/{}/values:batchUpdate", self.base, spreadsheet);
        let body = json!({
            "valueInputOption": "USER_ENTERED",
            "data": data,
        });
        self.post_json(&url, &body).await
    }

    async fn format_cells_inverted(
        &self,
        spreadsheet: &str,
        sheet_id: i64,
        row0: u32,
        cols: &[usize],
    ) -> Result<()> {
        if cols.is_empty() {
            return Ok(());
        }
        let requests: Vec<Value> = cols
            .iter()
            .map(|c| {
                json!({
                    "repeatCell": {
                        "range": {
                            "sheetId": sheet_id,
                            "startRowIndex": row0,
                            "endRowIndex": row0 + 1,
                            "startColumnIndex": c,
                            "endColumnIndex": c + 1,
                        },
                        "cell": {
                            "userEnteredFormat": {
                                "backgroundColor": {"red": 0, "green": 0, "blue": 0},
                                "textFormat": {
                                    "foregroundColor": {"red": 1, "green": 1, "blue": 1}
                                }
                            }
                        },
                        "fields": "userEnteredFormat(backgroundColor,textFormat.foregroundColor)"
                    }
                })
            })
            .collect();
        let url = format!("{}/{}:batchUpdate", self.base, spreadsheet);
        self.post_json(&url, &json!({ "requests": requests })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn tab_meta_resolves_and_clamps_width() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sheet-1"))
            .and(query_param("fields", "sheets.properties"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sheets": [
                    {"properties": {"sheetId": 7, "title": "UK",
                        "gridProperties": {"columnCount": 26}}},
                    {"properties": {"sheetId": 9, "title": "US",
                        "gridProperties": {"columnCount": 40}}}
                ]
            })))
            .mount(&server)
            .await;

        let client = SheetsClient::with_base_url(&server.uri());
        let meta = client.tab_meta("sheet-1", "UK").await.unwrap();
        assert_eq!(meta.sheet_id, 7);
        assert_eq!(meta.column_count, ROW_WIDTH as u32);
        let meta = client.tab_meta("sheet-1", "US").await.unwrap();
        assert_eq!(meta.column_count, 40);
        let err = client.tab_meta("sheet-1", "UAE").await.unwrap_err();
        assert!(matches!(err, ScribeError::TabNotFound { .. }));
    }

    #[tokio::test]
    async fn column_a_reads_displayed_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sheet-1/values/UK!A1:A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "values": [["No."], ["1"], ["2"]]
            })))
            .mount(&server)
            .await;

        let client = SheetsClient::with_base_url(&server.uri());
        let col = client.column_a("sheet-1", "UK").await.unwrap();
        assert_eq!(col, vec!["No.", "1", "2"]);
    }

    #[tokio::test]
    async fn write_cells_batches_non_empty_values_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sheet-1/values:batchUpdate"))
            .and(body_partial_json(serde_json::json!({
                "valueInputOption": "USER_ENTERED",
                "data": [
                    {"range": "UK!A5:A5", "values": [["3"]]},
                    {"range": "UK!C5:C5", "values": [["=HYPERLINK(\"u\",\"t\")"]]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SheetsClient::with_base_url(&server.uri());
        let mut cells = BTreeMap::new();
        cells.insert(0, "3".to_string());
        cells.insert(1, String::new()); // skipped, preserves formulas
        cells.insert(2, "=HYPERLINK(\"u\",\"t\")".to_string());
        client.write_cells("sheet-1", "UK", 5, &cells).await.unwrap();
    }

    #[tokio::test]
    async fn empty_write_is_a_no_op() {
        // no mock mounted: any request would fail the test
        let server = MockServer::start().await;
        let client = SheetsClient::with_base_url(&server.uri());
        client
            .write_cells("sheet-1", "UK", 5, &BTreeMap::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn insert_and_copy_request_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sheet-1:batchUpdate"))
            .and(body_partial_json(serde_json::json!({
                "requests": [{"insertDimension": {
                    "range": {"sheetId": 7, "dimension": "ROWS",
                              "startIndex": 4, "endIndex": 5},
                    "inheritFromBefore": false
                }}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SheetsClient::with_base_url(&server.uri());
        client.insert_blank_row("sheet-1", 7, 4).await.unwrap();
    }

    #[tokio::test]
    async fn backend_failure_propagates_as_remote_write() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sheet-1:batchUpdate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = SheetsClient::with_base_url(&server.uri());
        let err = client.insert_blank_row("sheet-1", 7, 4).await.unwrap_err();
        assert!(matches!(err, ScribeError::RemoteWrite(_)));
    }
}
