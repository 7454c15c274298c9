//! Google Sheets worksheet writer.
//!
//! Talks to the Sheets v4 REST API with a ready OAuth bearer token taken
//! from `GOOGLE_SHEETS_TOKEN`. Obtaining that token (service-account flows,
//! refresh, scopes) is someone else's job. The sink creates the target
//! worksheet when it doesn't exist, clears its data columns, writes header
//! plus records, and applies a `#,##0` number format to the price column.

use serde_json::{json, Value};
use tracing::info;

use super::SinkError;
use crate::engine::Record;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Rows per values-update request. Large lists go up in chunks.
const BATCH_ROWS: usize = 4000;

const HEADER: [&str; 4] = ["codigo", "descripcion", "presentacion", "precio_final"];

#[derive(Debug)]
pub struct SheetsWriter {
    client: reqwest::Client,
    token: String,
    spreadsheet_id: String,
    sheet_name: String,
}

impl SheetsWriter {
    /// Build a writer with the bearer token from `GOOGLE_SHEETS_TOKEN`.
    pub fn from_env(spreadsheet_id: &str, sheet_name: &str) -> Result<Self, SinkError> {
        let token = std::env::var("GOOGLE_SHEETS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(SinkError::MissingToken)?;
        Ok(Self {
            client: reqwest::Client::new(),
            token,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
        })
    }

    /// Clear the worksheet's data columns and write header plus all records.
    ///
    /// Creates the worksheet if the spreadsheet doesn't have one with the
    /// configured name, and formats the price column as a plain integer.
    pub async fn replace_all(&self, records: &[Record]) -> Result<(), SinkError> {
        info!(
            rows = records.len(),
            sheet = %self.sheet_name,
            "writing records to spreadsheet"
        );

        let sheet_id = match self.find_sheet_id().await? {
            Some(id) => id,
            None => {
                info!(sheet = %self.sheet_name, "worksheet not found, creating it");
                self.add_sheet().await?
            }
        };

        self.clear().await?;

        let header: Vec<Vec<Value>> =
            vec![HEADER.iter().map(|h| json!(h)).collect()];
        self.update_range(&format!("{}!A1:D1", self.sheet_name), header)
            .await?;

        for (chunk_idx, chunk) in records.chunks(BATCH_ROWS).enumerate() {
            let first_row = 2 + chunk_idx * BATCH_ROWS;
            let last_row = first_row + chunk.len() - 1;
            let values: Vec<Vec<Value>> = chunk.iter().map(row_values).collect();
            self.update_range(
                &format!("{}!A{first_row}:D{last_row}", self.sheet_name),
                values,
            )
            .await?;
        }

        if !records.is_empty() {
            self.batch_update(price_format_request(sheet_id, records.len()))
                .await?;
        }

        info!("spreadsheet update complete");
        Ok(())
    }

    /// Look up the numeric sheet id of the configured worksheet, or `None`
    /// when the spreadsheet has no worksheet with that name.
    async fn find_sheet_id(&self) -> Result<Option<i64>, SinkError> {
        let url = format!(
            "{API_BASE}/{}?fields=sheets.properties",
            self.spreadsheet_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let meta = Self::check_json(response).await?;
        Ok(sheet_id_by_title(&meta, &self.sheet_name))
    }

    /// Create the configured worksheet and return its numeric sheet id.
    async fn add_sheet(&self) -> Result<i64, SinkError> {
        let reply = self.batch_update(add_sheet_request(&self.sheet_name)).await?;
        reply
            .pointer("/replies/0/addSheet/properties/sheetId")
            .and_then(Value::as_i64)
            .ok_or_else(|| SinkError::Api {
                status: 200,
                body: "addSheet reply carried no sheetId".to_string(),
            })
    }

    async fn batch_update(&self, body: Value) -> Result<Value, SinkError> {
        let url = format!("{API_BASE}/{}:batchUpdate", self.spreadsheet_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::check_json(response).await
    }

    async fn clear(&self) -> Result<(), SinkError> {
        let url = format!(
            "{API_BASE}/{}/values/{}!A:D:clear",
            self.spreadsheet_id, self.sheet_name
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({}))
            .send()
            .await?;
        Self::check(response).await
    }

    async fn update_range(&self, range: &str, values: Vec<Vec<Value>>) -> Result<(), SinkError> {
        let url = format!(
            "{API_BASE}/{}/values/{range}?valueInputOption=RAW",
            self.spreadsheet_id
        );
        let body = json!({ "range": range, "values": values });
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn check(response: reqwest::Response) -> Result<(), SinkError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn check_json(response: reqwest::Response) -> Result<Value, SinkError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SinkError::Api {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| SinkError::Api {
            status: status.as_u16(),
            body: format!("unparsable response body: {e}"),
        })
    }
}

/// Find the numeric sheet id for a worksheet title in spreadsheet metadata.
fn sheet_id_by_title(meta: &Value, title: &str) -> Option<i64> {
    meta.get("sheets")?
        .as_array()?
        .iter()
        .filter_map(|s| s.get("properties"))
        .find(|p| p.get("title").and_then(Value::as_str) == Some(title))
        .and_then(|p| p.get("sheetId"))
        .and_then(Value::as_i64)
}

fn add_sheet_request(title: &str) -> Value {
    json!({
        "requests": [{ "addSheet": { "properties": { "title": title } } }]
    })
}

/// Format the price column (D2 down to the last data row) as `#,##0`.
fn price_format_request(sheet_id: i64, rows: usize) -> Value {
    json!({
        "requests": [{
            "repeatCell": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": 1,
                    "endRowIndex": rows + 1,
                    "startColumnIndex": 3,
                    "endColumnIndex": 4
                },
                "cell": {
                    "userEnteredFormat": {
                        "numberFormat": { "type": "NUMBER", "pattern": "#,##0" }
                    }
                },
                "fields": "userEnteredFormat.numberFormat"
            }
        }]
    })
}

fn row_values(record: &Record) -> Vec<Value> {
    vec![
        json!(record.code),
        json!(record.description),
        json!(record.unit),
        json!(record.price),
    ]
}
