//! In-memory stand-in for the Sheets values API, served through wiremock.

use crate::auth::{MockReceiver, Token, mock_token, write_client_secret};
use crate::sheets::{AccessConfig, Connector, SPREADSHEETS_SCOPE, Session};
use percent_encoding::percent_decode_str;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub(crate) const SPREADSHEET_ID: &str = "stub-spreadsheet";
const DEFAULT_SHEET: &str = "Sheet1";

/// A1 range resolved to zero-based, inclusive bounds.
#[derive(Debug)]
struct GridRange {
    sheet: String,
    start_row: usize,
    start_col: usize,
    end_row: Option<usize>,
    end_col: Option<usize>,
}

fn parse_cell(cell: &str) -> (Option<usize>, Option<usize>) {
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits = &cell[letters.len()..];

    let col = (!letters.is_empty()).then(|| {
        letters
            .to_ascii_uppercase()
            .bytes()
            .fold(0, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
            - 1
    });
    let row = digits.parse::<usize>().ok().map(|r| r - 1);

    (row, col)
}

fn is_cell_ref(cells: &str) -> bool {
    cells.split(':').all(|cell| {
        let letters = cell.chars().take_while(|c| c.is_ascii_alphabetic()).count();
        let digits = &cell[letters..];
        (letters > 0 || !digits.is_empty())
            && letters <= 3
            && digits.chars().all(|c| c.is_ascii_digit())
    })
}

fn parse_range(range: &str) -> GridRange {
    let (sheet, cells) = match range.rsplit_once('!') {
        Some((sheet, cells)) => (sheet.trim_matches('\'').to_string(), cells),
        None if is_cell_ref(range) => (DEFAULT_SHEET.to_string(), range),
        None => (range.to_string(), ""),
    };

    let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
    let (start_row, start_col) = parse_cell(start);
    let (end_row, end_col) = parse_cell(end);

    GridRange {
        sheet,
        start_row: start_row.unwrap_or(0),
        start_col: start_col.unwrap_or(0),
        end_row: if cells.is_empty() { None } else { end_row },
        end_col: if cells.is_empty() { None } else { end_col },
    }
}

fn is_empty(cell: &Value) -> bool {
    matches!(cell, Value::Null) || cell.as_str() == Some("")
}

#[derive(Clone, Default)]
pub(crate) struct SheetStub {
    sheets: Arc<Mutex<HashMap<String, Vec<Vec<Value>>>>>,
}

impl SheetStub {
    fn read(&self, range: &str) -> Value {
        let target = parse_range(range);
        let sheets = self.sheets.lock().unwrap();
        let grid = sheets.get(&target.sheet).cloned().unwrap_or_default();

        let last_row = target
            .end_row
            .unwrap_or(usize::MAX)
            .min(grid.len().saturating_sub(1));
        let mut values: Vec<Vec<Value>> = Vec::new();
        if !grid.is_empty() {
            for row in grid.iter().take(last_row + 1).skip(target.start_row) {
                let last_col = target
                    .end_col
                    .unwrap_or(usize::MAX)
                    .min(row.len().saturating_sub(1));
                let mut cells: Vec<Value> = row
                    .iter()
                    .take(last_col + 1)
                    .skip(target.start_col)
                    .cloned()
                    .collect();
                while cells.last().is_some_and(is_empty) {
                    cells.pop();
                }
                values.push(cells);
            }
        }
        while values.last().is_some_and(|row| row.is_empty()) {
            values.pop();
        }

        let mut body = json!({ "range": range, "majorDimension": "ROWS" });
        if !values.is_empty() {
            body["values"] = json!(values);
        }
        body
    }

    fn put(&self, sheet: &str, row_index: usize, col_index: usize, rows: &[Vec<Value>]) -> usize {
        let mut sheets = self.sheets.lock().unwrap();
        let grid = sheets.entry(sheet.to_string()).or_default();
        let mut cells = 0;

        for (i, row) in rows.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            let r = row_index + i;
            if grid.len() <= r {
                grid.resize(r + 1, Vec::new());
            }
            for (j, value) in row.iter().enumerate() {
                let c = col_index + j;
                if grid[r].len() <= c {
                    grid[r].resize(c + 1, Value::Null);
                }
                grid[r][c] = value.clone();
                cells += 1;
            }
        }

        cells
    }

    fn first_empty_row(&self, target: &GridRange) -> usize {
        let sheets = self.sheets.lock().unwrap();
        let grid = sheets.get(&target.sheet).cloned().unwrap_or_default();

        (target.start_row..)
            .find(|&r| {
                grid.get(r)
                    .is_none_or(|row| row.iter().skip(target.start_col).all(is_empty))
            })
            .unwrap_or(target.start_row)
    }

    fn update_body(range: &str, rows: &[Vec<Value>], cells: usize) -> Value {
        let non_empty: Vec<&Vec<Value>> = rows.iter().filter(|r| !r.is_empty()).collect();
        let mut body = json!({ "spreadsheetId": SPREADSHEET_ID });
        if cells > 0 {
            body["updatedRange"] = json!(range);
            body["updatedRows"] = json!(non_empty.len());
            body["updatedColumns"] = json!(non_empty.iter().map(|r| r.len()).max().unwrap_or(0));
            body["updatedCells"] = json!(cells);
        }
        body
    }

    fn rows_from(request: &Request) -> Vec<Vec<Value>> {
        serde_json::from_slice::<Value>(&request.body)
            .ok()
            .and_then(|body| body.get("values").cloned())
            .and_then(|values| serde_json::from_value(values).ok())
            .unwrap_or_default()
    }
}

impl Respond for SheetStub {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path();
        let Some((_, encoded_range)) = path.split_once("/values/") else {
            return ResponseTemplate::new(404);
        };
        let range = percent_decode_str(encoded_range)
            .decode_utf8_lossy()
            .into_owned();

        let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
        if request.method.as_str() != "GET"
            && query.get("valueInputOption").map(String::as_str) != Some("RAW")
        {
            return ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "valueInputOption must be RAW",
                    "status": "INVALID_ARGUMENT"
                }
            }));
        }

        let body = match (request.method.as_str(), range.strip_suffix(":append")) {
            ("GET", None) => self.read(&range),
            ("PUT", None) => {
                let target = parse_range(&range);
                let rows = Self::rows_from(request);
                let cells = self.put(&target.sheet, target.start_row, target.start_col, &rows);
                Self::update_body(&range, &rows, cells)
            }
            ("POST", Some(range)) => {
                let target = parse_range(range);
                let rows = Self::rows_from(request);
                let row_index = self.first_empty_row(&target);
                let cells = self.put(&target.sheet, row_index, target.start_col, &rows);
                json!({
                    "spreadsheetId": SPREADSHEET_ID,
                    "tableRange": range,
                    "updates": Self::update_body(
                        &format!("{}!A{}", target.sheet, row_index + 1),
                        &rows,
                        cells
                    ),
                })
            }
            _ => return ResponseTemplate::new(405),
        };

        ResponseTemplate::new(200).set_body_json(body)
    }
}

/// Mount the values stub on `server`, requiring the cached access token.
pub(crate) async fn mount_sheets(server: &MockServer) -> SheetStub {
    let stub = SheetStub::default();
    Mock::given(path_regex(r"^/v4/spreadsheets/[^/]+/values/.+$"))
        .and(header("authorization", "Bearer ya29.cached"))
        .respond_with(stub.clone())
        .mount(server)
        .await;
    stub
}

/// Connect a session to `server` using a cached token, so no authorization runs.
pub(crate) async fn connect(server: &MockServer, cancel: CancellationToken) -> (Session, TempDir) {
    connect_with_token(server, mock_token(None), cancel).await
}

/// Like [`connect`], caching `token` instead of a non-expiring one.
pub(crate) async fn connect_with_token(
    server: &MockServer,
    token: Token,
    cancel: CancellationToken,
) -> (Session, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let credentials = write_client_secret(dir.path(), &format!("{}/token", server.uri()));
    let token_path = dir.path().join("token.json");
    token.save(&token_path).unwrap();

    let session = Connector::new(AccessConfig::new(
        &token_path,
        &credentials,
        [SPREADSHEETS_SCOPE],
    ))
    .code_receiver(MockReceiver::new("unused"))
    .cancellation_token(cancel)
    .sheets_base_url(format!("{}/", server.uri()))
    .drive_base_url(format!("{}/drive/v3/", server.uri()))
    .connect()
    .await
    .unwrap();

    (session, dir)
}

mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let range = parse_range("Sheet2!B3:D10");
        assert_eq!(range.sheet, "Sheet2");
        assert_eq!((range.start_row, range.start_col), (2, 1));
        assert_eq!((range.end_row, range.end_col), (Some(9), Some(3)));

        let range = parse_range("'My Sheet'!AA1");
        assert_eq!(range.sheet, "My Sheet");
        assert_eq!(range.start_col, 26);

        let range = parse_range("Sheet1!A:C");
        assert_eq!((range.start_row, range.end_row, range.end_col), (0, None, Some(2)));

        let range = parse_range("Sheet1");
        assert_eq!(range.sheet, "Sheet1");
        assert_eq!((range.end_row, range.end_col), (None, None));

        assert_eq!(parse_range("B2").sheet, DEFAULT_SHEET);
    }
}
