use super::{AccessConfig, CellValue, Connector, RangeOperations, UpdateSummary, ValueRange};
use crate::auth::TokenSource;
use crate::cancel::cancellable;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use google_drive3::api::DriveHub;
use google_sheets4::api::{self, Sheets};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// Map a hub error. Token failures keep their `Auth` kind, everything else is `Api`.
fn api_error(context: String, error: google_sheets4::Error) -> AppError {
    match error {
        google_sheets4::Error::MissingToken(e) => match e.downcast::<AppError>() {
            Ok(inner) => match *inner {
                AppError::Auth(msg) => AppError::Auth(msg),
                other => AppError::Auth(format!("{}: {}", context, other)),
            },
            Err(e) => AppError::Auth(format!("{}: {}", context, e)),
        },
        other => AppError::Api(format!("{}: {}", context, other)),
    }
}

/// Authenticated handle to the Sheets and Drive APIs.
pub struct Session {
    hub: Sheets<HttpsConnector<HttpConnector>>,
    drive: DriveHub<HttpsConnector<HttpConnector>>,
    cancel: CancellationToken,
}

impl Session {
    /// Connect with the defaults: terminal prompt for first-time authorization,
    /// no timeout, no cancellation.
    pub async fn connect(access: &AccessConfig) -> Result<Self> {
        Connector::new(access.clone()).connect().await
    }

    pub(crate) fn new(auth: TokenSource, cancel: CancellationToken) -> Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

        Ok(Self {
            hub: Sheets::new(client.clone(), auth.clone()),
            drive: DriveHub::new(client, auth),
            cancel,
        })
    }

    pub(crate) fn set_sheets_base_url(&mut self, url: String) {
        self.hub.base_url(url);
    }

    pub(crate) fn set_drive_base_url(&mut self, url: String) {
        self.drive.base_url(url);
    }

    /// Token that cancels operations on this session.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Look up a spreadsheet the user can see by its exact title.
    ///
    /// The token must carry [`DRIVE_METADATA_SCOPE`](super::DRIVE_METADATA_SCOPE);
    /// without it Drive answers 403.
    #[instrument(name = "Finding spreadsheet", skip(self))]
    pub async fn find_spreadsheet(&self, title: &str) -> Result<Option<String>> {
        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            title.replace('\\', "\\\\").replace('\'', "\\'"),
            SPREADSHEET_MIME_TYPE
        );

        let request = self
            .drive
            .files()
            .list()
            .q(&query)
            .spaces("drive")
            .page_size(1)
            .doit();

        let (_, file_list) = cancellable(&self.cancel, async {
            request
                .await
                .map_err(|e| api_error("Failed to search spreadsheet".to_string(), e))
        })
        .await?;

        let spreadsheet_id = file_list
            .files
            .and_then(|files| files.into_iter().next())
            .and_then(|file| file.id);
        debug!(?spreadsheet_id, "Spreadsheet lookup finished");

        Ok(spreadsheet_id)
    }

    fn value_range(range: &str, rows: Vec<Vec<CellValue>>) -> api::ValueRange {
        api::ValueRange {
            major_dimension: Some("ROWS".to_string()),
            range: Some(range.to_string()),
            values: Some(rows),
        }
    }
}

#[async_trait]
impl RangeOperations for Session {
    #[instrument(name = "Reading range", skip(self))]
    async fn read(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange> {
        let request = self
            .hub
            .spreadsheets()
            .values_get(spreadsheet_id, range)
            .major_dimension("ROWS")
            .doit();

        let (_, response) = cancellable(&self.cancel, async {
            request
                .await
                .map_err(|e| api_error(format!("Failed to read range '{}'", range), e))
        })
        .await?;

        let values = ValueRange::from_api(response, range);
        debug!(rows = values.values.len(), "Read range");

        Ok(values)
    }

    #[instrument(name = "Writing range", skip(self, rows), fields(rows = rows.len()))]
    async fn write(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<UpdateSummary> {
        let request = self
            .hub
            .spreadsheets()
            .values_update(Self::value_range(range, rows), spreadsheet_id, range)
            .value_input_option("RAW")
            .doit();

        let (_, response) = cancellable(&self.cancel, async {
            request
                .await
                .map_err(|e| api_error(format!("Failed to write range '{}'", range), e))
        })
        .await?;

        let summary = UpdateSummary::from(response);
        debug!(
            updated_range = ?summary.updated_range,
            cells = summary.updated_cells,
            "Wrote range"
        );

        Ok(summary)
    }

    #[instrument(name = "Appending to range", skip(self, rows), fields(rows = rows.len()))]
    async fn append(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<UpdateSummary> {
        let request = self
            .hub
            .spreadsheets()
            .values_append(Self::value_range(range, rows), spreadsheet_id, range)
            .value_input_option("RAW")
            .insert_data_option("INSERT_ROWS")
            .doit();

        let (_, response) = cancellable(&self.cancel, async {
            request
                .await
                .map_err(|e| api_error(format!("Failed to append to range '{}'", range), e))
        })
        .await?;

        let summary = UpdateSummary::from(response);
        debug!(
            updated_range = ?summary.updated_range,
            cells = summary.updated_cells,
            "Appended rows"
        );

        Ok(summary)
    }
}
