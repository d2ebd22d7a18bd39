use super::Context;
use clap::Args;
use ohsheet::Result;
use ohsheet::sheets::{CellValue, RangeOperations, UpdateSummary};
use tracing::info;

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Range in A1 notation, e.g. "Sheet1!A1:C10"
    pub range: String,

    /// Spreadsheet ID, defaults to spreadsheet_id from the config file
    #[arg(short, long)]
    pub spreadsheet: Option<String>,
}

impl ReadArgs {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let spreadsheet_id = ctx.config.spreadsheet_id(self.spreadsheet.as_deref())?;
        let values = ctx.session.read(&spreadsheet_id, &self.range).await?;

        for row in &values.values {
            println!("{}", format_row(row));
        }
        info!(range = %values.range, rows = values.values.len(), "Read range");

        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct RowArgs {
    /// Range in A1 notation, e.g. "Sheet1!A1:C1"
    pub range: String,

    /// Cell values, stored as-is without formula or number parsing
    pub values: Vec<String>,

    /// Spreadsheet ID, defaults to spreadsheet_id from the config file
    #[arg(short, long)]
    pub spreadsheet: Option<String>,
}

impl RowArgs {
    fn row(&self) -> Vec<CellValue> {
        self.values.iter().map(|v| CellValue::from(v.as_str())).collect()
    }

    pub async fn write(&self, ctx: &Context) -> Result<()> {
        let spreadsheet_id = ctx.config.spreadsheet_id(self.spreadsheet.as_deref())?;
        let summary = ctx
            .session
            .write_row(&spreadsheet_id, &self.range, self.row())
            .await?;
        report("Wrote row", &summary);

        Ok(())
    }

    pub async fn append(&self, ctx: &Context) -> Result<()> {
        let spreadsheet_id = ctx.config.spreadsheet_id(self.spreadsheet.as_deref())?;
        let summary = ctx
            .session
            .append_row(&spreadsheet_id, &self.range, self.row())
            .await?;
        report("Appended row", &summary);

        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct FindArgs {
    /// Exact spreadsheet title
    pub title: String,
}

impl FindArgs {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        match ctx.session.find_spreadsheet(&self.title).await? {
            Some(id) => println!("{}", id),
            None => info!(title = %self.title, "No spreadsheet found"),
        }

        Ok(())
    }
}

fn report(message: &str, summary: &UpdateSummary) {
    info!(
        range = summary.updated_range.as_deref().unwrap_or("-"),
        cells = summary.updated_cells,
        "{}",
        message
    );
}

fn format_row(row: &[CellValue]) -> String {
    row.iter()
        .map(|cell| match cell {
            CellValue::String(s) => s.clone(),
            CellValue::Null => String::new(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\t")
}
