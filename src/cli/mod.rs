mod auth;
mod show;
mod values;

use crate::config::Config;
use clap::{Parser, Subcommand};
use ohsheet::Result;
use ohsheet::sheets::{Connector, Session};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub use auth::AuthArgs;
pub use show::ShowResource;
pub use values::{FindArgs, ReadArgs, RowArgs};

#[derive(Parser, Debug)]
#[command(name = "ohsheet")]
#[command(about = "Read and write Google Sheets ranges from the command line", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of the XDG default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        match &self.command {
            Commands::Read(args) => args.execute(&self.connect(cancel).await?).await,
            Commands::Write(args) => args.write(&self.connect(cancel).await?).await,
            Commands::Append(args) => args.append(&self.connect(cancel).await?).await,
            Commands::Find(args) => args.execute(&self.connect(cancel).await?).await,
            Commands::Auth(args) => args.execute(&self.load_config()?, cancel).await,
            Commands::Show { resource } => resource.execute(),
        }
    }

    fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    async fn connect(&self, cancel: CancellationToken) -> Result<Context> {
        let config = self.load_config()?;
        let session = Connector::new(config.access_config()?)
            .cancellation_token(cancel)
            .connect()
            .await?;

        Ok(Context { config, session })
    }
}

/// Loaded config plus an open session, shared by the range commands.
pub struct Context {
    pub config: Config,
    pub session: Session,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the values in a range
    Read(ReadArgs),
    /// Overwrite a range with one row of values
    Write(RowArgs),
    /// Append one row of values after the table in a range
    Append(RowArgs),
    /// Find a spreadsheet ID by its title
    Find(FindArgs),
    /// Authorize access and cache the token
    Auth(AuthArgs),
    Show {
        #[command(subcommand)]
        resource: ShowResource,
    },
}
