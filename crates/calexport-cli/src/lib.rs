//! Config loading, error taxonomy and the export driver behind the
//! `calexport` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod secret;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use export::{ExportOutcome, Exporter};
