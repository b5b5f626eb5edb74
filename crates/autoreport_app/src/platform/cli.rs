use std::path::PathBuf;

use clap::Parser;

use super::config::CONFIG_FILENAME;
use super::logging::LogDestination;

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "autoreport",
    version,
    about = "Upload a study archive, run the analysis and save the report"
)]
pub struct CliArgs {
    /// Zipped DICOM study to upload.
    pub study: PathBuf,

    /// Config file; must exist when given. Defaults to ./autoreport.ron if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for the report and downloaded artifacts.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Save the report only, skip artifact downloads.
    #[arg(long, default_value_t = false)]
    pub no_download: bool,

    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,

    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CliArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME))
    }
}
