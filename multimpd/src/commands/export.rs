use crate::{export, history::History};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use log::{info, warn};
use std::path::PathBuf;

/// Move finished .mp4, .mkv, .key and .log files into a dated folder and zip it.
#[derive(Args, Clone, Debug)]
pub struct ExportCommand {
    /// Directory holding the files to export.
    #[arg(short, long, default_value = ".")]
    pub directory: PathBuf,

    /// Name of the created folder and archive [default: output_<date>_<time>].
    #[arg(long)]
    pub name: Option<String>,
}

impl ExportCommand {
    pub fn execute(self, history: &History) -> Result<()> {
        let name = self.name.unwrap_or_else(export::folder_name);

        match export::export(&self.directory, &name, &[history.path().to_owned()])? {
            Some(exported) => {
                for file in &exported.files {
                    info!("{} {}", "Moved".green(), file.display());
                }

                info!("Output exported to {}", exported.archive.display());
            }
            None => warn!("No files found to export in {}", self.directory.display()),
        }

        Ok(())
    }
}
