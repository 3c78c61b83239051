use crate::history::History;
use anyhow::Result;
use clap::Args;
use log::info;

/// List or clear previously used manifest urls.
#[derive(Args, Clone, Debug)]
pub struct HistoryCommand {
    /// Remove every entry from the history file.
    #[arg(long)]
    pub clear: bool,
}

impl HistoryCommand {
    pub fn execute(self, history: &History) -> Result<()> {
        if self.clear {
            history.clear()?;
            info!("Cleared {}", history.path().display());
            return Ok(());
        }

        let entries = history.load()?;

        if entries.is_empty() {
            info!("No entries in {}", history.path().display());
        }

        for (i, entry) in entries.iter().enumerate() {
            info!("{:>3}) {}", i + 1, entry);
        }

        Ok(())
    }
}
