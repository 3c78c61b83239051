use super::{CdmOptions, ToolOptions};
use crate::cdm::{CdmBackend, LocalBackend};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use log::{error, info, warn};

/// Verify that external tools and CDM device files are available.
#[derive(Args, Clone, Debug)]
pub struct Check {
    #[command(flatten)]
    pub tools: ToolOptions,

    #[command(flatten)]
    pub cdm: CdmOptions,
}

impl Check {
    pub fn execute(self) -> Result<()> {
        let mut missing = 0;

        for (name, path, required) in [
            ("mp4decrypt", self.tools.mp4decrypt(), true),
            ("ffmpeg", self.tools.ffmpeg(), true),
            ("yt-dlp", self.tools.yt_dlp(), false),
        ] {
            match path {
                Some(path) => info!("{} {} ({})", "found".green(), name, path.display()),
                None if required => {
                    error!("{} couldn't be located, install it or pass --{} flag.", name, name);
                    missing += 1;
                }
                None => warn!("{} couldn't be located, only local files can be decrypted.", name),
            }
        }

        let profiles = self.cdm.profiles().profiles();

        if profiles.is_empty() {
            error!("No .wvd files found in {} directory.", self.cdm.cdm_dir.display());
            missing += 1;
        }

        for profile in &profiles {
            if self.cdm.cdm_url.is_some() {
                info!("{} cdm profile {}", "found".green(), profile.path.display());
                continue;
            }

            match LocalBackend.load(profile) {
                Ok(_) => info!("{} cdm profile {}", "loaded".green(), profile.path.display()),
                Err(e) => warn!("Unable to load {}: {}", profile.path.display(), e),
            }
        }

        if missing > 0 {
            bail!("{} requirement(s) missing.", missing);
        }

        info!("All requirements satisfied.");
        Ok(())
    }
}
