use super::ClientOptions;
use crate::{manifest, utils};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use log::{info, warn};
use reqwest::Url;

/// Check that a manifest is reachable and show the widevine PSSH it carries.
#[derive(Args, Clone, Debug)]
pub struct Probe {
    /// http(s) url of the DASH manifest.
    #[arg(value_name = "MPD_URL", value_parser = utils::http_url_parser)]
    pub mpd_url: Url,

    #[command(flatten)]
    pub client: ClientOptions,
}

impl Probe {
    pub fn execute(self) -> Result<()> {
        let client = self.client.client()?;
        let text = manifest::fetch(&client, &self.mpd_url, &self.client.headers())?;
        info!("{} {}", "Reachable".green(), self.mpd_url);

        match manifest::scan_str(&text)? {
            Some(header) => {
                info!("[{}] {}", "PSSH".green(), header.to_base64());

                for kid in header.key_ids() {
                    info!("[{}] {}", "KID".green(), kid.uuid());
                }
            }
            None => warn!("No widevine PSSH found in video adaptation sets."),
        }

        Ok(())
    }
}
