use super::{CdmOptions, ClientOptions};
use crate::{error::Error, license::KeySource, manifest, protection::ProtectionHeader, utils};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use log::info;
use reqwest::Url;

/// Request content keys from a license server.
#[derive(Args, Clone, Debug)]
pub struct License {
    /// PSSH data input.
    /// Can be a base64 encoded PSSH box, raw widevine init data or a manifest url.
    #[arg(required = true, value_name = "PSSH|MPD_URL")]
    pub input: String,

    /// Widevine license server url.
    #[arg(long, required = true, value_name = "URL", value_parser = utils::http_url_parser)]
    pub license: Url,

    #[command(flatten)]
    pub client: ClientOptions,

    #[command(flatten)]
    pub cdm: CdmOptions,
}

impl License {
    pub fn execute(self) -> Result<()> {
        let client = self.client.client()?;
        let headers = self.client.headers();

        let header = if let Ok(url) = utils::http_url_parser(&self.input) {
            let text = manifest::fetch(&client, &url, &headers)?;
            manifest::scan_str(&text)?.ok_or(Error::MissingPssh)?
        } else {
            ProtectionHeader::from_base64(self.input.trim())?
        };

        info!("[{}] {}", "PSSH".green(), header.to_base64());

        for kid in header.key_ids() {
            info!("[{}] {}", "KID".green(), kid.uuid());
        }

        let keys = self
            .cdm
            .key_source(&client)
            .acquire_keys(&header, &self.license, &headers)?;

        for key in keys {
            info!("[{}] {}", "CONTENT".green(), key);
        }

        Ok(())
    }
}
