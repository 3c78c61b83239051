mod check;
mod export;
mod history;
mod license;
mod probe;
mod run;

pub use check::Check;
pub use export::ExportCommand;
pub use history::HistoryCommand;
pub use license::License;
pub use probe::Probe;
pub use run::Run;

use crate::{
    cdm::{LocalBackend, ProfileStore, RemoteBackend},
    history::{DEFAULT_HISTORY_FILE, History},
    license::{KeySource, LicenseClient},
    utils,
};
use anyhow::Result;
use clap::{ColorChoice, Parser, Subcommand};
use log::LevelFilter;
use reqwest::{Url, blocking::Client, header::HeaderMap};
use std::{path::PathBuf, time::Duration};

/// Download, decrypt and mux widevine protected DASH streams.
#[derive(Debug, Clone, Parser)]
#[command(version, about, args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: Run,

    /// When to output colored text.
    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Maximum level of log messages [off, error, warn, info, debug, trace].
    #[arg(long, global = true, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// File where accepted manifest urls are recorded.
    #[arg(long, global = true, default_value = DEFAULT_HISTORY_FILE)]
    pub history_file: PathBuf,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Check(Check),
    Export(ExportCommand),
    History(HistoryCommand),
    License(License),
    Probe(Probe),
}

impl Args {
    pub fn execute(self) -> Result<()> {
        let history = History::new(&self.history_file);

        match self.command {
            Some(Commands::Check(args)) => args.execute(),
            Some(Commands::Export(args)) => args.execute(&history),
            Some(Commands::History(args)) => args.execute(&history),
            Some(Commands::License(args)) => args.execute(),
            Some(Commands::Probe(args)) => args.execute(),
            None => self.run.execute(&history),
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct ClientOptions {
    /// Headers for manifest, media and license requests as a json object.
    /// Example `--headers '{"Authorization": "Bearer abc"}'`.
    #[arg(long, help_heading = "Client Options", value_name = "JSON", value_parser = utils::parse_headers)]
    pub headers: Option<HeaderMap>,

    /// Timeout in seconds for every http request.
    /// By default requests never time out.
    #[arg(long, help_heading = "Client Options", value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl ClientOptions {
    pub fn headers(&self) -> HeaderMap {
        self.headers.clone().unwrap_or_default()
    }

    pub fn client(&self) -> Result<Client> {
        let mut client_builder = Client::builder();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(Duration::from_secs(timeout));
        }

        Ok(client_builder.build()?)
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct CdmOptions {
    /// Directory containing widevine device (.wvd) files.
    /// Any one of them is used for license requests.
    #[arg(long, help_heading = "CDM Options", default_value = "CDM")]
    pub cdm_dir: PathBuf,

    /// Address of a pywidevine serve compatible remote CDM.
    /// The device of the same name as the selected .wvd file is used there.
    /// By default the .wvd file is loaded locally.
    #[arg(long, help_heading = "CDM Options", env = "MULTIMPD_CDM_URL", value_name = "URL", value_parser = utils::http_url_parser)]
    pub cdm_url: Option<Url>,

    /// Secret key of the remote CDM.
    #[arg(long, help_heading = "CDM Options", env = "MULTIMPD_CDM_SECRET", hide_env_values = true)]
    pub cdm_secret: Option<String>,
}

impl CdmOptions {
    pub fn profiles(&self) -> ProfileStore {
        ProfileStore::new(&self.cdm_dir)
    }

    pub fn key_source(&self, client: &Client) -> Box<dyn KeySource> {
        match &self.cdm_url {
            Some(url) => Box::new(LicenseClient::new(
                self.profiles(),
                RemoteBackend::new(client.clone(), url.clone(), self.cdm_secret.clone()),
                client.clone(),
            )),
            None => Box::new(LicenseClient::new(
                self.profiles(),
                LocalBackend,
                client.clone(),
            )),
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct ToolOptions {
    /// Path of the mp4decrypt binary.
    #[arg(long, help_heading = "Tool Options", value_name = "PATH")]
    pub mp4decrypt: Option<PathBuf>,

    /// Path of the ffmpeg binary.
    #[arg(long, help_heading = "Tool Options", value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Path of the yt-dlp binary.
    #[arg(long, help_heading = "Tool Options", value_name = "PATH")]
    pub yt_dlp: Option<PathBuf>,
}

impl ToolOptions {
    pub fn mp4decrypt(&self) -> Option<PathBuf> {
        utils::find_binary("mp4decrypt", self.mp4decrypt.as_deref())
    }

    pub fn ffmpeg(&self) -> Option<PathBuf> {
        utils::find_binary("ffmpeg", self.ffmpeg.as_deref())
    }

    pub fn yt_dlp(&self) -> Option<PathBuf> {
        utils::find_binary("yt-dlp", self.yt_dlp.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_arguments() {
        let args = Args::try_parse_from([
            "multimpd",
            "https://example.com/a.mpd",
            "--license",
            "https://example.com/license",
            "--keys",
            "eb676abbcb345e96bbcf616630f1a3da:100b6c20940f779a4589152b57d2dacb",
            "1:63cb5f7184dd4b689a5c5ff11ee6a328",
            "--headers",
            r#"{"Referer": "https://example.com/"}"#,
        ])
        .unwrap();

        assert!(args.command.is_none());
        assert_eq!(args.run.keys.len(), 2);
        assert_eq!(args.run.client.headers().len(), 1);
        assert_eq!(args.history_file, PathBuf::from(DEFAULT_HISTORY_FILE));
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let result = Args::try_parse_from([
            "multimpd",
            "https://example.com/a.mpd",
            "--headers",
            "Referer: https://example.com/",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_key_rejected() {
        let result = Args::try_parse_from(["multimpd", "--keys", "abcd:1234", "--audio", "a.m4a"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_subcommand() {
        let args = Args::try_parse_from(["multimpd", "history", "--clear"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::History(HistoryCommand { clear: true }))
        ));
    }

    #[test]
    fn test_cdm_options() {
        let args = Args::try_parse_from(["multimpd", "https://example.com/a.mpd"]).unwrap();
        assert_eq!(args.run.cdm.cdm_dir, PathBuf::from("CDM"));

        let args = Args::try_parse_from([
            "multimpd",
            "license",
            "AAAA",
            "--license",
            "https://example.com/license",
            "--cdm-url",
            "http://127.0.0.1:8786/",
            "--cdm-secret",
            "secret",
        ])
        .unwrap();
        let Some(Commands::License(license)) = args.command else {
            panic!("expected license command");
        };
        assert_eq!(
            license.cdm.cdm_url.map(|x| x.to_string()).as_deref(),
            Some("http://127.0.0.1:8786/")
        );
    }

    #[test]
    fn test_export_arguments() {
        let args = Args::try_parse_from(["multimpd", "export", "-d", "downloads"]).unwrap();
        let Some(Commands::Export(export)) = args.command else {
            panic!("expected export command");
        };
        assert_eq!(export.directory, PathBuf::from("downloads"));
        assert!(export.name.is_none());
    }

    #[test]
    fn test_local_files_conflict_with_url() {
        let result = Args::try_parse_from([
            "multimpd",
            "https://example.com/a.mpd",
            "--video",
            "v.mp4",
        ]);
        assert!(result.is_err());
    }
}
