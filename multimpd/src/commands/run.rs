use super::{CdmOptions, ClientOptions, ToolOptions};
use crate::{
    decrypt::Mp4Decrypt,
    error::Error,
    fetch::Downloader,
    history::History,
    key::ContentKey,
    media::PipelineRun,
    mux::Ffmpeg,
    pipeline::{Pipeline, Request},
    progress::Reporter,
    protection::ProtectionHeader,
    utils,
};
use anyhow::{Result, anyhow, bail};
use clap::Args;
use log::{debug, info};
use requestty::Question;
use reqwest::Url;
use std::{fs, path::PathBuf};

/// Download, decrypt and mux a DASH stream.
#[derive(Args, Clone, Debug)]
pub struct Run {
    /// http(s) url of the DASH manifest.
    /// Not needed when local files are given with --video or --audio.
    #[arg(value_name = "MPD_URL", value_parser = utils::http_url_parser)]
    pub mpd_url: Option<Url>,

    /// Widevine license server url.
    #[arg(long, value_name = "URL", value_parser = utils::http_url_parser)]
    pub license: Option<Url>,

    /// Base64 encoded PSSH. By default it is read from the manifest.
    #[arg(long, value_name = "BASE64", value_parser = pssh_parser)]
    pub pssh: Option<ProtectionHeader>,

    /// Decryption keys, skipping the license request.
    /// KID:KEY should be specified in hex format.
    /// This option can be used multiple times.
    #[arg(short, long, value_name = "KID:KEY", num_args = 1..)]
    pub keys: Vec<ContentKey>,

    /// Name of the muxed output file. `.mkv` is appended when there is no extension.
    /// By default `<run id>.<date>.mkv` inside --directory is used.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for downloaded and decrypted files.
    #[arg(short, long, default_value = ".")]
    pub directory: PathBuf,

    /// Encrypted local video file to use instead of downloading.
    /// Note that it is deleted once decrypted.
    #[arg(long, value_name = "PATH", conflicts_with = "mpd_url")]
    pub video: Option<PathBuf>,

    /// Encrypted local audio file to use instead of downloading.
    /// Note that it is deleted once decrypted.
    #[arg(long, value_name = "PATH", conflicts_with = "mpd_url")]
    pub audio: Option<PathBuf>,

    /// Pick the manifest url from previously used ones.
    #[arg(long, conflicts_with_all = ["mpd_url", "video", "audio"])]
    pub from_history: bool,

    #[command(flatten)]
    pub client: ClientOptions,

    #[command(flatten)]
    pub tools: ToolOptions,

    #[command(flatten)]
    pub cdm: CdmOptions,
}

impl Run {
    pub fn execute(self, history: &History) -> Result<()> {
        let mut manifest = self.mpd_url.clone();

        if self.from_history {
            manifest = Some(select_from_history(history)?);
        }

        if manifest.is_none() && self.video.is_none() && self.audio.is_none() {
            bail!(Error::NoInput);
        }

        let mp4decrypt = self.tools.mp4decrypt().ok_or_else(|| {
            anyhow!("mp4decrypt couldn't be located, install it or pass --mp4decrypt flag.")
        })?;
        let ffmpeg = self.tools.ffmpeg().ok_or_else(|| {
            anyhow!("ffmpeg couldn't be located, install it or pass --ffmpeg flag.")
        })?;
        let yt_dlp = self.tools.yt_dlp();

        if manifest.is_some() && yt_dlp.is_none() {
            bail!("yt-dlp couldn't be located, it is required to download media.");
        }

        if let Some(url) = &manifest {
            history.append(url.as_str())?;
        }

        if !self.directory.exists() {
            fs::create_dir_all(&self.directory)?;
        }

        let run = PipelineRun::new(&self.directory, self.output.as_deref());
        debug!("run id {}, output {}", run.id, run.output.display());

        let client = self.client.client()?;
        let headers = self.client.headers();
        let fetcher = Downloader::new(client.clone(), headers.clone(), yt_dlp);
        let key_source = self.cdm.key_source(&client);
        let decryptor = Mp4Decrypt::new(mp4decrypt);
        let muxer = Ffmpeg::new(ffmpeg);

        let request = Request {
            manifest,
            license_url: self.license,
            pssh: self.pssh,
            keys: self.keys,
            headers,
            video: self.video,
            audio: self.audio,
        };

        let mut reporter = Reporter::new();
        let mut pipeline = Pipeline::new(&fetcher, key_source.as_ref(), &decryptor, &muxer);
        let outcome = pipeline.run(&run, request, &mut |event| reporter.handle(event));
        reporter.finish();

        if outcome?.output.is_some() {
            info!("Completed successfully");
        }

        Ok(())
    }
}

fn pssh_parser(s: &str) -> Result<ProtectionHeader, String> {
    ProtectionHeader::from_base64(s.trim()).map_err(|e| e.to_string())
}

fn select_from_history(history: &History) -> Result<Url> {
    let entries = history.recent()?;

    if entries.is_empty() {
        bail!("No entries in {}.", history.path().display());
    }

    let question = Question::select("mpd_url")
        .message("Select a previously used MPD URL")
        .choices(entries)
        .build();
    let answer = requestty::prompt_one(question)?;
    let item = answer
        .as_list_item()
        .ok_or_else(|| anyhow!("No MPD URL selected."))?;

    utils::http_url_parser(&item.text).map_err(|e| anyhow!(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pssh_parser() {
        let header = pssh_parser("AAAAInBzc2gAAAAA7e+LqXnWSs6jyCfc1R0h7QAAAAISNA==").unwrap();
        assert_eq!(header.system(), &multimpd_pssh::SystemId::Widevine);
        assert_eq!(header.data().len(), 34);
        assert!(pssh_parser("not base64!").is_err());
    }
}
