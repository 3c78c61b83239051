//! Manifest and media retrieval.
//!
//! Media segments are fetched with `yt-dlp`, which receives custom templates so
//! that progress and the final location of every format come back as machine
//! readable lines on its stdout.

use crate::{
    error::ManifestError,
    manifest,
    media::{PipelineRun, TrackKind},
    process::display_args,
};
use log::{debug, warn};
use reqwest::{Url, blocking::Client, header::HeaderMap};
use std::{
    ffi::OsString,
    io::{BufRead, BufReader, Read},
    path::PathBuf,
    process::{Command, Stdio},
    thread,
};
use thiserror::Error;

pub const PROGRESS_PREFIX: &str = "[multimpd:progress] ";
pub const FILE_PREFIX: &str = "[multimpd:file] ";

const PROGRESS_TEMPLATE: &str = "%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress.eta)s|%(progress.speed)s|%(progress.fragment_index)s|%(progress.fragment_count)s|%(info.vcodec)s";
const FILE_TEMPLATE: &str = "%(vcodec)s|%(filepath)s";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("yt-dlp couldn't be located, install it or pass --yt-dlp flag.")]
    NotFound,

    #[error("unable to start yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("yt-dlp failed: {message}")]
    Failed { code: Option<i32>, message: String },

    #[error("yt-dlp finished without reporting any downloaded file.")]
    NoMedia,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One progress report of the fetch engine.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchProgress {
    pub kind: TrackKind,
    pub finished: bool,
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    /// Seconds.
    pub eta: Option<u64>,
    /// Bytes per second.
    pub speed: Option<f64>,
    pub fragment_index: Option<u64>,
    pub fragment_count: Option<u64>,
}

impl FetchProgress {
    /// Completion in percent, from bytes when known and from fragments otherwise.
    pub fn percent(&self) -> Option<f32> {
        if self.finished {
            return Some(100.0);
        }

        let (done, total) = match (self.downloaded_bytes, self.total_bytes) {
            (Some(done), Some(total)) if total > 0 => (done, total),
            _ => match (self.fragment_index, self.fragment_count) {
                (Some(done), Some(total)) if total > 0 => (done, total),
                _ => return None,
            },
        };

        Some((done as f32 / total as f32 * 100.0).min(100.0))
    }
}

/// Files produced by the fetch engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchedMedia {
    pub video: Option<PathBuf>,
    pub audio: Option<PathBuf>,
}

impl FetchedMedia {
    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }

    /// Store a reported file. Without a known kind, or when the slot of that
    /// kind is already taken, the first free slot is used (video first).
    pub fn assign(&mut self, kind: Option<TrackKind>, path: PathBuf) {
        let kind = match kind {
            Some(TrackKind::Video) if self.video.is_some() && self.audio.is_none() => {
                TrackKind::Audio
            }
            Some(TrackKind::Audio) if self.audio.is_some() && self.video.is_none() => {
                TrackKind::Video
            }
            Some(kind) => kind,
            None if self.video.is_none() => TrackKind::Video,
            None => TrackKind::Audio,
        };

        let slot = match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        };

        if let Some(previous) = slot.replace(path) {
            warn!("replacing previously fetched {} file {}", kind, previous.display());
        }
    }
}

/// Retrieval of the manifest text and of the best video and audio formats.
pub trait Fetcher {
    fn manifest(&self, url: &Url) -> Result<String, ManifestError>;

    fn media(
        &self,
        url: &Url,
        run: &PipelineRun,
        progress: &mut dyn FnMut(FetchProgress),
    ) -> Result<FetchedMedia, FetchError>;
}

pub struct Downloader {
    client: Client,
    headers: HeaderMap,
    yt_dlp: Option<PathBuf>,
}

impl Downloader {
    pub fn new(client: Client, headers: HeaderMap, yt_dlp: Option<PathBuf>) -> Self {
        Self {
            client,
            headers,
            yt_dlp,
        }
    }

    pub fn args(&self, url: &Url, run: &PipelineRun) -> Vec<OsString> {
        let mut args = [
            "--allow-unplayable-formats",
            "--fixup",
            "never",
            "--format",
            "bv,ba",
            "--no-warnings",
            "--quiet",
            "--progress",
            "--newline",
            "--progress-template",
        ]
        .map(OsString::from)
        .to_vec();

        args.push(format!("download:{}{}", PROGRESS_PREFIX, PROGRESS_TEMPLATE).into());
        args.push("--print".into());
        args.push(format!("after_move:{}{}", FILE_PREFIX, FILE_TEMPLATE).into());
        args.push("--paths".into());
        args.push(run.directory.clone().into());
        args.push("--output".into());
        args.push(run.download_template().into());

        for (name, value) in &self.headers {
            args.push("--add-header".into());
            args.push(
                format!(
                    "{}:{}",
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes())
                )
                .into(),
            );
        }

        args.push(url.as_str().into());
        args
    }
}

impl Fetcher for Downloader {
    fn manifest(&self, url: &Url) -> Result<String, ManifestError> {
        manifest::fetch(&self.client, url, &self.headers)
    }

    fn media(
        &self,
        url: &Url,
        run: &PipelineRun,
        progress: &mut dyn FnMut(FetchProgress),
    ) -> Result<FetchedMedia, FetchError> {
        let yt_dlp = self.yt_dlp.as_ref().ok_or(FetchError::NotFound)?;
        let args = self.args(url, run);
        debug!("executing {} {}", yt_dlp.display(), display_args(&args));

        let mut child = Command::new(yt_dlp)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(FetchError::Spawn)?;

        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut text = String::new();

            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text);
            }

            text
        });

        let media = match child.stdout.take() {
            Some(stdout) => read_output(BufReader::new(stdout), progress),
            None => Ok(FetchedMedia::default()),
        };

        let media = match media {
            Ok(x) => x,
            Err(e) => {
                warn!("Stopping yt-dlp, its output cannot be read: {}", e);
                let _ = child.kill();
                let _ = child.wait();
                let _ = stderr_reader.join();
                return Err(e.into());
            }
        };

        let status = child.wait()?;
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(FetchError::Failed {
                code: status.code(),
                message: last_error_line(&stderr),
            });
        }

        if media.is_empty() {
            return Err(FetchError::NoMedia);
        }

        Ok(media)
    }
}

/// Follow yt-dlp stdout, the first finished download is the video format.
fn read_output(
    reader: impl BufRead,
    progress: &mut dyn FnMut(FetchProgress),
) -> std::io::Result<FetchedMedia> {
    let mut media = FetchedMedia::default();
    let mut current = TrackKind::Video;

    for line in reader.lines() {
        let line = line?;

        if let Some(report) = parse_progress(&line, current) {
            if report.finished {
                current = TrackKind::Audio;
            }
            progress(report);
        } else if let Some((kind, path)) = parse_file(&line) {
            debug!("yt-dlp wrote {}", path.display());
            media.assign(kind, path);
        } else if !line.trim().is_empty() {
            debug!("yt-dlp: {}", line);
        }
    }

    Ok(media)
}

fn field(value: &str) -> Option<&str> {
    match value.trim() {
        "" | "NA" | "None" => None,
        x => Some(x),
    }
}

fn number(value: &str) -> Option<u64> {
    let value = field(value)?;
    value
        .parse::<u64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|x| x as u64))
}

fn track_kind(vcodec: &str) -> Option<TrackKind> {
    match field(vcodec)? {
        "none" => Some(TrackKind::Audio),
        _ => Some(TrackKind::Video),
    }
}

/// Parse a progress line. `current` is used when the line carries no codec.
pub fn parse_progress(line: &str, current: TrackKind) -> Option<FetchProgress> {
    let fields = line
        .trim_end()
        .strip_prefix(PROGRESS_PREFIX)?
        .split('|')
        .collect::<Vec<_>>();

    if fields.len() != 9 {
        return None;
    }

    Some(FetchProgress {
        kind: track_kind(fields[8]).unwrap_or(current),
        finished: fields[0].trim() == "finished",
        downloaded_bytes: number(fields[1]),
        total_bytes: number(fields[2]).or_else(|| number(fields[3])),
        eta: number(fields[4]),
        speed: field(fields[5]).and_then(|x| x.parse().ok()),
        fragment_index: number(fields[6]),
        fragment_count: number(fields[7]),
    })
}

/// Parse a line reporting the final path of a fetched format.
pub fn parse_file(line: &str) -> Option<(Option<TrackKind>, PathBuf)> {
    let (vcodec, path) = line
        .trim_end_matches(['\r', '\n'])
        .strip_prefix(FILE_PREFIX)?
        .split_once('|')?;

    let path = field(path)?;
    Some((track_kind(vcodec), PathBuf::from(path)))
}

fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|x| !x.trim().is_empty())
        .map(|x| x.trim().to_owned())
        .unwrap_or_else(|| "no error output".to_owned())
}
