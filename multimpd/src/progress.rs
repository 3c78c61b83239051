//! Console rendering of pipeline events.

use crate::{
    fetch::FetchProgress,
    media::TrackKind,
    pipeline::{Event, KeyOrigin, State},
    utils,
};
use colored::Colorize;
use kdam::{Bar, BarExt, tqdm};
use log::{debug, info, warn};
use std::io;

/// Turns pipeline events into log lines and a download progress bar.
#[derive(Default)]
pub struct Reporter {
    bar: Option<(TrackKind, Bar)>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: Event) {
        if let Err(e) = self.render(event) {
            debug!("unable to draw progress: {}", e);
        }
    }

    /// Close any active progress bar.
    pub fn finish(&mut self) {
        if let Some((_, mut bar)) = self.bar.take() {
            let _ = bar.refresh();
            eprintln!();
        }
    }

    fn render(&mut self, event: Event) -> io::Result<()> {
        match event {
            Event::Progress(progress) => return self.progress(progress),
            Event::State(State::Fetching) => info!("Downloading media with yt-dlp"),
            Event::State(State::Decrypting) => info!("Decrypting tracks"),
            Event::State(State::Muxing) => info!("Muxing video and audio"),
            Event::State(state) => debug!("pipeline state {}", state),
            Event::Fetched { kind, path } => {
                self.finish();
                info!("Downloaded {} track {}", kind, path.display());
            }
            Event::PsshFound(header) => {
                info!("{} PSSH {}", header.system(), header.to_base64().dimmed());

                for kid in header.key_ids() {
                    debug!("PSSH key id {}", kid.uuid());
                }
            }
            Event::KeysResolved { origin, keys } => {
                match origin {
                    KeyOrigin::Supplied => info!("Using {} supplied key(s)", keys.len()),
                    KeyOrigin::License => info!("Obtained {} key(s) from license server", keys.len()),
                }

                for key in keys {
                    info!("[{}] {}", "CONTENT".green(), key);
                }
            }
            Event::Decrypted { kind, path } => {
                info!("Decrypted {} track {}", kind, path.display())
            }
            Event::Removed(path) => info!("Deleting {}", path.display()),
            Event::MuxSkipped { kind, path } => warn!(
                "Only the {} track is available, muxing skipped. Decrypted file is {}",
                kind,
                path.display()
            ),
            Event::Muxed(path) => info!("Final file: {}", path.display().to_string().green()),
        }

        Ok(())
    }

    fn progress(&mut self, progress: FetchProgress) -> io::Result<()> {
        if self.bar.as_ref().is_none_or(|(kind, _)| *kind != progress.kind) {
            self.finish();
            self.bar = Some((
                progress.kind,
                tqdm!(
                    total = 100,
                    desc = format!("{:<5}", progress.kind),
                    unit = "%".to_owned(),
                    dynamic_ncols = true
                ),
            ));
        }

        let Some((_, bar)) = self.bar.as_mut() else {
            return Ok(());
        };

        let mut postfix = Vec::new();

        if let Some(downloaded) = progress.downloaded_bytes {
            postfix.push(match progress.total_bytes {
                Some(total) => format!(
                    "{} / {}",
                    utils::format_bytes(downloaded, 2),
                    utils::format_bytes(total, 2)
                ),
                None => utils::format_bytes(downloaded, 2),
            });
        }

        if let Some(speed) = progress.speed {
            postfix.push(format!("{}/s", utils::format_bytes(speed as u64, 2)));
        }

        if let (Some(index), Some(count)) = (progress.fragment_index, progress.fragment_count) {
            postfix.push(format!("frag {}/{}", index, count));
        }

        bar.set_postfix(postfix.join(", "));

        if let Some(percent) = progress.percent() {
            bar.update_to(percent as usize)?;
        } else {
            bar.refresh()?;
        }

        Ok(())
    }
}
