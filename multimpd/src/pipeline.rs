//! Sequencing of fetch, key resolution, decryption and muxing.

use crate::{
    decrypt::{Decryptor, decrypt_tracks},
    error::Error,
    fetch::{FetchProgress, Fetcher},
    key::ContentKey,
    license::KeySource,
    manifest,
    media::{PipelineRun, TrackKind, Tracks},
    mux::{Muxer, mux_tracks},
    protection::ProtectionHeader,
};
use log::debug;
use reqwest::{Url, header::HeaderMap};
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Fetching,
    KeyResolution,
    Decrypting,
    Muxing,
    Done,
    Aborted,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                State::Idle => "idle",
                State::Fetching => "fetching",
                State::KeyResolution => "key resolution",
                State::Decrypting => "decrypting",
                State::Muxing => "muxing",
                State::Done => "done",
                State::Aborted => "aborted",
            }
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOrigin {
    Supplied,
    License,
}

/// Structured notifications emitted while a run progresses.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    State(State),
    Progress(FetchProgress),
    Fetched { kind: TrackKind, path: PathBuf },
    PsshFound(ProtectionHeader),
    KeysResolved {
        origin: KeyOrigin,
        keys: Vec<ContentKey>,
    },
    Decrypted { kind: TrackKind, path: PathBuf },
    Removed(PathBuf),
    /// Only one track was available, nothing to mux.
    MuxSkipped { kind: TrackKind, path: PathBuf },
    Muxed(PathBuf),
}

/// Inputs of a single run.
#[derive(Clone, Debug, Default)]
pub struct Request {
    /// When set, media is fetched and local files are ignored.
    pub manifest: Option<Url>,
    pub license_url: Option<Url>,
    pub pssh: Option<ProtectionHeader>,
    /// Non empty keys skip the license exchange entirely.
    pub keys: Vec<ContentKey>,
    pub headers: HeaderMap,
    pub video: Option<PathBuf>,
    pub audio: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// `None` when muxing was skipped.
    pub output: Option<PathBuf>,
    /// Tracks left on disk, empty after a successful mux.
    pub tracks: Tracks,
}

pub struct Pipeline<'a> {
    fetcher: &'a dyn Fetcher,
    key_source: &'a dyn KeySource,
    decryptor: &'a dyn Decryptor,
    muxer: &'a dyn Muxer,
    state: State,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        key_source: &'a dyn KeySource,
        decryptor: &'a dyn Decryptor,
        muxer: &'a dyn Muxer,
    ) -> Self {
        Self {
            fetcher,
            key_source,
            decryptor,
            muxer,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn transition(&mut self, state: State, events: &mut dyn FnMut(Event)) {
        debug!("pipeline {} -> {}", self.state, state);
        self.state = state;
        events(Event::State(state));
    }

    /// Execute every stage in order. Any error leaves the pipeline `Aborted`
    /// and files produced so far stay on disk.
    pub fn run(
        &mut self,
        run: &PipelineRun,
        request: Request,
        events: &mut dyn FnMut(Event),
    ) -> Result<Outcome, Error> {
        match self.execute(run, request, events) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.transition(State::Aborted, events);
                Err(e)
            }
        }
    }

    fn execute(
        &mut self,
        run: &PipelineRun,
        request: Request,
        events: &mut dyn FnMut(Event),
    ) -> Result<Outcome, Error> {
        self.state = State::Idle;
        let mut tracks = Tracks::default();

        if let Some(url) = &request.manifest {
            self.transition(State::Fetching, events);
            let media = self
                .fetcher
                .media(url, run, &mut |x| events(Event::Progress(x)))?;

            for (kind, path) in [(TrackKind::Video, media.video), (TrackKind::Audio, media.audio)] {
                if let Some(path) = path {
                    events(Event::Fetched {
                        kind,
                        path: path.clone(),
                    });
                    tracks.set(kind, path);
                }
            }
        } else {
            for (kind, path) in [
                (TrackKind::Video, &request.video),
                (TrackKind::Audio, &request.audio),
            ] {
                if let Some(path) = path {
                    if !path.is_file() {
                        return Err(Error::Input(format!(
                            "{} file {} doesn't exist.",
                            kind,
                            path.display()
                        )));
                    }

                    tracks.set(kind, path);
                }
            }

            if tracks.is_empty() {
                return Err(Error::NoInput);
            }
        }

        self.transition(State::KeyResolution, events);
        let keys = self.resolve_keys(&request, events)?;

        self.transition(State::Decrypting, events);
        decrypt_tracks(self.decryptor, &keys, run, &mut tracks, events)?;

        let output = if tracks.ready_to_mux() {
            self.transition(State::Muxing, events);
            Some(mux_tracks(self.muxer, &mut tracks, &run.output, events)?)
        } else {
            if let Some(track) = tracks.video.as_ref().or(tracks.audio.as_ref()) {
                events(Event::MuxSkipped {
                    kind: track.kind,
                    path: track.path.clone(),
                });
            }

            None
        };

        self.transition(State::Done, events);
        Ok(Outcome { output, tracks })
    }

    fn resolve_keys(
        &self,
        request: &Request,
        events: &mut dyn FnMut(Event),
    ) -> Result<Vec<ContentKey>, Error> {
        if !request.keys.is_empty() {
            events(Event::KeysResolved {
                origin: KeyOrigin::Supplied,
                keys: request.keys.clone(),
            });
            return Ok(request.keys.clone());
        }

        let header = match (&request.pssh, &request.manifest) {
            (Some(header), _) => header.clone(),
            (None, Some(url)) => {
                let text = self.fetcher.manifest(url)?;
                manifest::scan_str(&text)?.ok_or(Error::MissingPssh)?
            }
            (None, None) => return Err(Error::MissingPssh),
        };
        events(Event::PsshFound(header.clone()));

        let license_url = request
            .license_url
            .as_ref()
            .ok_or(Error::MissingLicenseUrl)?;
        let keys = self
            .key_source
            .acquire_keys(&header, license_url, &request.headers)?;

        events(Event::KeysResolved {
            origin: KeyOrigin::License,
            keys: keys.clone(),
        });
        Ok(keys)
    }
}

/// Delete an intermediate file. A file which is already gone is not an error.
pub(crate) fn remove_intermediate(path: &Path, events: &mut dyn FnMut(Event)) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            events(Event::Removed(path.to_owned()));
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.f1.mp4");
        fs::write(&path, b"data").unwrap();

        let mut events = Vec::new();
        remove_intermediate(&path, &mut |x| events.push(x)).unwrap();
        remove_intermediate(&path, &mut |x| events.push(x)).unwrap();

        assert!(!path.exists());
        assert_eq!(events, vec![Event::Removed(path)]);
    }
}
