use crate::{
    error::Error,
    media::Tracks,
    pipeline::{Event, remove_intermediate},
    process::{ToolOutput, display_args},
};
use log::debug;
use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

/// Combines one video and one audio file into a container without re-encoding.
pub trait Muxer {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> io::Result<ToolOutput>;
}

#[derive(Clone, Debug)]
pub struct Ffmpeg {
    binary: PathBuf,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        let mut args = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
            .map(OsString::from)
            .to_vec();
        args.push(video.into());
        args.push("-i".into());
        args.push(audio.into());
        args.extend(
            ["-map", "0", "-map", "1", "-c:v", "copy", "-c:a", "copy"].map(OsString::from),
        );
        args.push(output.into());
        args
    }
}

impl Muxer for Ffmpeg {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> io::Result<ToolOutput> {
        let args = Self::args(video, audio, output);
        debug!("executing {} {}", self.binary.display(), display_args(&args));

        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map(ToolOutput::from)
    }
}

/// Stream copy the decrypted video and audio into `output`, then delete both inputs.
///
/// On failure the decrypted files are left where they are.
pub fn mux_tracks(
    muxer: &dyn Muxer,
    tracks: &mut Tracks,
    output: &Path,
    events: &mut dyn FnMut(Event),
) -> Result<PathBuf, Error> {
    let (Some(video), Some(audio)) = (&tracks.video, &tracks.audio) else {
        return Err(Error::Mux(
            "both video and audio tracks are required".to_owned(),
        ));
    };

    let result = muxer
        .mux(&video.path, &audio.path, output)
        .map_err(|e| Error::Mux(e.to_string()))?;

    if !result.success() {
        return Err(Error::Mux(result.failure_message()));
    }

    for track in [tracks.video.take(), tracks.audio.take()].into_iter().flatten() {
        remove_intermediate(&track.path, events)?;
    }

    events(Event::Muxed(output.to_owned()));
    Ok(output.to_owned())
}
