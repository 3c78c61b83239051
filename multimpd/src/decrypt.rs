use crate::{
    error::Error,
    key::ContentKey,
    media::{PipelineRun, Stage, Tracks},
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

/// Single file decryption capability.
pub trait Decryptor {
    fn decrypt(&self, keys: &[ContentKey], input: &Path, output: &Path)
    -> io::Result<ToolOutput>;
}

/// Bento4 `mp4decrypt` executable.
#[derive(Clone, Debug)]
pub struct Mp4Decrypt {
    binary: PathBuf,
}

impl Mp4Decrypt {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn args(keys: &[ContentKey], input: &Path, output: &Path) -> Vec<OsString> {
        let mut args = Vec::with_capacity(keys.len() * 2 + 2);

        for key in keys {
            args.push(OsString::from("--key"));
            args.push(OsString::from(key.to_string()));
        }

        args.push(input.into());
        args.push(output.into());
        args
    }
}

impl Decryptor for Mp4Decrypt {
    fn decrypt(
        &self,
        keys: &[ContentKey],
        input: &Path,
        output: &Path,
    ) -> io::Result<ToolOutput> {
        let args = Self::args(keys, input, output);
        debug!("executing {} {}", self.binary.display(), display_args(&args));

        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map(ToolOutput::from)
    }
}

/// Decrypt every present track, video first, with the full key list.
///
/// Anything written to the tool's stderr counts as a failure, as does a non zero exit.
/// The first failure stops the run. After a successful decryption the input file is
/// deleted and the track points at the decrypted file.
pub fn decrypt_tracks(
    decryptor: &dyn Decryptor,
    keys: &[ContentKey],
    run: &PipelineRun,
    tracks: &mut Tracks,
    events: &mut dyn FnMut(Event),
) -> Result<(), Error> {
    for track in tracks.iter_mut() {
        if track.stage == Stage::Decrypted {
            continue;
        }

        let output = run.decrypted_path(track.kind, track.path.extension());
        let result = decryptor
            .decrypt(keys, &track.path, &output)
            .map_err(|e| Error::Decryption {
                track: track.kind,
                message: e.to_string(),
            })?;

        if !result.stderr_text().is_empty() || !result.success() {
            return Err(Error::Decryption {
                track: track.kind,
                message: result.failure_message(),
            });
        }

        remove_intermediate(&track.path, events)?;
        events(Event::Decrypted {
            kind: track.kind,
            path: output.clone(),
        });

        track.path = output;
        track.stage = Stage::Decrypted;
    }

    Ok(())
}
