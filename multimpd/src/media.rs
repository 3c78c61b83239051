use chrono::Local;
use std::{
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TrackKind::Video => "video",
                TrackKind::Audio => "audio",
            }
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Downloaded,
    Decrypted,
}

/// One media track and the single file that currently holds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaTrack {
    pub kind: TrackKind,
    pub path: PathBuf,
    pub stage: Stage,
}

impl MediaTrack {
    pub fn downloaded(kind: TrackKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            stage: Stage::Downloaded,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tracks {
    pub video: Option<MediaTrack>,
    pub audio: Option<MediaTrack>,
}

impl Tracks {
    pub fn set(&mut self, kind: TrackKind, path: impl Into<PathBuf>) {
        let track = Some(MediaTrack::downloaded(kind, path));

        match kind {
            TrackKind::Video => self.video = track,
            TrackKind::Audio => self.audio = track,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }

    /// Present tracks, video first.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MediaTrack> {
        self.video.iter_mut().chain(self.audio.iter_mut())
    }

    pub fn ready_to_mux(&self) -> bool {
        matches!(
            (&self.video, &self.audio),
            (
                Some(MediaTrack {
                    stage: Stage::Decrypted,
                    ..
                }),
                Some(MediaTrack {
                    stage: Stage::Decrypted,
                    ..
                })
            )
        )
    }
}

/// Identity of one pipeline execution.
///
/// The id prefixes every intermediate file so that repeated or parallel runs
/// in the same directory never touch each other's files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineRun {
    pub id: String,
    pub directory: PathBuf,
    pub output: PathBuf,
}

impl PipelineRun {
    /// New run with a random id. Without an `output` name,
    /// `<id>.<dd-mm-YYYY_HH-MM-SS>.mkv` inside `directory` is used.
    pub fn new(directory: impl Into<PathBuf>, output: Option<&Path>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let directory = directory.into();
        let output = match output {
            Some(output) => output_with_extension(output),
            None => directory.join(format!(
                "{}.{}.mkv",
                id,
                Local::now().format("%d-%m-%Y_%H-%M-%S")
            )),
        };

        Self {
            id,
            directory,
            output,
        }
    }

    pub fn with_id(id: impl Into<String>, directory: impl Into<PathBuf>, output: &Path) -> Self {
        Self {
            id: id.into(),
            directory: directory.into(),
            output: output_with_extension(output),
        }
    }

    /// `<directory>/<id>.<kind>.<extension>`
    pub fn decrypted_path(&self, kind: TrackKind, extension: Option<&OsStr>) -> PathBuf {
        let extension = extension
            .map(|x| x.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mp4".to_owned());

        self.directory
            .join(format!("{}.{}.{}", self.id, kind, extension))
    }

    /// Output template handed to the fetch engine.
    pub fn download_template(&self) -> String {
        format!("{}.f%(format_id)s.%(ext)s", self.id)
    }
}

fn output_with_extension(output: &Path) -> PathBuf {
    if output.extension().is_some() {
        output.to_owned()
    } else {
        output.with_extension("mkv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_name() {
        let run = PipelineRun::new("work", None);
        let name = run.output.file_name().unwrap().to_string_lossy().into_owned();
        assert!(run.output.starts_with("work"));
        assert!(name.starts_with(&run.id));
        assert!(name.ends_with(".mkv"));
        assert_eq!(run.id.len(), 36);
    }

    #[test]
    fn test_output_gets_extension() {
        let run = PipelineRun::new(".", Some(Path::new("movie")));
        assert_eq!(run.output, PathBuf::from("movie.mkv"));

        let run = PipelineRun::new(".", Some(Path::new("movie.mp4")));
        assert_eq!(run.output, PathBuf::from("movie.mp4"));
    }

    #[test]
    fn test_decrypted_path() {
        let run = PipelineRun::with_id("abc", "tmp", Path::new("out.mkv"));
        assert_eq!(
            run.decrypted_path(TrackKind::Audio, Some(OsStr::new("m4a"))),
            PathBuf::from("tmp/abc.audio.m4a")
        );
        assert_eq!(
            run.decrypted_path(TrackKind::Video, None),
            PathBuf::from("tmp/abc.video.mp4")
        );
    }

    #[test]
    fn test_ready_to_mux() {
        let mut tracks = Tracks::default();
        tracks.set(TrackKind::Video, "v.mp4");
        tracks.set(TrackKind::Audio, "a.m4a");
        assert!(!tracks.ready_to_mux());

        tracks.iter_mut().for_each(|x| x.stage = Stage::Decrypted);
        assert!(tracks.ready_to_mux());

        tracks.video = None;
        assert!(!tracks.ready_to_mux());
    }
}
