//! Packing finished downloads into a zip archive.

use log::debug;
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// Extensions of the files moved into an export folder.
pub const EXPORT_EXTENSIONS: [&str; 4] = ["mp4", "mkv", "key", "log"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unable to write zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result of a successful export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exported {
    pub folder: PathBuf,
    pub archive: PathBuf,
    pub files: Vec<PathBuf>,
}

/// `output_<date>_<time>` in local time.
pub fn folder_name() -> String {
    format!("output_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

/// Move exportable files of `directory` into `directory/<name>/` and pack that folder
/// as `directory/<name>.zip`. Files listed in `keep` stay where they are.
///
/// Nothing is created when no file qualifies.
pub fn export(
    directory: &Path,
    name: &str,
    keep: &[PathBuf],
) -> Result<Option<Exported>, ExportError> {
    let keep = keep
        .iter()
        .filter_map(|x| fs::canonicalize(x).ok())
        .collect::<Vec<_>>();
    let mut candidates = Vec::new();

    for entry in fs::read_dir(directory)? {
        let path = entry?.path();

        if !path.is_file() || !is_exportable(&path) {
            continue;
        }

        if fs::canonicalize(&path).is_ok_and(|x| keep.contains(&x)) {
            debug!("not exporting {}", path.display());
            continue;
        }

        candidates.push(path);
    }

    if candidates.is_empty() {
        return Ok(None);
    }

    candidates.sort();
    let folder = directory.join(name);
    fs::create_dir_all(&folder)?;

    let mut files = Vec::new();

    for path in candidates {
        let Some(file_name) = path.file_name() else {
            continue;
        };

        let target = folder.join(file_name);
        debug!("moving {} to {}", path.display(), target.display());
        fs::rename(&path, &target)?;
        files.push(target);
    }

    let archive = directory.join(format!("{}.zip", name));
    let mut writer = ZipWriter::new(File::create(&archive)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.add_directory(format!("{}/", name), options)?;

    for path in &files {
        let file_name = path
            .file_name()
            .map(|x| x.to_string_lossy().into_owned())
            .unwrap_or_default();
        writer.start_file(format!("{}/{}", name, file_name), options)?;
        io::copy(&mut File::open(path)?, &mut writer)?;
    }

    writer.finish()?;

    Ok(Some(Exported {
        folder,
        archive,
        files,
    }))
}

fn is_exportable(path: &Path) -> bool {
    path.extension()
        .map(|x| x.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|x| EXPORT_EXTENSIONS.contains(&x.as_str()))
}
