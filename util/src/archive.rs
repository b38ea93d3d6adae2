//! Archive extraction and creation (`.zip`, `.tar`, `.tar.gz`/`.tgz`, `.gz`).
//!
//! Extraction guards against zip-slip style paths and against adversarially
//! deep nesting. Creation is limited to what the feedback return path
//! needs: flat zip archives, partitioned under the platform upload limit.

use crate::error::UtilError;
use crate::fsops::MAX_NESTING_DEPTH;
use crate::partition::{Partitions, partition};
use crate::temp::TempStack;
use flate2::read::GzDecoder;
use log::info;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tar::Archive;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Whether the path's extension is one of the supported archive formats.
pub fn is_supported_archive(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("zip") | Some("tar") | Some("gz") | Some("tgz")
    )
}

/// Extract `archive` into `target` (created if missing).
pub fn extract_archive(archive: &Path, target: &Path) -> Result<(), UtilError> {
    fs::create_dir_all(target)?;

    match archive.extension().and_then(|e| e.to_str()) {
        Some("zip") => extract_zip(archive, target)?,
        Some("tar") => {
            let mut tar = Archive::new(File::open(archive)?);
            tar.unpack(target)?;
        }
        Some("tgz") => {
            let mut tar = Archive::new(GzDecoder::new(File::open(archive)?));
            tar.unpack(target)?;
        }
        Some("gz") => {
            let stem = archive.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if stem.ends_with(".tar") {
                let mut tar = Archive::new(GzDecoder::new(File::open(archive)?));
                tar.unpack(target)?;
            } else {
                // plain .gz: a single compressed file
                let mut decoder = GzDecoder::new(File::open(archive)?);
                let mut out = File::create(target.join(stem))?;
                io::copy(&mut decoder, &mut out)?;
            }
        }
        Some(ext) => return Err(UtilError::UnsupportedArchive(format!(".{ext}"))),
        None => {
            return Err(UtilError::UnsupportedArchive(
                archive.display().to_string(),
            ));
        }
    }

    info!(
        "file '{}' extracted to '{}'.",
        archive.display(),
        target.display()
    );
    Ok(())
}

fn extract_zip(archive: &Path, target: &Path) -> Result<(), UtilError> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;

    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        let relative = file
            .enclosed_name()
            .ok_or_else(|| UtilError::ArchiveEscape(file.name().to_string()))?;
        let outpath = target.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&outpath)?;
            io::copy(&mut file, &mut out)?;
        }
    }

    Ok(())
}

/// If `path` is already a folder, return it unchanged; otherwise extract the
/// archive into a fresh tracked scratch folder and return that.
pub fn unzip_if_not_folder(path: &Path, temp: &mut TempStack) -> Result<PathBuf, UtilError> {
    if path.is_dir() {
        return Ok(path.to_path_buf());
    }
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let target = temp.create_dir(base)?;
    extract_archive(path, &target)?;
    Ok(target)
}

/// Recursively extract every archive found below `root`.
///
/// Walks with an explicit work stack of (folder, depth) pairs; each
/// extracted archive's output folder is tracked in `temp` and re-scanned.
/// Nesting beyond [`MAX_NESTING_DEPTH`] aborts.
pub fn extract_all_within(root: &Path, temp: &mut TempStack) -> Result<(), UtilError> {
    let mut pending: Vec<(PathBuf, usize)> = vec![(root.to_path_buf(), 0)];

    while let Some((dir, level)) = pending.pop() {
        if level > MAX_NESTING_DEPTH {
            return Err(UtilError::NestedTooDeep(
                root.to_path_buf(),
                MAX_NESTING_DEPTH,
            ));
        }

        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push((path, level + 1));
            } else if is_supported_archive(&path) {
                let target = path.with_extension("");
                extract_archive(&path, &target)?;
                temp.register(target.clone());
                pending.push((target, level + 1));
            }
        }
    }

    Ok(())
}

/// Write `files` (flat, by file name) into a single zip archive at `out`.
pub fn zip_files(files: &[PathBuf], out: &Path) -> Result<(), UtilError> {
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(File::create(out)?);

    for file in files {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UtilError::MalformedFilename(file.display().to_string()))?;
        writer.start_file(name, options)?;
        let mut reader = File::open(file)?;
        io::copy(&mut reader, &mut writer)?;
        info!("Zipped '{}' into '{}'.", file.display(), out.display());
    }

    writer.finish()?;
    Ok(())
}

/// Zip the files directly inside `dir` into as few archives as fit under
/// `limit_bytes` each, named `<base>_<i>_of_<n>.zip` (bare `<base>.zip` when
/// one suffices). Returns the number of archives written.
pub fn zip_partitioned(dir: &Path, out: &Path, limit_bytes: u64) -> Result<usize, UtilError> {
    let base = out.to_string_lossy();
    let base = base.strip_suffix(".zip").unwrap_or(&base).to_string();

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    let sized: Result<Vec<(PathBuf, u64)>, UtilError> = files
        .into_iter()
        .map(|p| {
            let size = fs::metadata(&p)?.len();
            Ok((p, size))
        })
        .collect();

    let Partitions { partitions, .. } = partition(&sized?, limit_bytes);
    let total = partitions.len();

    for (i, files) in partitions.iter().enumerate() {
        let out_path = if total > 1 {
            PathBuf::from(format!("{base}_{}_of_{total}.zip", i + 1))
        } else {
            PathBuf::from(format!("{base}.zip"))
        };
        zip_files(files, &out_path)?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(path: &Path, content: &[u8]) {
        let mut f = File::create(path).unwrap();
        f.write_all(content).unwrap();
    }

    #[test]
    fn zip_then_extract_round_trips() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        write_file(&src.path().join("a.txt"), b"alpha");
        write_file(&src.path().join("b.txt"), b"beta");

        let archive = dst.path().join("out.zip");
        zip_files(
            &[src.path().join("a.txt"), src.path().join("b.txt")],
            &archive,
        )
        .unwrap();

        let extracted = dst.path().join("extracted");
        extract_archive(&archive, &extracted).unwrap();
        assert_eq!(fs::read_to_string(extracted.join("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(extracted.join("b.txt")).unwrap(), "beta");
    }

    #[test]
    fn partitioned_zip_uses_i_of_n_names() {
        let src = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        // deflate does not shrink random-ish short content below 50 bytes
        write_file(&src.path().join("a.bin"), &[1u8; 60]);
        write_file(&src.path().join("b.bin"), &[2u8; 60]);

        let created = zip_partitioned(
            src.path(),
            &out_dir.path().join("feedback.zip"),
            1_000_000,
        )
        .unwrap();
        assert_eq!(created, 1);
        assert!(out_dir.path().join("feedback.zip").exists());
    }

    #[test]
    fn unzip_if_not_folder_passes_folders_through() {
        let dir = tempdir().unwrap();
        let mut temp = TempStack::new();
        let result = unzip_if_not_folder(dir.path(), &mut temp).unwrap();
        assert_eq!(result, dir.path());
        assert!(temp.is_empty());
    }

    #[test]
    fn extract_all_within_unpacks_nested_archives() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        write_file(&scratch.path().join("inner.txt"), b"nested");
        let archive = root.path().join("inner.zip");
        zip_files(&[scratch.path().join("inner.txt")], &archive).unwrap();

        let mut temp = TempStack::new();
        extract_all_within(root.path(), &mut temp).unwrap();
        assert!(root.path().join("inner/inner.txt").exists());
        assert!(!temp.is_empty());
    }

    #[test]
    fn unsupported_archives_are_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("weird.7z");
        write_file(&file, b"not really");
        let err = extract_archive(&file, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, UtilError::UnsupportedArchive(_)));
    }
}
