//! Output paths and writing.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// `<input stem>.md` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("md")
}

/// `<output stem>_images/` next to the output.
pub fn default_image_dir(output: &Path) -> PathBuf {
    parent_dir(output).join(format!("{}_images", file_stem(output)))
}

/// File stem used as the prefix of image file names.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "note".to_string())
}

/// Prefix that makes image file names resolve from the note's directory.
///
/// Always ends in `/` and uses forward slashes. An image directory outside
/// the note's directory is linked by its full path.
pub fn link_prefix(output: &Path, image_dir: &Path) -> String {
    let relative = image_dir
        .strip_prefix(parent_dir(output))
        .unwrap_or(image_dir);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::CurDir => None,
            Component::RootDir => Some(String::new()),
            other => Some(other.as_os_str().to_string_lossy().into_owned()),
        })
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!("{}/", parts.join("/"))
    }
}

/// Write `content` to `path` through a temporary file in the same
/// directory, so the file either appears complete or not at all.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = parent_dir(path);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let output = default_output_path(Path::new("/docs/report.pdf"));
        assert_eq!(output, PathBuf::from("/docs/report.md"));
        assert_eq!(
            default_image_dir(&output),
            PathBuf::from("/docs/report_images")
        );
        assert_eq!(
            default_image_dir(Path::new("note.md")),
            PathBuf::from("./note_images")
        );
    }

    #[test]
    fn test_link_prefix_relative_to_output() {
        assert_eq!(
            link_prefix(Path::new("/vault/note.md"), Path::new("/vault/note_images")),
            "note_images/"
        );
        assert_eq!(
            link_prefix(Path::new("note.md"), Path::new("./note_images")),
            "note_images/"
        );
        assert_eq!(
            link_prefix(Path::new("/vault/note.md"), Path::new("/vault/assets/pdf")),
            "assets/pdf/"
        );
        assert_eq!(
            link_prefix(Path::new("/vault/note.md"), Path::new("/elsewhere/img")),
            "/elsewhere/img/"
        );
    }

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.md");
        assert!(matches!(write_atomic(&path, "x"), Err(Error::Io(_))));
        assert!(!path.exists());
    }
}
