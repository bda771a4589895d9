use crate::error::{PrdError, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting the document or the state file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a document as a list of lines, without line terminators.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(PrdError::DocumentNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content.lines().map(str::to_owned).collect())
}

/// Write lines back out, newline-terminated, replacing the file atomically.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut out = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    atomic_write(path, out.as_bytes())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/prd.md");
        atomic_write(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn atomic_write_replaces_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prd.md");
        atomic_write(&path, b"a much longer original body").unwrap();
        atomic_write(&path, b"short").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short");
        // no tempfiles left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn lines_roundtrip_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prd.md");
        let lines = vec!["# Title".to_string(), String::new(), "body".to_string()];
        write_lines(&path, &lines).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Title\n\nbody\n");
        assert_eq!(read_lines(&path).unwrap(), lines);
    }

    #[test]
    fn read_lines_missing_document() {
        let dir = TempDir::new().unwrap();
        let err = read_lines(&dir.path().join("nope.md")).unwrap_err();
        assert!(matches!(err, PrdError::DocumentNotFound(_)));
    }

    #[test]
    fn write_if_missing_skips_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("existing.md");
        std::fs::write(&path, b"original").unwrap();
        let written = write_if_missing(&path, b"new").unwrap();
        assert!(!written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }
}
