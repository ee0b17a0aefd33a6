use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `text` next to `path` first, then swaps it in so a crash never leaves half a save.
pub(crate) fn replace_with_text(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let staged = staged_path_for(path);
    if let Err(error) = fs::write(&staged, text.as_bytes()) {
        let _ = fs::remove_file(&staged);
        return Err(error);
    }
    swap_in(&staged, path)
}

fn swap_in(staged: &Path, target: &Path) -> io::Result<()> {
    match fs::remove_file(target) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(staged);
            return Err(error);
        }
    }

    fs::rename(staged, target).inspect_err(|_| {
        let _ = fs::remove_file(staged);
    })
}

fn staged_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("save.json");
    path.with_file_name(format!("{file_name}.partial"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacing_overwrites_and_leaves_no_staged_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("save.json");
        replace_with_text(&path, "first").expect("first write");
        replace_with_text(&path, "second").expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
        assert!(!staged_path_for(&path).exists());
    }
}
