use anyhow::Result;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn has_ext(path: &Path, exts: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };
    exts.iter()
        .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Video files directly inside `dir` whose extension is one of `exts`, sorted
/// by path. A missing directory yields an empty pool.
pub async fn list_candidates(dir: &Path, exts: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let dir = dir.to_owned();
    let exts = exts.to_vec();
    tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file() && has_ext(entry.path(), &exts) {
                out.push(entry.into_path());
            }
        }
        out.sort();
        Ok(out)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        vec!["mp4".to_string(), ".mov".to_string()]
    }

    #[tokio::test]
    async fn filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.MOV", "notes.txt", "c.mkv", "noext"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();
        std::fs::write(dir.path().join("nested.mp4").join("d.mp4"), b"x").unwrap();

        let found = list_candidates(dir.path(), &exts()).await.unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.MOV", "b.mp4"]);
    }

    #[tokio::test]
    async fn missing_dir_is_empty_pool() {
        let dir = tempfile::tempdir().unwrap();
        let found = list_candidates(&dir.path().join("nope"), &exts()).await.unwrap();
        assert!(found.is_empty());
    }
}
