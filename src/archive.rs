use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

const PAGE_HEAD: &str = "<!DOCTYPE html>
<html lang='en'>
<head>
<meta charset='utf-8'>
<title>Generated Shorts</title>
<style>
body { font-family: sans-serif; background: #111; color: #eee; }
#gallery { display: flex; flex-wrap: wrap; gap: 16px; }
.video-card { width: 270px; }
.video-card video { width: 270px; height: 480px; background: #000; }
</style>
</head>
<body>
<h1>Generated Shorts</h1>
<div id='gallery'>
";

const PAGE_TAIL: &str = "</div>
</body>
</html>
";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("gallery marker <div id='gallery'> not found in {}", .0.display())]
    MarkerMissing(PathBuf),
}

#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub video: PathBuf,
    pub title: String,
    pub created: DateTime<Local>,
}

impl GalleryEntry {
    /// Title is the first `max_chars` characters of the script, single-line.
    pub fn from_script(video: PathBuf, script: &str, created: DateTime<Local>, max_chars: usize) -> Self {
        let flat = script.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut title: String = flat.chars().take(max_chars).collect();
        if flat.chars().count() > max_chars {
            title.push_str("...");
        }
        Self {
            video,
            title,
            created,
        }
    }

    pub fn to_html(&self, page_dir: &Path) -> String {
        let href = video_href(&self.video, page_dir);
        let href = escape_html(&href);
        format!(
            "<div class='video-card'>\n  <video src='{href}' controls preload='metadata'></video>\n  <p class='caption'>{}</p>\n  <p class='date'>{}</p>\n  <a href='{href}' download>Download</a>\n</div>\n",
            escape_html(&self.title),
            self.created.format("%Y-%m-%d %H:%M"),
        )
    }
}

fn video_href(video: &Path, page_dir: &Path) -> String {
    let rel = if video.is_absolute() == page_dir.is_absolute() {
        pathdiff::diff_paths(video, page_dir).unwrap_or_else(|| video.to_path_buf())
    } else {
        video.to_path_buf()
    };
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn gallery_regex() -> Result<&'static Regex> {
    static GALLERY_RE: OnceCell<Regex> = OnceCell::new();
    GALLERY_RE.get_or_try_init(|| {
        Regex::new(r#"(?i)<div\s+id\s*=\s*(?:'gallery'|"gallery")\s*>[ \t]*\r?\n?"#)
            .context("failed to compile gallery regex")
    })
}

/// Inserts `fragment` directly after the gallery marker, so the newest entry
/// is always first.
pub fn insert_after_marker(page: &str, fragment: &str) -> Option<String> {
    let re = gallery_regex().ok()?;
    let m = re.find(page)?;
    let mut out = String::with_capacity(page.len() + fragment.len());
    out.push_str(&page[..m.end()]);
    if !page[..m.end()].ends_with('\n') {
        out.push('\n');
    }
    out.push_str(fragment);
    out.push_str(&page[m.end()..]);
    Some(out)
}

pub fn empty_page() -> String {
    format!("{PAGE_HEAD}{PAGE_TAIL}")
}

pub async fn append_entry(archive_path: &Path, entry: &GalleryEntry) -> Result<()> {
    let page = if fs::metadata(archive_path).await.is_ok() {
        fs::read_to_string(archive_path)
            .await
            .with_context(|| format!("Failed to read archive: {}", archive_path.display()))?
    } else {
        empty_page()
    };

    let page_dir = archive_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let fragment = entry.to_html(page_dir);

    let updated = insert_after_marker(&page, &fragment)
        .ok_or_else(|| ArchiveError::MarkerMissing(archive_path.to_path_buf()))?;

    if page_dir != Path::new(".") {
        fs::create_dir_all(page_dir)
            .await
            .with_context(|| format!("Failed to create dir {}", page_dir.display()))?;
    }
    fs::write(archive_path, updated)
        .await
        .with_context(|| format!("Failed to write archive: {}", archive_path.display()))?;
    Ok(())
}
