use crate::api::{Uploader, body_snippet};
use crate::config::UploadConfig;
use crate::{logi, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::cookie::Jar;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";

/// One row of a Netscape `cookies.txt` export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
    pub domain: String,
    /// Sent to subdomains too; otherwise a host-only cookie.
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub name: String,
    pub value: String,
}

impl BrowserCookie {
    fn host(&self) -> &str {
        self.domain.trim_start_matches('.')
    }

    fn set_cookie_header(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.include_subdomains || self.domain.starts_with('.') {
            out.push_str("; Domain=");
            out.push_str(&self.domain);
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

pub fn parse_netscape_cookies(text: &str) -> Vec<BrowserCookie> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let (line, http_only) = match line.strip_prefix("#HttpOnly_") {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }
        let name = fields[5].trim();
        if name.is_empty() {
            continue;
        }

        out.push(BrowserCookie {
            domain: fields[0].trim().to_string(),
            include_subdomains: fields[1].trim().eq_ignore_ascii_case("TRUE"),
            path: fields[2].trim().to_string(),
            secure: fields[3].trim().eq_ignore_ascii_case("TRUE"),
            http_only,
            name: name.to_string(),
            value: fields[6].trim().to_string(),
        });
    }
    out
}

pub fn cookie_jar(cookies: &[BrowserCookie]) -> Jar {
    let jar = Jar::default();
    for cookie in cookies {
        let scheme = if cookie.secure { "https" } else { "http" };
        let Ok(url) = Url::parse(&format!("{}://{}{}", scheme, cookie.host(), cookie.path)) else {
            continue;
        };
        jar.add_cookie_str(&cookie.set_cookie_header(), &url);
    }
    jar
}

/// Publishes a rendered file as a multipart post, authenticated with the
/// session cookies exported from a logged-in browser.
pub struct CookieUploader {
    endpoint: String,
    cookies_path: PathBuf,
    label: &'static str,
}

impl CookieUploader {
    pub fn new(cfg: &UploadConfig) -> Result<Self> {
        let endpoint = cfg
            .endpoint()
            .with_context(|| format!("no upload endpoint configured for {}", cfg.target.label()))?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            cookies_path: cfg.cookies.clone(),
            label: cfg.target.label(),
        })
    }

    async fn build_client(&self) -> Result<reqwest::Client> {
        let text = fs::read_to_string(&self.cookies_path)
            .await
            .with_context(|| format!("Failed to read cookies: {}", self.cookies_path.display()))?;
        let cookies = parse_netscape_cookies(&text);
        if cookies.is_empty() {
            anyhow::bail!("no cookies in {}", self.cookies_path.display());
        }
        logi(format!("Loaded {} cookies from {}", cookies.len(), self.cookies_path.display()));

        reqwest::Client::builder()
            .cookie_provider(Arc::new(cookie_jar(&cookies)))
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")
    }
}

#[async_trait]
impl Uploader for CookieUploader {
    async fn upload(&self, video: &Path, description: &str) -> Result<()> {
        let client = self.build_client().await?;

        let bytes = fs::read(video)
            .await
            .with_context(|| format!("Failed to read video: {}", video.display()))?;
        let file_name = video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());

        logi(format!(
            "Uploading {} ({} bytes) to {}",
            file_name,
            bytes.len(),
            self.label
        ));

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("video/mp4")?;
        let form = Form::new()
            .text("description", description.to_string())
            .part("video", part);

        let resp = client
            .post(&self.endpoint)
            .multipart(form)
            .timeout(Duration::from_secs(600))
            .send()
            .await
            .with_context(|| format!("{} upload request failed", self.label))?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            if !raw.is_empty() {
                logw(format!("{} raw body: {}", self.label, body_snippet(&raw)));
            }
            anyhow::bail!("{} upload HTTP {}", self.label, status.as_u16());
        }

        Ok(())
    }
}
