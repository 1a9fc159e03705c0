//! HTTP collaborators: the overlay release page and the compiler download.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{ArchiveExtractor, CompilerSource, Release, ReleaseSource};
use crate::error::{ResourceError, SourceError};
use crate::install::COMPILER_DLL;
use crate::target::Architecture;

/// Release pages, tried in order.
pub const RESHADE_URLS: &[&str] = &["https://reshade.me", "http://static.reshade.me"];

const DOWNLOAD_PREFIX: &str = "/downloads/ReShade_Setup_";
const ADDON_SUFFIX: &str = "_Addon";
const USER_AGENT: &str = concat!("reshade-linux/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(15);

/// SHA-256 of the Firefox 62.0.3 installer that ships `d3dcompiler_47.dll`.
#[must_use]
pub const fn compiler_archive_sha256(architecture: Architecture) -> &'static str {
    match architecture {
        Architecture::X86 => "d6edb4ff0a713f417ebd19baedfe07527c6e45e84a6c73ed8c66a33377cc0aca",
        Architecture::X64 => "721977f36c008af2b637aedd3f1b529f3cfed6feb10f68ebe17469acb1934986",
    }
}

/// Download URL of the Firefox installer for `architecture`.
#[must_use]
pub fn compiler_archive_url(architecture: Architecture) -> String {
    format!(
        "https://download-installer.cdn.mozilla.net/pub/firefox/releases/62.0.3/win{}/ach/Firefox%20Setup%2062.0.3.exe",
        architecture.bits()
    )
}

/// Find the newest installer version linked from a release page.
///
/// With `addon` only add-on builds match and the returned version carries
/// the `_Addon` suffix; without it add-on builds are ignored.
#[must_use]
pub fn parse_latest_version(html: &str, addon: bool) -> Option<String> {
    html.match_indices(DOWNLOAD_PREFIX).find_map(|(start, _)| {
        let rest = html.get(start + DOWNLOAD_PREFIX.len()..)?;
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let (number, tail) = rest.split_at(digits);
        let tail = if addon {
            tail.strip_prefix(ADDON_SUFFIX)?
        } else {
            tail
        };
        tail.starts_with(".exe").then(|| {
            if addon {
                format!("{number}{ADDON_SUFFIX}")
            } else {
                number.to_string()
            }
        })
    })
}

/// Lowercase hex SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_sha256(path: &Path) -> io::Result<String> {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    let result = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for b in &result {
        // write! to a String is infallible
        write!(hex, "{b:02x}").unwrap_or(());
    }
    Ok(hex)
}

/// Blocking HTTP client with the installer's timeouts and user agent.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Create a client with connect and response timeouts set.
    #[must_use]
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .timeout_recv_response(Some(RESPONSE_TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn http_error(url: &str, e: impl std::fmt::Display) -> SourceError {
        SourceError::Http {
            url: url.to_string(),
            message: e.to_string(),
        }
    }

    /// Fetch `url` as text.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] on transport failure or a non-success
    /// status.
    pub fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| Self::http_error(url, e))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| Self::http_error(url, e))
    }

    /// Stream `url` into the file at `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] on transport failure and
    /// [`SourceError::Resource`] if the file cannot be written.
    pub fn download(&self, url: &str, dest: &Path) -> Result<(), SourceError> {
        let response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| Self::http_error(url, e))?;
        crate::resources::fs::ensure_parent_dir(dest)?;
        let mut file = fs::File::create(dest).map_err(|e| ResourceError::io("create", dest, e))?;
        let mut reader = response.into_body().into_reader();
        io::copy(&mut reader, &mut file).map_err(|e| Self::http_error(url, e))?;
        tracing::debug!("downloaded {url} to {}", dest.display());
        Ok(())
    }
}

/// Release lookup against the official download pages.
#[derive(Debug, Clone, Default)]
pub struct ReshadeWebsite {
    http: HttpClient,
}

impl ReshadeWebsite {
    /// Create a release source using `http`.
    #[must_use]
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

impl ReleaseSource for ReshadeWebsite {
    fn latest(&self, addon: bool) -> Result<Release, SourceError> {
        for base in RESHADE_URLS {
            let html = match self.http.get_text(base) {
                Ok(html) => html,
                Err(e) => {
                    tracing::debug!("release page unavailable: {e}");
                    continue;
                }
            };
            if let Some(version) = parse_latest_version(&html, addon) {
                let url = format!("{base}{DOWNLOAD_PREFIX}{version}.exe");
                return Ok(Release { version, url });
            }
            tracing::debug!("no installer link found on {base}");
        }
        Err(SourceError::NoRelease)
    }

    fn download(&self, release: &Release, dest: &Path) -> Result<(), SourceError> {
        self.http.download(&release.url, dest)
    }
}

/// Fetches `d3dcompiler_47.dll` out of a pinned Firefox installer.
#[derive(Debug)]
pub struct FirefoxCompiler<E> {
    http: HttpClient,
    extractor: E,
}

impl<E: ArchiveExtractor> FirefoxCompiler<E> {
    /// Create a compiler source that unpacks with `extractor`.
    #[must_use]
    pub const fn new(http: HttpClient, extractor: E) -> Self {
        Self { http, extractor }
    }

    fn fetch_into(
        &self,
        architecture: Architecture,
        scratch: &Path,
        dest: &Path,
    ) -> Result<(), SourceError> {
        let archive = scratch.join("firefox.exe");
        self.http
            .download(&compiler_archive_url(architecture), &archive)?;

        let expected = compiler_archive_sha256(architecture);
        let actual = compute_sha256(&archive).map_err(|e| ResourceError::io("hash", &archive, e))?;
        if actual != expected {
            return Err(SourceError::Checksum {
                file: archive.display().to_string(),
                expected: expected.to_string(),
                actual,
            });
        }

        self.extractor.extract(&archive, scratch)?;
        let extracted = scratch.join(COMPILER_DLL);
        if !extracted.is_file() {
            return Err(SourceError::MissingArtifact(COMPILER_DLL.to_string()));
        }
        fs::copy(&extracted, dest).map_err(|e| ResourceError::io("copy", dest, e))?;
        Ok(())
    }
}

fn scratch_dir(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".download");
    PathBuf::from(name)
}

impl<E: ArchiveExtractor> CompilerSource for FirefoxCompiler<E> {
    fn fetch(&self, architecture: Architecture, dest: &Path) -> Result<(), SourceError> {
        let scratch = scratch_dir(dest);
        fs::create_dir_all(&scratch).map_err(|e| ResourceError::io("create", &scratch, e))?;

        let result = self.fetch_into(architecture, &scratch, dest);
        if let Err(e) = fs::remove_dir_all(&scratch) {
            tracing::debug!("cannot remove {}: {e}", scratch.display());
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <a href="/downloads/ReShade_Setup_6.3.3_Addon.exe">Download with add-on support</a>
        <a href="/downloads/ReShade_Setup_6.3.3.exe">Download</a>
    "#;

    #[test]
    fn parses_plain_version() {
        assert_eq!(parse_latest_version(PAGE, false), Some("6.3.3".to_string()));
    }

    #[test]
    fn parses_addon_version_with_suffix() {
        assert_eq!(
            parse_latest_version(PAGE, true),
            Some("6.3.3_Addon".to_string())
        );
    }

    #[test]
    fn plain_lookup_ignores_addon_builds() {
        let page = r#"<a href="/downloads/ReShade_Setup_6.0.0_Addon.exe">"#;
        assert_eq!(parse_latest_version(page, false), None);
    }

    #[test]
    fn empty_or_malformed_page_has_no_version() {
        assert_eq!(parse_latest_version("", false), None);
        assert_eq!(
            parse_latest_version("/downloads/ReShade_Setup_.exe", false),
            None
        );
        assert_eq!(
            parse_latest_version("/downloads/ReShade_Setup_6.1", false),
            None
        );
    }

    #[test]
    fn compiler_url_matches_architecture() {
        assert!(compiler_archive_url(Architecture::X86).contains("/win32/"));
        assert!(compiler_archive_url(Architecture::X64).contains("/win64/"));
    }

    #[test]
    fn sha256_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            compute_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
