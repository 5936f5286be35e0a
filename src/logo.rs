use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::LogoError;
use crate::metrics::{LOGO_CACHE_HITS, LOGO_DOWNLOADS, LOGO_DOWNLOAD_FAILURES};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:81.0) Gecko/20100101 Firefox/81.0";

/// Keeps `cache/<key>` well under PATH_MAX and the 255 byte name limit.
pub const MAX_CACHE_KEY_LEN: usize = 93;

/// Maps a logo url to its cache file name: every char that is not an ASCII
/// letter or digit becomes one `-` (so `ü` gives a single `-`), then the
/// result is cut to `MAX_CACHE_KEY_LEN` chars.
///
/// This is lossy. Urls that differ only in punctuation, or only after the
/// first 93 characters, share one cache file.
pub fn cache_key(url: &str) -> String {
    url.chars()
        .take(MAX_CACHE_KEY_LEN)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Moves a resource into a writer. Implemented over HTTP for real use.
pub trait Transport: Send + Sync {
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, String>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Must be called outside of an async runtime.
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, String> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        resp.copy_to(sink).map_err(|e| e.to_string())
    }
}

/// On-disk logo store: one raw file per cache key, no metadata.
/// Fetches are serialized so two callers never write the same cache file.
pub struct LogoCache {
    dir: PathBuf,
    transport: Box<dyn Transport>,
    io_lock: Mutex<()>,
}

impl LogoCache {
    pub fn new(dir: impl Into<PathBuf>, transport: Box<dyn Transport>) -> Self {
        Self {
            dir: dir.into(),
            transport,
            io_lock: Mutex::new(()),
        }
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(cache_key(url))
    }

    pub fn is_cached(&self, url: &str) -> bool {
        !url.is_empty() && self.path_for(url).is_file()
    }

    fn ensure_dir(&self) -> Result<(), LogoError> {
        if self.dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).map_err(|source| LogoError::CacheUnavailable {
            path: self.dir.clone(),
            source,
        })?;
        info!("Created logo cache directory {}", self.dir.display());
        Ok(())
    }

    /// Returns the logo bytes, downloading them into the cache on a miss.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, LogoError> {
        if url.is_empty() {
            return Err(LogoError::NotFound);
        }
        let _guard = self.io_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_dir()?;

        let path = self.path_for(url);
        if path.is_file() {
            match fs::read(&path) {
                Ok(bytes) => {
                    LOGO_CACHE_HITS.inc();
                    debug!("Logo cache hit: {}", path.display());
                    return Ok(bytes);
                }
                Err(e) => warn!("Failed to open cached logo {}: {}. Downloading again.", path.display(), e),
            }
        }

        self.download(url, &path)?;
        Ok(fs::read(&path)?)
    }

    fn download(&self, url: &str, path: &Path) -> Result<(), LogoError> {
        let mut file = File::create(path).map_err(|source| LogoError::CacheUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        let result = self
            .transport
            .download(url, &mut file)
            .and_then(|n| file.flush().map(|_| n).map_err(|e| e.to_string()));
        drop(file);

        match result {
            Ok(n) => {
                LOGO_DOWNLOADS.inc();
                info!("Downloaded logo {} ({} bytes) to {}", url, n, path.display());
                Ok(())
            }
            Err(reason) => {
                LOGO_DOWNLOAD_FAILURES.inc();
                warn!("Failed to download logo {} to {}: {}", url, path.display(), reason);
                let _ = fs::remove_file(path);
                Err(LogoError::Network {
                    url: url.to_string(),
                    reason,
                })
            }
        }
    }
}
