use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum PlaylistError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("Out of memory while growing the playlist")]
    OutOfMemory,
    #[error("Playlist {0} not found")]
    FileNotFound(PathBuf),
    #[error("Unable to read playlist: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum LogoError {
    /// The entry declares no logo
    #[error("No logo url")]
    NotFound,
    #[error("Logo cache {path:?} unavailable: {source}")]
    CacheUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Download of {url} failed: {reason}")]
    Network { url: String, reason: String },
    #[error("Unable to read cached logo: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ThumbnailError {
    #[error("Empty image data")]
    Empty,
    #[error("Unable to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Logo(#[from] LogoError),
}
