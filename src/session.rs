use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{LogoError, PlaylistError, ThumbnailError};
use crate::logo::LogoCache;
use crate::playlist::{Playlist, PlaylistEntry};
use crate::thumbnail::{get_thumbnail, Thumbnail};

/// What a caller has to do to show a channel's thumbnail.
#[derive(Debug)]
pub enum ThumbnailLookup {
    /// Already decoded and memoised on the entry.
    Ready(Thumbnail),
    /// Nothing to fetch: no logo declared, or thumbnails are disabled.
    Placeholder,
    /// Needs `thumbnail::load_thumbnail` on this url, then `store_thumbnail`.
    Fetch(String),
}

/// Everything the presentation layer works on: the playlist, the logo cache
/// and what the user has selected.
pub struct Session {
    playlist: Playlist,
    logos: Arc<LogoCache>,
    selected_group: usize,
    selected_channel: Option<usize>,
    thumbnails_disabled: bool,
}

impl Session {
    pub fn new(playlist: Playlist, logos: LogoCache) -> Self {
        Self {
            playlist,
            logos: Arc::new(logos),
            selected_group: 0,
            selected_channel: None,
            thumbnails_disabled: false,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn logos(&self) -> Arc<LogoCache> {
        Arc::clone(&self.logos)
    }

    pub fn thumbnails_disabled(&self) -> bool {
        self.thumbnails_disabled
    }

    pub fn entry(&self, group: usize, channel: usize) -> Option<&PlaylistEntry> {
        self.playlist.group(group)?.entries().get(channel)
    }

    pub fn select(&mut self, group: usize, channel: usize) -> Result<&PlaylistEntry, PlaylistError> {
        if self.playlist.group(group).is_none() {
            return Err(PlaylistError::InvalidArgument("group index out of range"));
        }
        if self.entry(group, channel).is_none() {
            return Err(PlaylistError::InvalidArgument("channel index out of range"));
        }
        self.selected_group = group;
        self.selected_channel = Some(channel);
        self.entry(group, channel)
            .ok_or(PlaylistError::InvalidArgument("channel index out of range"))
    }

    pub fn selected(&self) -> Option<&PlaylistEntry> {
        self.entry(self.selected_group, self.selected_channel?)
    }

    /// `None` means "show the placeholder". Only a missing cache directory
    /// stops later attempts, every other failure is retried on the next call.
    pub fn thumbnail(&mut self, group: usize, channel: usize) -> Option<Thumbnail> {
        if self.thumbnails_disabled {
            return None;
        }
        let entry = self.playlist.group_mut(group)?.entry_mut(channel)?;
        match get_thumbnail(entry, &self.logos) {
            Ok(thumbnail) => Some(thumbnail.clone()),
            Err(e) => self.thumbnail_failed(group, channel, e),
        }
    }

    /// First half of a thumbnail request made without holding the session
    /// across network I/O. `None` means the channel does not exist.
    pub fn lookup_thumbnail(&self, group: usize, channel: usize) -> Option<ThumbnailLookup> {
        let entry = self.entry(group, channel)?;
        if self.thumbnails_disabled || entry.logo_url().is_empty() {
            return Some(ThumbnailLookup::Placeholder);
        }
        Some(match entry.thumbnail() {
            Some(thumbnail) => {
                debug!("Thumbnail for {} served from memory", entry.name());
                ThumbnailLookup::Ready(thumbnail.clone())
            }
            None => ThumbnailLookup::Fetch(entry.logo_url().to_string()),
        })
    }

    /// Second half of a thumbnail request: memoises a decoded thumbnail on
    /// the entry, or records the failure the same way `thumbnail` does.
    pub fn store_thumbnail(
        &mut self,
        group: usize,
        channel: usize,
        result: Result<Thumbnail, ThumbnailError>,
    ) -> Option<Thumbnail> {
        match result {
            Ok(thumbnail) => {
                let entry = self.playlist.group_mut(group)?.entry_mut(channel)?;
                Some(entry.thumbnail.get_or_insert(thumbnail).clone())
            }
            Err(e) => self.thumbnail_failed(group, channel, e),
        }
    }

    fn thumbnail_failed(&mut self, group: usize, channel: usize, e: ThumbnailError) -> Option<Thumbnail> {
        match e {
            ThumbnailError::Logo(LogoError::NotFound) => None,
            ThumbnailError::Logo(e @ LogoError::CacheUnavailable { .. }) => {
                warn!("{}. Thumbnails disabled for this session.", e);
                self.thumbnails_disabled = true;
                None
            }
            e => {
                info!("No thumbnail for group={} channel={}: {}", group, channel, e);
                None
            }
        }
    }
}
