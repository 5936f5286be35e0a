use std::fmt;

use crate::error::PlaylistError;
use crate::thumbnail::Thumbnail;

/// A single channel. Strings are owned copies and never change after creation.
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    url: String,
    name: String,
    logo_url: String,
    pub(crate) thumbnail: Option<Thumbnail>,
}

impl PlaylistEntry {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Empty when the directive declared no `tvg-logo`
    pub fn logo_url(&self) -> &str {
        &self.logo_url
    }

    /// The decoded logo, if it has been requested and succeeded already
    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnail.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistGroup {
    name: String,
    entries: Vec<PlaylistEntry>,
}

impl PlaylistGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn entry_mut(&mut self, index: usize) -> Option<&mut PlaylistEntry> {
        self.entries.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, name: &str, logo_url: &str, url: &str) -> Result<&mut PlaylistEntry, PlaylistError> {
        self.entries
            .try_reserve(1)
            .map_err(|_| PlaylistError::OutOfMemory)?;
        self.entries.push(PlaylistEntry {
            url: url.to_owned(),
            name: name.to_owned(),
            logo_url: logo_url.to_owned(),
            thumbnail: None,
        });
        let last = self.entries.len() - 1;
        Ok(&mut self.entries[last])
    }
}

/// Channel groups in first-seen order. Group names are unique (case-sensitive).
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    groups: Vec<PlaylistGroup>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[PlaylistGroup] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&PlaylistGroup> {
        self.groups.get(index)
    }

    pub fn group_mut(&mut self, index: usize) -> Option<&mut PlaylistGroup> {
        self.groups.get_mut(index)
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(PlaylistGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }

    pub fn find_group(&self, name: &str) -> Option<&PlaylistGroup> {
        self.position(name).map(|i| &self.groups[i])
    }

    pub fn get_or_create_group(&mut self, name: &str) -> Result<&mut PlaylistGroup, PlaylistError> {
        let index = match self.position(name) {
            Some(i) => i,
            None => {
                self.groups
                    .try_reserve(1)
                    .map_err(|_| PlaylistError::OutOfMemory)?;
                self.groups.push(PlaylistGroup {
                    name: name.to_owned(),
                    entries: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        Ok(&mut self.groups[index])
    }

    pub fn add_entry(
        &mut self,
        group_name: &str,
        name: &str,
        logo_url: &str,
        url: &str,
    ) -> Result<&mut PlaylistEntry, PlaylistError> {
        if url.is_empty() {
            return Err(PlaylistError::InvalidArgument("entry url is empty"));
        }
        self.get_or_create_group(group_name)?.push(name, logo_url, url)
    }

    /// Drops every group, entry and cached thumbnail.
    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.groups {
            write!(f, "\n\n{}:\n", group.name)?;
            for entry in &group.entries {
                writeln!(f, "Name: {}", entry.name)?;
                writeln!(f, "Logo: {}", entry.logo_url)?;
                writeln!(f, "Url: {}", entry.url)?;
            }
        }
        Ok(())
    }
}
