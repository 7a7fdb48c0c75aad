use std::path::{Path, PathBuf};
use log::{info, warn};
use crate::api::MetadataSource;
use crate::cache::OwnerCache;
use crate::entry::{EntryDescriptor, VideoInfo};
use crate::error::ConvResult;

/// Owner name used when the video is gone upstream
pub const UNKNOWN_OWNER: &str = "unknown_owner";

/// Turns entry descriptors into `VideoInfo`, resolving uploaders through the
/// owner cache first and the metadata source on a miss.
#[derive(Debug)]
pub struct Resolver<S> {
    cache: OwnerCache,
    source: S,
}

impl<S: MetadataSource> Resolver<S> {
    pub fn new(cache: OwnerCache, source: S) -> Self {
        Self { cache, source }
    }

    pub fn cache(&self) -> &OwnerCache {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_cache(self) -> OwnerCache {
        self.cache
    }

    /// Resolve the item described by the entry file at `entry_path`.
    ///
    /// At most one metadata request is made, and only on a cache miss. Fetch
    /// errors are returned as-is and abort the item.
    pub async fn resolve_entry(&mut self, entry_path: &Path) -> ConvResult<VideoInfo> {
        let entry = EntryDescriptor::parse(entry_path)?;
        let title = entry.display_title();
        info!("convert: {}:{}-{}", title, entry.media_type, entry_path.display());

        let owner_name = self.resolve_owner(&entry).await?;

        Ok(VideoInfo {
            media_type: entry.media_type,
            title,
            owner_name,
            output_path: PathBuf::new(),
        })
    }

    async fn resolve_owner(&mut self, entry: &EntryDescriptor) -> ConvResult<String> {
        if let Some(name) = entry.owner_id.and_then(|id| self.cache.get(id)) {
            info!("owner of {} from cache: {}", entry.avid, name);
            return Ok(name.to_string());
        }

        match self.source.fetch_owner(entry.avid).await? {
            Some(owner) => {
                // The API id is authoritative over the descriptor's hint
                self.cache.update(owner.mid, owner.name.clone());
                Ok(owner.name)
            }
            None => {
                match entry.owner_id {
                    Some(hint) => self.cache.update(hint, UNKNOWN_OWNER),
                    None => warn!(
                        "{} is gone upstream and has no owner id; fallback not cached",
                        entry.avid
                    ),
                }
                Ok(UNKNOWN_OWNER.to_string())
            }
        }
    }
}
