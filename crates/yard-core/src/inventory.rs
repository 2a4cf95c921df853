//! Every block known to a command, by identity and level.

use std::collections::BTreeMap;
use std::path::Path;

use crate::block::{Block, Level};
use crate::cache::InstallationCache;
use crate::chooser::Chooser;
use crate::error::{Error, Result};
use crate::market::DirectoryMarket;
use crate::metadata;
use crate::title::{Title, TitleKey};
use crate::version::Pin;

/// Directories skipped while searching a workspace for blocks.
const SKIPPED_DIRS: [&str; 3] = [".git", "target", "node_modules"];

/// How deep below the workspace root blocks are searched for.
const WORKSPACE_DEPTH: usize = 4;

/// The blocks of one identity, one per level.
pub type Slots = BTreeMap<Level, Block>;

/// Snapshots of one installed block, built on first access.
#[derive(Debug, Default)]
struct PinnedSnapshots {
    loaded: Option<BTreeMap<Pin, Block>>,
}

/// Registry of known blocks.
///
/// Download, Install and Available blocks live in per-identity slots.
/// Pinned snapshots are read from the cache the first time they are asked
/// for and kept until invalidated.
#[derive(Debug, Default)]
pub struct Inventory {
    blocks: BTreeMap<TitleKey, Slots>,
    pinned: BTreeMap<TitleKey, PinnedSnapshots>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the workspace, the cache and linked markets.
    pub fn discover(
        workspace: &Path,
        cache: &InstallationCache,
        markets: &[DirectoryMarket],
    ) -> Result<Self> {
        let mut inventory = Self::new();

        let mut found = Vec::new();
        find_blocks(workspace, WORKSPACE_DEPTH, &mut found)?;
        for path in found {
            inventory.add_path(&path, Level::Download);
        }

        for path in installed_bases(cache.root())? {
            inventory.add_path(&path, Level::Install);
        }

        for market in markets {
            for path in market.entries()? {
                inventory.add_path(&path, Level::Available);
            }
        }

        tracing::debug!(blocks = inventory.blocks.len(), "inventory discovered");
        Ok(inventory)
    }

    fn add_path(&mut self, path: &Path, level: Level) {
        match Block::open(path, level.clone()) {
            Ok(block) => {
                self.add(block);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), level = %level, error = %e, "skipping unreadable block");
            }
        }
    }

    /// Insert a block into its slot. Returns whether it was inserted.
    ///
    /// An occupied slot keeps its block; the newcomer is dropped with an
    /// error log. Pinned snapshots join an already loaded snapshot map and
    /// are otherwise picked up when the map is first built.
    pub fn add(&mut self, block: Block) -> bool {
        let key = block.title().key();
        match block.level().clone() {
            Level::Temp => {
                tracing::debug!(block = %block.title(), "not tracking scratch export");
                false
            }
            Level::Pinned(pin) => match self.pinned.entry(key).or_default().loaded.as_mut() {
                Some(map) => {
                    map.insert(pin, block);
                    true
                }
                None => false,
            },
            level => {
                let slots = self.blocks.entry(key).or_default();
                if let Some(existing) = slots.get(&level) {
                    let err = Error::SlotOccupied {
                        title: existing.title().to_string(),
                        level: level.to_string(),
                    };
                    tracing::error!(path = %block.path().display(), error = %err, "duplicate block");
                    return false;
                }
                slots.insert(level, block);
                true
            }
        }
    }

    /// Key of the block a title refers to.
    ///
    /// A title without a market matches a block of any market with the same
    /// library and name; the first in key order wins.
    pub fn resolve(&self, title: &Title) -> Option<TitleKey> {
        let key = title.key();
        if self.blocks.contains_key(&key) {
            return Some(key);
        }
        if title.market().is_some() {
            return None;
        }
        self.blocks
            .keys()
            .find(|(_, library, name)| *library == key.1 && *name == key.2)
            .cloned()
    }

    pub fn find(&self, title: &Title) -> Option<&Slots> {
        self.resolve(title).and_then(|key| self.blocks.get(&key))
    }

    pub fn get(&self, title: &Title, level: Level) -> Option<&Block> {
        self.find(title).and_then(|slots| slots.get(&level))
    }

    pub fn get_mut(&mut self, title: &Title, level: Level) -> Option<&mut Block> {
        let key = self.resolve(title)?;
        self.blocks.get_mut(&key).and_then(|slots| slots.get_mut(&level))
    }

    /// Every tracked identity with its slots, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&TitleKey, &Slots)> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block at the most local level: working copy, then installed, then
    /// market entry.
    pub fn preferred(&self, title: &Title) -> Option<&Block> {
        let slots = self.find(title)?;
        [Level::Download, Level::Install, Level::Available]
            .iter()
            .find_map(|level| slots.get(level))
    }

    /// Snapshots installed for a block, loading them from the cache on first use.
    pub fn pinned(
        &mut self,
        title: &Title,
        cache: &InstallationCache,
    ) -> Result<&BTreeMap<Pin, Block>> {
        let key = self.resolve(title).unwrap_or_else(|| title.key());
        // The cache is laid out by the block's own title, market included.
        let owner = self
            .blocks
            .get(&key)
            .and_then(|slots| slots.values().next())
            .map_or_else(|| title.clone(), |block| block.title().clone());
        let entry = self.pinned.entry(key).or_default();
        if entry.loaded.is_none() {
            let mut map = BTreeMap::new();
            for pin in cache.installed_pins(&owner)? {
                let dir = cache.snapshot_dir(&owner, &pin);
                match Block::open(&dir, Level::Pinned(pin.clone())) {
                    Ok(block) => {
                        map.insert(pin, block);
                    }
                    Err(e) => {
                        tracing::warn!(path = %dir.display(), error = %e, "skipping unreadable snapshot");
                    }
                }
            }
            tracing::trace!(block = %owner, snapshots = map.len(), "loaded snapshots");
            entry.loaded = Some(map);
        }
        Ok(&*entry.loaded.get_or_insert_with(BTreeMap::new))
    }

    /// Forget loaded snapshots so the next access rereads the cache.
    pub fn invalidate_pinned(&mut self, title: &Title) {
        let key = self.resolve(title).unwrap_or_else(|| title.key());
        self.pinned.remove(&key);
    }

    /// Remove the block at `level`.
    ///
    /// When it is the only copy of its identity, `chooser` must confirm the
    /// removal. Sibling slots are left untouched. Returns the removed block,
    /// or `None` if there was none or the removal was declined.
    pub fn remove(
        &mut self,
        title: &Title,
        level: Level,
        chooser: &dyn Chooser,
    ) -> Result<Option<Block>> {
        let Some(key) = self.resolve(title) else {
            return Err(Error::BlockNotFound {
                title: title.to_string(),
            });
        };
        let has_snapshots = self
            .pinned
            .get(&key)
            .and_then(|p| p.loaded.as_ref())
            .is_some_and(|m| !m.is_empty());
        let Some(slots) = self.blocks.get_mut(&key) else {
            return Ok(None);
        };
        if !slots.contains_key(&level) {
            return Ok(None);
        }

        let last_copy = slots.len() == 1 && !has_snapshots;
        if last_copy
            && !chooser.confirm(&format!(
                "{title} exists nowhere else; remove it and lose it for good?"
            ))
        {
            tracing::info!(block = %title, level = %level, "removal declined");
            return Ok(None);
        }

        let removed = slots.remove(&level);
        if slots.is_empty() {
            self.blocks.remove(&key);
        }
        Ok(removed)
    }
}

/// Collect block roots below `dir`. A block's own subdirectories are not searched.
fn find_blocks(dir: &Path, depth: usize, found: &mut Vec<std::path::PathBuf>) -> Result<()> {
    if metadata::has_marker(dir) {
        found.push(dir.to_path_buf());
        return Ok(());
    }
    if depth == 0 || !dir.is_dir() {
        return Ok(());
    }
    let mut children: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy())
                .is_some_and(|n| !n.starts_with('.') && !SKIPPED_DIRS.contains(&n.as_ref()))
        })
        .collect();
    children.sort();
    for child in children {
        find_blocks(&child, depth - 1, found)?;
    }
    Ok(())
}

/// Canonical copies in the cache: `<market>/<library>/<name>/<name>`.
fn installed_bases(root: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut bases = Vec::new();
    if !root.is_dir() {
        return Ok(bases);
    }
    for market in sorted_dirs(root)? {
        for library in sorted_dirs(&market)? {
            for block in sorted_dirs(&library)? {
                if let Some(name) = block.file_name() {
                    let base = block.join(name);
                    if metadata::has_marker(&base) {
                        bases.push(base);
                    }
                }
            }
        }
    }
    Ok(bases)
}

fn sorted_dirs(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut dirs: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}
