//! Everything one command needs, built once and passed explicitly.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use yard_git::{GitRepository, Repository};

use crate::block::{Block, Level};
use crate::cache::{InstallationCache, UninstallTarget};
use crate::chooser::Chooser;
use crate::config::Settings;
use crate::detect;
use crate::error::{Error, Result};
use crate::graph::UnitGraph;
use crate::indexer::{DeclarationScanner, SourceIndexer};
use crate::inventory::Inventory;
use crate::market::{DirectoryMarket, Market};
use crate::metadata;
use crate::release::ReleaseRequest;
use crate::resolver::{DependencyResolver, Outcome};
use crate::title::{Requirement, Title};
use crate::unit::Unit;
use crate::version::{Pin, VersionId};

/// Branch a working copy cloned from the cache is put on.
const DOWNLOAD_BRANCH: &str = "master";

/// Top-level and testbench picked for a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roles {
    pub top: Option<Unit>,
    pub bench: Option<Unit>,
}

/// Settings, inventory, cache and collaborators for one invocation.
pub struct Context {
    pub settings: Settings,
    pub inventory: Inventory,
    pub cache: InstallationCache,
    pub markets: Vec<DirectoryMarket>,
    chooser: Box<dyn Chooser>,
    indexer: Box<dyn SourceIndexer>,
}

impl Context {
    /// Load settings from `home` and discover every block they point at.
    pub fn load(home: &Path, chooser: Box<dyn Chooser>) -> Result<Self> {
        let settings = Settings::load(home)?;
        let indexer = Box::new(DeclarationScanner::new()?);
        Self::new(settings, chooser, indexer)
    }

    pub fn new(
        settings: Settings,
        chooser: Box<dyn Chooser>,
        indexer: Box<dyn SourceIndexer>,
    ) -> Result<Self> {
        let (workspace, ws) = settings.active()?;
        tracing::debug!(workspace, path = %ws.path.display(), "loading workspace");
        let workspace_dir = ws.path.clone();

        let markets: Vec<DirectoryMarket> = settings
            .active_markets()?
            .into_iter()
            .map(|(name, path)| DirectoryMarket::new(name, path))
            .collect();
        let cache = InstallationCache::new(settings.cache_root());
        let inventory = Inventory::discover(&workspace_dir, &cache, &markets)?;

        Ok(Self {
            settings,
            inventory,
            cache,
            markets,
            chooser,
            indexer,
        })
    }

    pub fn chooser(&self) -> &dyn Chooser {
        self.chooser.as_ref()
    }

    pub fn indexer(&self) -> &dyn SourceIndexer {
        self.indexer.as_ref()
    }

    /// Root of the active workspace.
    pub fn workspace_dir(&self) -> Result<PathBuf> {
        Ok(self.settings.active()?.1.path.clone())
    }

    /// Title of the working copy containing `dir`.
    pub fn block_at(&self, dir: &Path) -> Result<Title> {
        let root = dir
            .ancestors()
            .find(|d| metadata::has_marker(d))
            .ok_or_else(|| Error::BlockNotFound {
                title: dir.display().to_string(),
            })?;
        let block = Block::open(root, Level::Download)?;
        Ok(block.title().clone())
    }

    /// Create a new block in the workspace and track it.
    pub fn init_block(&mut self, title: &Title, remote: Option<&str>) -> Result<PathBuf> {
        let path = self
            .workspace_dir()?
            .join(title.library())
            .join(title.name());
        let block = Block::init(&path, title, remote)?;
        self.inventory.add(block);
        Ok(path)
    }

    /// Clone a known block into the active workspace as a working copy at
    /// `<workspace>/<library>/<name>`.
    ///
    /// The block's recorded remote is cloned when it has one; otherwise the
    /// installed canonical copy is, and the clone is left without an origin.
    pub fn download(&mut self, title: &Title) -> Result<PathBuf> {
        let slots = self.inventory.find(title).ok_or_else(|| Error::BlockNotFound {
            title: title.to_string(),
        })?;
        if let Some(existing) = slots.get(&Level::Download) {
            return Err(Error::AlreadyExists {
                path: existing.path().to_path_buf(),
            });
        }
        let source = slots
            .get(&Level::Install)
            .or_else(|| slots.get(&Level::Available))
            .ok_or_else(|| Error::BlockNotFound {
                title: title.to_string(),
            })?;
        let owner = source.title().clone();
        let (url, from_cache) = match (&source.metadata().remote, source.level()) {
            (Some(remote), _) => (remote.clone(), false),
            (None, Level::Install) => (source.path().to_string_lossy().into_owned(), true),
            (None, _) => {
                return Err(Error::NoRepository {
                    title: owner.to_string(),
                });
            }
        };

        let path = self
            .workspace_dir()?
            .join(owner.library())
            .join(owner.name());
        if path.exists() {
            return Err(Error::AlreadyExists { path });
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let repo = GitRepository::clone_from(&url, &path)?;
        if from_cache {
            repo.set_remote_url(None)?;
            repo.attach_head(DOWNLOAD_BRANCH)?;
        }

        let block = Block::open(&path, Level::Download)?;
        tracing::info!(block = %owner, source = %url, path = %path.display(), "downloaded");
        self.inventory.add(block);
        Ok(path)
    }

    /// Install a block and its dependencies.
    pub fn install(&mut self, requirement: &Requirement) -> Result<Vec<Outcome>> {
        let mut resolver =
            DependencyResolver::new(&mut self.inventory, &self.cache, self.indexer.as_ref());
        resolver.install(requirement)
    }

    /// Install the dependencies of a working copy.
    pub fn install_dependencies(&mut self, title: &Title) -> Result<Vec<Outcome>> {
        let mut resolver =
            DependencyResolver::new(&mut self.inventory, &self.cache, self.indexer.as_ref());
        resolver.install_for(title)
    }

    /// Uninstall installed copies of a block. Returns whether anything was removed.
    pub fn uninstall(&mut self, title: &Title, target: UninstallTarget) -> Result<bool> {
        if self.inventory.get(title, Level::Install).is_none() {
            return Err(Error::NotInstalled {
                title: title.to_string(),
                target: "any version".to_string(),
            });
        }

        if target != UninstallTarget::Everything {
            let removed = match self.inventory.get(title, Level::Install) {
                Some(base) => self.cache.uninstall(
                    base,
                    target,
                    self.indexer.as_ref(),
                    self.chooser.as_ref(),
                )?,
                None => false,
            };
            self.inventory.invalidate_pinned(title);
            return Ok(removed);
        }

        let Some(base) = self
            .inventory
            .remove(title, Level::Install, self.chooser.as_ref())?
        else {
            return Ok(false);
        };
        let removed = self.cache.uninstall(
            &base,
            target,
            self.indexer.as_ref(),
            self.chooser.as_ref(),
        )?;
        self.inventory.invalidate_pinned(title);
        if !removed {
            self.inventory.add(base);
        }
        Ok(removed)
    }

    /// Release a working copy, recording its current direct dependencies.
    pub fn release(&mut self, title: &Title, mut request: ReleaseRequest) -> Result<VersionId> {
        if request.derives.is_none() {
            request.derives = Some(self.compute_derives(title)?);
        }
        let block = self
            .inventory
            .get_mut(title, Level::Download)
            .ok_or_else(|| Error::BlockNotFound {
                title: title.to_string(),
            })?;
        let market = block.metadata().market.as_deref().and_then(|wanted| {
            self.markets
                .iter()
                .find(|m| m.name().eq_ignore_ascii_case(wanted))
        });
        block.release(&request, market.map(|m| m as &dyn Market))
    }

    /// Units of the block a requirement points at, or none if it is unknown.
    fn requirement_units(&mut self, req: &Requirement) -> Result<Option<(Title, Vec<Requirement>, Vec<Unit>)>> {
        if let Some(version) = &req.version {
            let snapshots = self.inventory.pinned(&req.title, &self.cache)?;
            if let Some(block) = snapshots.get(&Pin::Exact(version.clone())) {
                let units = block.units(self.indexer.as_ref())?;
                return Ok(Some((block.title().clone(), block.requirements(), units)));
            }
        }
        match self.inventory.preferred(&req.title) {
            Some(block) => {
                let units = block.units(self.indexer.as_ref())?;
                Ok(Some((block.title().clone(), block.requirements(), units)))
            }
            None => Ok(None),
        }
    }

    /// Graph of a block's units and those of everything it derives.
    pub fn build_graph(&mut self, title: &Title) -> Result<UnitGraph> {
        let block = self
            .inventory
            .preferred(title)
            .ok_or_else(|| Error::BlockNotFound {
                title: title.to_string(),
            })?;
        let mut graph = UnitGraph::new();
        for unit in block.units(self.indexer.as_ref())? {
            graph.add_unit(unit);
        }
        let root_requirements = block.requirements();
        graph.add_block(block.title(), &root_requirements);

        let mut seen = BTreeSet::new();
        seen.insert(Requirement::latest(block.title().clone()).tracking_key());
        let mut pending = root_requirements;
        while let Some(req) = pending.pop() {
            if !seen.insert(req.tracking_key()) {
                continue;
            }
            let Some((owner, requirements, units)) = self.requirement_units(&req)? else {
                tracing::warn!(requirement = %req, "dependency is not known; its units are missing from the graph");
                continue;
            };
            for unit in units {
                graph.add_unit(unit);
            }
            graph.add_block(&owner, &requirements);
            pending.extend(requirements);
        }
        Ok(graph)
    }

    /// Pick and record a block's top-level and testbench.
    pub fn detect_roles(&mut self, title: &Title, graph: &UnitGraph) -> Result<Roles> {
        let block = self
            .inventory
            .get_mut(title, Level::Download)
            .ok_or_else(|| Error::BlockNotFound {
                title: title.to_string(),
            })?;
        let top = detect::identify_top(graph, block, self.chooser.as_ref())?;
        let bench = match &top {
            Some(top) => detect::identify_bench(graph, block, top, self.chooser.as_ref())?,
            None => None,
        };
        Ok(Roles { top, bench })
    }

    /// Direct dependencies of a working copy, found from the units it uses.
    ///
    /// A referenced unit maps to the block that owns it; units from an exact
    /// snapshot map to that pinned version. Existing entries naming blocks
    /// this inventory does not know are kept.
    pub fn compute_derives(&mut self, title: &Title) -> Result<Vec<String>> {
        let block = self
            .inventory
            .get(title, Level::Download)
            .ok_or_else(|| Error::BlockNotFound {
                title: title.to_string(),
            })?;
        let units = block.units(self.indexer.as_ref())?;
        let own = block.title().clone();
        let existing = block.requirements();

        let owners = self.unit_owners(&own)?;
        let mut derived: BTreeMap<String, Requirement> = BTreeMap::new();
        for unit in &units {
            for r in &unit.requires {
                let library = r.library.as_deref().unwrap_or(unit.library());
                if let Some(req) = owners.get(&crate::unit::unit_key(library, &r.name)) {
                    derived.insert(req.tracking_key(), req.clone());
                }
            }
        }
        for req in existing {
            if self.inventory.find(&req.title).is_none() {
                derived.insert(req.tracking_key(), req);
            }
        }
        Ok(derived.values().map(ToString::to_string).collect())
    }

    /// Map from unit key to the requirement naming its owner, for every
    /// block except `exclude`.
    fn unit_owners(&mut self, exclude: &Title) -> Result<BTreeMap<String, Requirement>> {
        let titles: Vec<Title> = self
            .inventory
            .iter()
            .filter_map(|(_, slots)| slots.values().next().map(|b| b.title().clone()))
            .filter(|t| t != exclude)
            .collect();

        let mut owners = BTreeMap::new();
        for title in titles {
            if let Some(block) = self.inventory.preferred(&title) {
                for unit in block.units(self.indexer.as_ref())? {
                    owners.insert(unit.key(), Requirement::latest(title.clone()));
                }
            }
            for (pin, snapshot) in self.inventory.pinned(&title, &self.cache)? {
                if let Pin::Exact(version) = pin {
                    for unit in snapshot.units(self.indexer.as_ref())? {
                        owners.insert(
                            unit.key(),
                            Requirement {
                                title: title.clone(),
                                version: Some(version.clone()),
                            },
                        );
                    }
                }
            }
        }
        Ok(owners)
    }
}
