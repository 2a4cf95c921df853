//! Recursive installation of a block's dependencies.

use std::collections::BTreeSet;

use crate::block::Level;
use crate::cache::InstallationCache;
use crate::error::{Error, Result};
use crate::indexer::SourceIndexer;
use crate::inventory::Inventory;
use crate::title::{Requirement, Title};

/// What happened to one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Installed(Requirement),
    Skipped { requirement: Requirement, reason: String },
}

/// Walks `derives` lists and installs everything they name, leaves first.
pub struct DependencyResolver<'a> {
    inventory: &'a mut Inventory,
    cache: &'a InstallationCache,
    indexer: &'a dyn SourceIndexer,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        inventory: &'a mut Inventory,
        cache: &'a InstallationCache,
        indexer: &'a dyn SourceIndexer,
    ) -> Self {
        Self {
            inventory,
            cache,
            indexer,
        }
    }

    /// Install every requirement not yet in `tracking`, dependencies first.
    ///
    /// `tracking` holds [`Requirement::tracking_key`]s; each key is handled
    /// at most once per walk, so shared dependencies install once and cycles
    /// terminate. A requirement that cannot be located or installed is
    /// logged and skipped.
    pub fn install_requirements(
        &mut self,
        requirements: &[Requirement],
        tracking: &mut BTreeSet<String>,
    ) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        for req in requirements {
            if !tracking.insert(req.tracking_key()) {
                continue;
            }
            match self.install_one(req, tracking, &mut outcomes) {
                Ok(()) => outcomes.push(Outcome::Installed(req.clone())),
                Err(e) => {
                    tracing::error!(requirement = %req, error = %e, "skipping dependency");
                    outcomes.push(Outcome::Skipped {
                        requirement: req.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        outcomes
    }

    /// Install one requirement and everything it depends on.
    ///
    /// Unlike nested dependencies, a failure of the requirement itself is
    /// returned as an error. The outcomes of its dependencies come first.
    pub fn install(&mut self, requirement: &Requirement) -> Result<Vec<Outcome>> {
        let mut tracking = BTreeSet::new();
        tracking.insert(requirement.tracking_key());
        let mut outcomes = Vec::new();
        self.install_one(requirement, &mut tracking, &mut outcomes)?;
        outcomes.push(Outcome::Installed(requirement.clone()));
        Ok(outcomes)
    }

    /// Install the dependencies of a known block, not the block itself.
    pub fn install_for(&mut self, title: &Title) -> Result<Vec<Outcome>> {
        let block = self
            .inventory
            .preferred(title)
            .ok_or_else(|| Error::BlockNotFound {
                title: title.to_string(),
            })?;
        let requirements = block.requirements();
        let mut tracking = BTreeSet::new();
        tracking.insert(Requirement::latest(block.title().clone()).tracking_key());
        Ok(self.install_requirements(&requirements, &mut tracking))
    }

    fn install_one(
        &mut self,
        req: &Requirement,
        tracking: &mut BTreeSet<String>,
        outcomes: &mut Vec<Outcome>,
    ) -> Result<()> {
        let Some(known) = self.inventory.find(&req.title) else {
            return Err(Error::BlockNotFound {
                title: req.title.to_string(),
            });
        };
        let source = [Level::Install, Level::Download, Level::Available]
            .iter()
            .find_map(|level| known.get(level))
            .ok_or_else(|| Error::BlockNotFound {
                title: req.title.to_string(),
            })?;
        let nested = source.requirements();
        let title = source.title().clone();

        let deeper = self.install_requirements(&nested, tracking);
        outcomes.extend(deeper);

        if self.inventory.get(&title, Level::Install).is_none() {
            let source = [Level::Download, Level::Available]
                .iter()
                .find_map(|level| self.inventory.get(&title, level.clone()))
                .ok_or_else(|| Error::BlockNotFound {
                    title: title.to_string(),
                })?;
            let base = self.cache.install_latest(source)?;
            self.inventory.add(base);
        }

        let base = self
            .inventory
            .get(&title, Level::Install)
            .ok_or_else(|| Error::BlockNotFound {
                title: title.to_string(),
            })?;
        let version = req.version.clone().unwrap_or_else(|| base.version().clone());
        self.cache.install_version(base, &version, self.indexer)?;
        self.inventory.invalidate_pinned(&title);
        tracing::info!(requirement = %req, version = %version, "dependency ready");
        Ok(())
    }
}
