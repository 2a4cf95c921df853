//! The release transaction.
//!
//! Steps that can be undone come first: nothing is tagged until the marker
//! is written and committed, and nothing leaves the machine until the tag
//! exists. Failures after the push are reported but not rolled back.

use std::path::Path;

use crate::block::{Block, Level};
use crate::error::{Error, Result};
use crate::market::{CHANGELOG, Market};
use crate::metadata::MARKER;
use crate::version::{self, Bump, VersionId};

/// How the next version is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextVersion {
    /// A specific version, which must exceed every existing release.
    Explicit(VersionId),
    /// Increment the highest existing release.
    Bump(Bump),
}

/// Parameters of a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub next: NextVersion,
    /// Extra text for the release commit.
    pub message: Option<String>,
    /// Commit only the marker and changelog instead of every pending change.
    pub strict: bool,
    /// Recomputed direct dependencies to record, if the caller computed them.
    pub derives: Option<Vec<String>>,
}

impl ReleaseRequest {
    pub fn new(next: NextVersion) -> Self {
        Self {
            next,
            message: None,
            strict: false,
            derives: None,
        }
    }
}

/// Resolve the version a release would produce given the highest existing one.
pub fn next_version(next: &NextVersion, latest: &VersionId) -> Result<VersionId> {
    match next {
        NextVersion::Explicit(requested) if requested <= latest => Err(Error::VersionNotGreater {
            requested: requested.to_string(),
            latest: latest.to_string(),
        }),
        NextVersion::Explicit(requested) => Ok(requested.clone()),
        NextVersion::Bump(bump) => latest.bump(*bump),
    }
}

impl Block {
    /// Release a working copy and return the new version.
    ///
    /// When the block names a market, `market` must be that market for the
    /// release to be published; otherwise a warning is logged.
    pub fn release(
        &mut self,
        request: &ReleaseRequest,
        market: Option<&dyn Market>,
    ) -> Result<VersionId> {
        self.expect_level(Level::Download)?;
        let title = self.title().clone();

        let repo = self.require_repository()?;
        if !repo.is_up_to_date()? {
            return Err(Error::NotSynchronized {
                title: title.to_string(),
            });
        }

        let mut versions = self.tagged_versions()?;
        let latest = versions.first().cloned().unwrap_or_default();
        let next = next_version(&request.next, &latest)?;
        tracing::info!(block = %title, from = %latest, to = %next, "releasing");

        if let Some(derives) = &request.derives {
            self.metadata_mut().derives = derives.clone();
        }
        self.metadata_mut().version = next.clone();
        self.save()?;

        let repo = self.require_repository()?;
        if request.strict {
            let mut paths = vec![Path::new(MARKER)];
            if self.changelog_path().is_file() {
                paths.push(Path::new(CHANGELOG));
            }
            repo.add(&paths)?;
        } else {
            repo.add_all()?;
        }
        let mut message = format!("Releases version {next}");
        if let Some(extra) = request.message.as_deref().filter(|m| !m.trim().is_empty()) {
            message.push_str("\n\n");
            message.push_str(extra.trim());
        }
        repo.commit(&message)?;
        repo.create_tag(&next.to_tag())?;

        if repo.remote_url()?.is_some() {
            repo.push()?;
        } else {
            tracing::info!(block = %title, "no remote configured, release stays local");
        }

        match (self.metadata().market.as_deref(), market) {
            (None, _) => {}
            (Some(wanted), Some(market)) if market.name().eq_ignore_ascii_case(wanted) => {
                versions.push(next.clone());
                let versions = version::sort_versions(versions);
                let changelog = self.changelog()?;
                if let Err(e) = market.publish(self.metadata(), &versions, changelog.as_deref()) {
                    tracing::error!(block = %title, market = wanted, error = %e, "publish failed after release");
                }
            }
            (Some(wanted), _) => {
                tracing::warn!(block = %title, market = wanted, "market is not linked to this workspace, skipping publish");
            }
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::DirectoryMarket;
    use crate::metadata::Metadata;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;
    use yard_test_utils::TestBlock;

    #[rstest]
    #[case(NextVersion::Bump(Bump::Patch), "v1.2.4")]
    #[case(NextVersion::Bump(Bump::Minor), "v1.3.0")]
    #[case(NextVersion::Bump(Bump::Major), "v2.0.0")]
    #[case(NextVersion::Explicit(VersionId::new(1, 5, 0)), "v1.5.0")]
    fn test_next_version(#[case] next: NextVersion, #[case] expected: &str) {
        let latest = VersionId::new(1, 2, 3);
        assert_eq!(next_version(&next, &latest).unwrap().to_string(), expected);
    }

    #[rstest]
    #[case(VersionId::new(1, 2, 3))]
    #[case(VersionId::new(1, 0, 0))]
    fn test_explicit_version_must_exceed_latest(#[case] requested: VersionId) {
        let err = next_version(&NextVersion::Explicit(requested), &VersionId::new(1, 2, 3)).unwrap_err();
        assert!(matches!(err, Error::VersionNotGreater { .. }));
    }

    #[test]
    fn test_bump_past_maximum_is_rejected() {
        let latest = VersionId::new(1, 2, u64::MAX);
        let err = next_version(&NextVersion::Bump(Bump::Patch), &latest).unwrap_err();
        assert!(matches!(err, Error::InvalidVersion { .. }));
    }

    #[test]
    fn test_release_patch_tags_and_commits() {
        let temp = TempDir::new().unwrap();
        let fixture = TestBlock::create(temp.path(), "math", "adder");
        fixture.release("1.2.3");
        let mut block = Block::open(&fixture.path, Level::Download).unwrap();

        let released = block
            .release(&ReleaseRequest::new(NextVersion::Bump(Bump::Patch)), None)
            .unwrap();

        assert_eq!(released, VersionId::new(1, 2, 4));
        assert_eq!(block.highest_version().unwrap(), Some(released.clone()));
        let (meta, _) = Metadata::read(&fixture.path).unwrap();
        assert_eq!(meta.version, released);
        block.verify_release(&released).unwrap();
    }

    #[test]
    fn test_first_release_from_unreleased() {
        let temp = TempDir::new().unwrap();
        let fixture = TestBlock::create(temp.path(), "math", "adder");
        let mut block = Block::open(&fixture.path, Level::Download).unwrap();

        let released = block
            .release(&ReleaseRequest::new(NextVersion::Bump(Bump::Minor)), None)
            .unwrap();

        assert_eq!(released, VersionId::new(0, 1, 0));
    }

    #[test]
    fn test_strict_release_leaves_other_changes_uncommitted() {
        let temp = TempDir::new().unwrap();
        let fixture = TestBlock::create(temp.path(), "math", "adder");
        fixture.write_source("CHANGELOG.md", "# 1.0.0\n");
        fixture.write_source("wip.vhd", "-- not ready\n");
        let mut block = Block::open(&fixture.path, Level::Download).unwrap();
        let mut request = ReleaseRequest::new(NextVersion::Explicit(VersionId::new(1, 0, 0)));
        request.strict = true;

        block.release(&request, None).unwrap();

        let mut options = git2::StatusOptions::new();
        options.include_untracked(true);
        let statuses = fixture.repo().statuses(Some(&mut options)).unwrap();
        let pending: Vec<_> = statuses.iter().filter_map(|s| s.path().ok().map(str::to_string)).collect();
        assert_eq!(pending, vec!["wip.vhd".to_string()]);
    }

    #[test]
    fn test_release_refused_when_behind_remote() {
        let temp = TempDir::new().unwrap();
        let fixture = TestBlock::create(temp.path(), "math", "adder");
        let remote = temp.path().join("adder.git");
        yard_test_utils::bare_remote(&remote);
        let url = remote.to_str().unwrap();
        yard_test_utils::add_origin(fixture.repo(), url);
        let mut block = Block::open(&fixture.path, Level::Download).unwrap();
        block.require_repository().unwrap().push().unwrap();

        // Another clone pushes a commit the working copy has not seen.
        let other = temp.path().join("other");
        let clone = git2::Repository::clone(url, &other).unwrap();
        std::fs::write(other.join("extra.vhd"), "-- upstream\n").unwrap();
        yard_test_utils::commit_all(&clone, "Upstream change");
        let mut origin = clone.find_remote("origin").unwrap();
        let head = clone.head().unwrap();
        let refspec = format!("{0}:{0}", head.name().unwrap());
        origin.push(&[refspec.as_str()], None).unwrap();

        let before = Metadata::read(&fixture.path).unwrap().0;
        let err = block
            .release(&ReleaseRequest::new(NextVersion::Bump(Bump::Patch)), None)
            .unwrap_err();

        assert!(matches!(err, Error::NotSynchronized { .. }));
        assert_eq!(Metadata::read(&fixture.path).unwrap().0, before);
        assert!(block.tagged_versions().unwrap().is_empty());
    }

    #[test]
    fn test_release_publishes_to_linked_market() {
        let temp = TempDir::new().unwrap();
        let fixture = TestBlock::create(temp.path(), "math", "adder");
        fixture.release("1.0.0");
        let market = DirectoryMarket::new("open", temp.path().join("market"));
        let mut block = Block::open(&fixture.path, Level::Download).unwrap();
        block.bind_market(Some("open")).unwrap();

        block
            .release(&ReleaseRequest::new(NextVersion::Bump(Bump::Minor)), Some(&market))
            .unwrap();

        assert_eq!(
            market.versions("math", "adder").unwrap(),
            vec![VersionId::new(1, 1, 0), VersionId::new(1, 0, 0)]
        );
    }

    #[test]
    fn test_release_with_unlinked_market_still_succeeds() {
        let temp = TempDir::new().unwrap();
        let fixture = TestBlock::create(temp.path(), "math", "adder");
        let mut block = Block::open(&fixture.path, Level::Download).unwrap();
        block.bind_market(Some("elsewhere")).unwrap();

        let released = block
            .release(&ReleaseRequest::new(NextVersion::Bump(Bump::Major)), None)
            .unwrap();

        assert_eq!(released, VersionId::new(1, 0, 0));
    }
}
