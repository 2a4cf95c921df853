//! Whole-word identifier rewriting across source files.

use std::path::{Path, PathBuf};

use regex::{NoExpand, Regex, RegexBuilder};

use crate::error::{Error, Result};
use crate::indexer::strip_comments;
use crate::unit::Language;

/// Rewrite of one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: String,
    /// Match regardless of case, as VHDL identifiers do.
    pub case_insensitive: bool,
}

impl Rename {
    pub fn new(from: &str, to: &str, case_insensitive: bool) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            case_insensitive,
        }
    }

    fn pattern(word: &str, case_insensitive: bool) -> Result<Regex> {
        Ok(RegexBuilder::new(&format!(r"\b{}\b", regex::escape(word)))
            .case_insensitive(case_insensitive)
            .build()?)
    }
}

/// Apply every rename to every file, replacing whole words only.
///
/// Fails with [`Error::NameCollision`] before touching anything when a target
/// identifier already occurs in the code of one of the files. Mentions in
/// comments do not count. Returns how many files changed.
pub fn rename_identifiers(renames: &[Rename], files: &[PathBuf]) -> Result<usize> {
    let compiled = renames
        .iter()
        .map(|r| {
            Ok((
                r,
                Rename::pattern(&r.from, r.case_insensitive)?,
                Rename::pattern(&r.to, r.case_insensitive)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut contents = Vec::with_capacity(files.len());
    for file in files {
        let text = yard_fs::io::read_text(file)?;
        let code = match Language::from_path(file) {
            Some(language) => strip_comments(&text, language),
            None => text.clone(),
        };
        for (rename, _, target) in &compiled {
            if target.is_match(&code) {
                tracing::error!(file = %file.display(), from = %rename.from, to = %rename.to, "rename target already present");
                return Err(Error::NameCollision {
                    from: rename.from.clone(),
                    to: rename.to.clone(),
                });
            }
        }
        contents.push((file, text));
    }

    let mut changed = 0;
    for (file, text) in contents {
        let mut updated = text.clone();
        for (rename, source, _) in &compiled {
            updated = source
                .replace_all(&updated, NoExpand(&rename.to))
                .into_owned();
        }
        if updated != text {
            write_back(file, &updated)?;
            changed += 1;
        }
    }
    tracing::debug!(renames = renames.len(), files = files.len(), changed, "renamed identifiers");
    Ok(changed)
}

fn write_back(file: &Path, text: &str) -> Result<()> {
    yard_fs::io::write_text(file, text)?;
    Ok(())
}
