//! Release command implementation

use colored::Colorize;
use yard_core::version::Arity;
use yard_core::{Bump, Context, NextVersion, ReleaseRequest, VersionId};

use crate::commands::target_title;
use crate::error::{CliError, Result};

/// Turn the release flags into the next-version choice.
///
/// Clap guarantees exactly one of them is set.
pub fn next_from_flags(
    version: Option<&str>,
    major: bool,
    minor: bool,
    patch: bool,
) -> Result<NextVersion> {
    if let Some(text) = version {
        if !VersionId::validate(text, &[Arity::Full]) {
            return Err(CliError::user(format!("'{text}' is not a version like v1.2.3")));
        }
        return Ok(NextVersion::Explicit(VersionId::parse(text)));
    }
    let bump = match (major, minor, patch) {
        (true, _, _) => Bump::Major,
        (_, true, _) => Bump::Minor,
        (_, _, true) => Bump::Patch,
        _ => return Err(CliError::user("choose a version or one of --major, --minor, --patch")),
    };
    Ok(NextVersion::Bump(bump))
}

/// Run the release command on the block in the current directory
pub fn run_release(
    ctx: &mut Context,
    next: NextVersion,
    strict: bool,
    message: Option<String>,
) -> Result<()> {
    let title = target_title(ctx, None)?;
    let mut request = ReleaseRequest::new(next);
    request.strict = strict;
    request.message = message;

    let version = ctx.release(&title, request)?;
    println!(
        "{} Released {} {}",
        "OK".green().bold(),
        title.to_string().cyan(),
        version.to_string().green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_version_wins() {
        let next = next_from_flags(Some("v2.0.0"), false, false, false).unwrap();
        assert_eq!(next, NextVersion::Explicit(VersionId::new(2, 0, 0)));
    }

    #[test]
    fn bump_flags() {
        assert_eq!(
            next_from_flags(None, false, true, false).unwrap(),
            NextVersion::Bump(Bump::Minor)
        );
        assert_eq!(
            next_from_flags(None, false, false, true).unwrap(),
            NextVersion::Bump(Bump::Patch)
        );
    }

    #[test]
    fn malformed_version_is_rejected() {
        assert!(next_from_flags(Some("2.0"), false, false, false).is_err());
    }
}
