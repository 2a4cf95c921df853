//! Dependency resolution against real repositories in a scratch workspace

use std::collections::BTreeSet;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use yard_core::{
    DeclarationScanner, DependencyResolver, Error, InstallationCache, Inventory, Level, Outcome,
    Pin, Requirement, Title, VersionId,
};
use yard_test_utils::TestBlock;

fn entity(name: &str) -> String {
    format!("entity {name} is\n  port (x : in bit);\nend entity;\n")
}

/// Create a released block under the workspace.
fn released(ws: &Path, name: &str, derives: &[&str], versions: &[&str]) -> TestBlock {
    let mut block = TestBlock::create(ws, "math", name);
    block.write_source(&format!("{name}.vhd"), &entity(name));
    block.set_derives(derives);
    for v in versions {
        block.release(v);
    }
    block
}

struct Workspace {
    temp: TempDir,
    cache: InstallationCache,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let cache = InstallationCache::new(temp.path().join("cache"));
        Self { temp, cache }
    }

    fn dir(&self) -> std::path::PathBuf {
        self.temp.path().join("ws")
    }

    fn inventory(&self) -> Inventory {
        Inventory::discover(&self.dir(), &self.cache, &[]).unwrap()
    }
}

fn installed(outcomes: &[Outcome]) -> Vec<String> {
    outcomes
        .iter()
        .filter_map(|o| match o {
            Outcome::Installed(req) => Some(req.to_string()),
            Outcome::Skipped { .. } => None,
        })
        .collect()
}

fn title(text: &str) -> Title {
    Title::parse(text).unwrap()
}

#[test]
fn test_diamond_installs_shared_dependency_once() {
    let ws = Workspace::new();
    released(&ws.dir(), "d", &[], &["1.0.0"]);
    released(&ws.dir(), "b", &["math.d"], &["1.0.0"]);
    released(&ws.dir(), "c", &["math.d"], &["1.0.0"]);
    released(&ws.dir(), "a", &["math.b", "math.c"], &["1.0.0"]);
    let mut inventory = ws.inventory();
    let indexer = DeclarationScanner::new().unwrap();

    let outcomes = DependencyResolver::new(&mut inventory, &ws.cache, &indexer)
        .install(&Requirement::latest(title("math.a")))
        .unwrap();

    assert_eq!(installed(&outcomes), vec!["math.d", "math.b", "math.c", "math.a"]);
    assert_eq!(
        ws.cache.installed_pins(&title("math.d")).unwrap(),
        vec![Pin::Exact(VersionId::new(1, 0, 0)), Pin::Major(1)]
    );
    for name in ["math.a", "math.b", "math.c", "math.d"] {
        assert!(inventory.get(&title(name), Level::Install).is_some(), "{name}");
    }
}

#[test]
fn test_two_versions_of_one_dependency_coexist() {
    let ws = Workspace::new();
    released(&ws.dir(), "d", &[], &["1.0.0", "1.1.0"]);
    released(&ws.dir(), "e", &["math.d(v1.0.0)"], &["1.0.0"]);
    released(&ws.dir(), "f", &["math.d(v1.1.0)"], &["1.0.0"]);
    let mut inventory = ws.inventory();
    let indexer = DeclarationScanner::new().unwrap();
    let requirements = vec![
        Requirement::latest(title("math.e")),
        Requirement::latest(title("math.f")),
    ];

    let outcomes = DependencyResolver::new(&mut inventory, &ws.cache, &indexer)
        .install_requirements(&requirements, &mut BTreeSet::new());

    assert_eq!(
        installed(&outcomes),
        vec!["math.d(v1.0.0)", "math.e", "math.d(v1.1.0)", "math.f"]
    );
    let d = title("math.d");
    assert!(ws.cache.is_installed(&d));
    assert_eq!(
        ws.cache.installed_pins(&d).unwrap(),
        vec![
            Pin::Exact(VersionId::new(1, 0, 0)),
            Pin::Exact(VersionId::new(1, 1, 0)),
            Pin::Major(1),
        ]
    );
    let older = ws.cache.snapshot_dir(&d, &Pin::Exact(VersionId::new(1, 0, 0)));
    let text = std::fs::read_to_string(older.join("d.vhd")).unwrap();
    assert!(text.contains("entity d_v1_0_0 is"));
}

#[test]
fn test_unknown_dependency_is_skipped() {
    let ws = Workspace::new();
    released(&ws.dir(), "d", &[], &["1.0.0"]);
    released(&ws.dir(), "a", &["math.ghost", "math.d"], &["1.0.0"]);
    let mut inventory = ws.inventory();
    let indexer = DeclarationScanner::new().unwrap();

    let outcomes = DependencyResolver::new(&mut inventory, &ws.cache, &indexer)
        .install(&Requirement::latest(title("math.a")))
        .unwrap();

    assert_eq!(installed(&outcomes), vec!["math.d", "math.a"]);
    assert!(outcomes.iter().any(|o| matches!(
        o,
        Outcome::Skipped { requirement, .. } if requirement.to_string() == "math.ghost"
    )));
}

#[test]
fn test_never_released_block_is_rejected() {
    let ws = Workspace::new();
    released(&ws.dir(), "draft", &[], &[]);
    let mut inventory = ws.inventory();
    let indexer = DeclarationScanner::new().unwrap();

    let err = DependencyResolver::new(&mut inventory, &ws.cache, &indexer)
        .install(&Requirement::latest(title("math.draft")))
        .unwrap_err();

    assert!(matches!(err, Error::NoRelease { .. }));
    assert!(!ws.cache.is_installed(&title("math.draft")));
}

#[test]
fn test_dependency_cycle_terminates() {
    let ws = Workspace::new();
    released(&ws.dir(), "p", &["math.q"], &["1.0.0"]);
    released(&ws.dir(), "q", &["math.p"], &["1.0.0"]);
    let mut inventory = ws.inventory();
    let indexer = DeclarationScanner::new().unwrap();

    let outcomes = DependencyResolver::new(&mut inventory, &ws.cache, &indexer)
        .install(&Requirement::latest(title("math.p")))
        .unwrap();

    assert_eq!(installed(&outcomes), vec!["math.q", "math.p"]);
}

#[test]
fn test_reinstall_is_a_noop() {
    let ws = Workspace::new();
    released(&ws.dir(), "d", &[], &["1.0.0"]);
    let indexer = DeclarationScanner::new().unwrap();
    let req = Requirement::parse("math.d(v1.0.0)").unwrap();

    let mut inventory = ws.inventory();
    DependencyResolver::new(&mut inventory, &ws.cache, &indexer)
        .install(&req)
        .unwrap();
    let snapshot = ws.cache.snapshot_dir(&title("math.d"), &Pin::Exact(VersionId::new(1, 0, 0)));
    let before = std::fs::read_to_string(snapshot.join("d.vhd")).unwrap();

    let mut inventory = ws.inventory();
    DependencyResolver::new(&mut inventory, &ws.cache, &indexer)
        .install(&req)
        .unwrap();

    assert_eq!(std::fs::read_to_string(snapshot.join("d.vhd")).unwrap(), before);
    assert_eq!(ws.cache.installed_pins(&title("math.d")).unwrap().len(), 2);
}
