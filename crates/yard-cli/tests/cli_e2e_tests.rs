//! End-to-end tests for the yard binary.
//!
//! Each test gets its own settings home, workspace and cache under a
//! temporary directory, passed through `YARD_HOME`.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use yard_core::Settings;
use yard_test_utils::TestBlock;

const ADDER: &str = "entity adder is\n  port (a : in bit);\nend entity;\n";
const ALU: &str = "entity alu is\n  port (x : in bit);\nend entity;\n\
    architecture rtl of alu is\nbegin\n  u0 : entity work.adder port map (a => x);\nend architecture;\n";
const ALU_TB: &str = "entity alu_tb is\nend entity;\n\
    architecture sim of alu_tb is\nbegin\n  dut : entity work.alu port map (x => '0');\nend architecture;\n";

struct Env {
    temp: TempDir,
}

impl Env {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(temp.path().join("ws")).unwrap();
        let settings = format!(
            "active_workspace = \"lab\"\ncache_dir = '{}'\n\n[workspaces.lab]\npath = '{}'\n",
            temp.path().join("cache").display(),
            temp.path().join("ws").display(),
        );
        fs::write(home.join("settings.toml"), settings).unwrap();
        Self { temp }
    }

    fn ws(&self) -> PathBuf {
        self.temp.path().join("ws")
    }

    fn cache(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    fn settings(&self) -> Settings {
        Settings::load(&self.temp.path().join("home")).unwrap()
    }

    /// A yard command run from `dir` with this environment's home.
    fn yard(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("yard"));
        cmd.env("YARD_HOME", self.temp.path().join("home"))
            .env_remove("RUST_LOG")
            .current_dir(dir);
        cmd
    }
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_output() {
    let env = Env::new();
    env.yard(&env.ws())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Blockyard"));
}

#[test]
fn test_version_output() {
    let env = Env::new();
    env.yard(&env.ws())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("yard"));
}

#[test]
fn test_completions_bash() {
    let env = Env::new();
    env.yard(&env.ws())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("yard"));
}

// ============================================================================
// Block Commands
// ============================================================================

#[test]
fn test_init_creates_block_in_workspace() {
    let env = Env::new();

    env.yard(&env.ws())
        .args(["init", "math.adder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized block"));

    let marker = env.ws().join("math").join("adder").join("Block.toml");
    assert!(marker.is_file());
    assert!(env.ws().join("math").join("adder").join(".git").is_dir());
}

#[test]
fn test_init_twice_fails() {
    let env = Env::new();
    env.yard(&env.ws()).args(["init", "math.adder"]).assert().success();

    env.yard(&env.ws())
        .args(["init", "math.adder"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_list_json() {
    let env = Env::new();
    let adder = TestBlock::create(&env.ws(), "math", "adder");
    adder.release("1.0.0");

    let output = env
        .yard(&env.ws())
        .args(["list", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["title"], "math.adder");
    assert_eq!(entries[0]["version"], "v1.0.0");
    assert_eq!(entries[0]["levels"][0], "download");
}

#[test]
fn test_release_patch_from_block_directory() {
    let env = Env::new();
    let adder = TestBlock::create(&env.ws(), "math", "adder");
    adder.write_source("adder.vhd", ADDER);

    env.yard(&adder.path)
        .args(["release", "--patch", "-m", "First cut"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v0.0.1"));

    env.yard(&adder.path)
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("v0.0.1"));
}

#[test]
fn test_release_outside_block_fails() {
    let env = Env::new();

    env.yard(&env.ws())
        .args(["release", "--minor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_install_and_uninstall() {
    let env = Env::new();
    let adder = TestBlock::create(&env.ws(), "math", "adder");
    adder.write_source("adder.vhd", ADDER);
    adder.release("1.0.0");
    let block_dir = env.cache().join("_").join("math").join("adder");

    env.yard(&env.ws())
        .args(["install", "math.adder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("math.adder"));
    assert!(block_dir.join("v1.0.0").join("Block.toml").is_file());
    assert!(block_dir.join("v1").join("Block.toml").is_file());

    env.yard(&env.ws())
        .args(["--yes", "uninstall", "math.adder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalled"));
    assert!(!block_dir.exists());
}

#[test]
fn test_uninstall_not_installed_fails() {
    let env = Env::new();
    TestBlock::create(&env.ws(), "math", "adder");

    env.yard(&env.ws())
        .args(["--yes", "uninstall", "math.adder"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_graph_prints_order_and_tree() {
    let env = Env::new();
    let alu = TestBlock::create(&env.ws(), "math", "alu");
    alu.write_source("adder.vhd", ADDER);
    alu.write_source("alu.vhd", ALU);
    alu.write_source("alu_tb.vhd", ALU_TB);

    env.yard(&env.ws())
        .args(["--yes", "graph", "math.alu"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Build order"))
        .stdout(predicate::str::contains("math.alu_tb"))
        .stdout(predicate::str::contains("\\- math.adder"));
}

#[test]
fn test_remote_set_and_show() {
    let env = Env::new();
    let adder = TestBlock::create(&env.ws(), "math", "adder");

    env.yard(&adder.path)
        .args(["remote", "/srv/git/adder.git"])
        .assert()
        .success();

    env.yard(&adder.path)
        .arg("remote")
        .assert()
        .success()
        .stdout(predicate::str::contains("/srv/git/adder.git"));
}

#[test]
fn test_download_restores_working_copy_from_cache() {
    let env = Env::new();
    let adder = TestBlock::create(&env.ws(), "math", "adder");
    adder.write_source("adder.vhd", ADDER);
    adder.release("1.0.0");
    env.yard(&env.ws()).args(["install", "math.adder"]).assert().success();
    fs::remove_dir_all(&adder.path).unwrap();

    env.yard(&env.ws())
        .args(["download", "math.adder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Downloaded"));

    assert!(adder.path.join("Block.toml").is_file());
    assert!(adder.path.join("adder.vhd").is_file());
    env.yard(&env.ws())
        .args(["download", "math.adder"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

// ============================================================================
// Settings Commands
// ============================================================================

#[test]
fn test_workspace_add_and_use() {
    let env = Env::new();
    let scratch = env.temp.path().join("scratch");

    env.yard(&env.ws())
        .args(["workspace", "add", "scratch"])
        .arg(&scratch)
        .arg("--activate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Added workspace"));
    assert!(scratch.is_dir());

    let settings = env.settings();
    assert_eq!(settings.active().unwrap().0, "scratch");
    assert_eq!(settings.workspaces["scratch"].path, scratch);

    env.yard(&env.ws())
        .args(["workspace", "use", "lab"])
        .assert()
        .success();
    env.yard(&env.ws())
        .args(["workspace", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("scratch"))
        .stdout(predicate::str::contains("lab"));
    env.yard(&env.ws())
        .args(["workspace", "use", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not defined"));
}

#[test]
fn test_market_link_and_unlink() {
    let env = Env::new();
    let market = env.temp.path().join("market");

    env.yard(&env.ws())
        .args(["market", "add", "open"])
        .arg(&market)
        .arg("--link")
        .assert()
        .success()
        .stdout(predicate::str::contains("Linked"));
    assert_eq!(
        env.settings().active_markets().unwrap(),
        vec![("open".to_string(), market.clone())]
    );

    env.yard(&env.ws())
        .args(["market", "unlink", "open"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unlinked"));
    let settings = env.settings();
    assert!(settings.active_markets().unwrap().is_empty());
    assert!(settings.markets.contains_key("open"));

    env.yard(&env.ws())
        .args(["market", "link", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not registered"));
}
