//! End-to-end flows through `Context`

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use yard_core::{
    Bump, Context, DeclarationScanner, Error, Level, Metadata, NextVersion, ReleaseRequest,
    Requirement, ScriptedChooser, Settings, Title, UninstallTarget, VersionId,
};
use yard_git::Repository;
use yard_test_utils::TestBlock;

const ADDER: &str = "entity adder is\n  port (a : in bit);\nend entity;\n";
const ALU: &str = "entity alu is\n  port (x : in bit);\nend entity;\n\
    architecture rtl of alu is\nbegin\n  u0 : entity work.adder port map (a => x);\nend architecture;\n";
const ALU_TB: &str = "entity alu_tb is\nend entity;\n\
    architecture sim of alu_tb is\nbegin\n  dut : entity work.alu port map (x => '0');\nend architecture;\n";

struct Setup {
    temp: TempDir,
}

impl Setup {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        fs::create_dir_all(&home).unwrap();
        let settings = format!(
            "active_workspace = \"lab\"\ncache_dir = '{}'\n\n[workspaces.lab]\npath = '{}'\n",
            temp.path().join("cache").display(),
            temp.path().join("ws").display(),
        );
        fs::write(home.join("settings.toml"), settings).unwrap();
        Self { temp }
    }

    fn ws(&self) -> std::path::PathBuf {
        self.temp.path().join("ws")
    }

    fn context(&self, chooser: ScriptedChooser) -> Context {
        let settings = Settings::load(&self.temp.path().join("home")).unwrap();
        Context::new(
            settings,
            Box::new(chooser),
            Box::new(DeclarationScanner::new().unwrap()),
        )
        .unwrap()
    }
}

fn title(text: &str) -> Title {
    Title::parse(text).unwrap()
}

#[test]
fn test_release_records_direct_dependencies() {
    let setup = Setup::new();
    let adder = TestBlock::create(&setup.ws(), "math", "adder");
    adder.write_source("adder.vhd", ADDER);
    adder.release("1.0.0");
    let alu = TestBlock::create(&setup.ws(), "math", "alu");
    alu.write_source("alu.vhd", ALU);
    let mut ctx = setup.context(ScriptedChooser::new());

    let version = ctx
        .release(
            &title("math.alu"),
            ReleaseRequest::new(NextVersion::Bump(Bump::Minor)),
        )
        .unwrap();

    assert_eq!(version, VersionId::new(0, 1, 0));
    let (meta, _) = Metadata::read(&alu.path).unwrap();
    assert_eq!(meta.derives, vec!["math.adder".to_string()]);
}

#[test]
fn test_graph_orders_units_and_detects_roles() {
    let setup = Setup::new();
    let mut alu = TestBlock::create(&setup.ws(), "math", "alu");
    alu.write_source("adder.vhd", ADDER);
    alu.write_source("alu.vhd", ALU);
    alu.write_source("alu_tb.vhd", ALU_TB);
    alu.set_derives(&[]);
    alu.release("1.0.0");
    let mut ctx = setup.context(ScriptedChooser::new());
    let alu_title = title("math.alu");

    let graph = ctx.build_graph(&alu_title).unwrap();
    let order = graph.topological_sort().unwrap();
    let names: Vec<&str> = order.units.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["adder", "alu", "alu_tb"]);

    let roles = ctx.detect_roles(&alu_title, &graph).unwrap();
    assert_eq!(roles.top.map(|u| u.name), Some("alu".to_string()));
    assert_eq!(roles.bench.map(|u| u.name), Some("alu_tb".to_string()));
    let (meta, _) = Metadata::read(&alu.path).unwrap();
    assert_eq!(meta.toplevel.as_deref(), Some("alu"));
}

#[test]
fn test_install_then_uninstall_everything() {
    let setup = Setup::new();
    let adder = TestBlock::create(&setup.ws(), "math", "adder");
    adder.write_source("adder.vhd", ADDER);
    adder.release("1.0.0");
    let adder_title = title("math.adder");

    let mut ctx = setup.context(ScriptedChooser::new().with_confirms([true]));
    ctx.install(&Requirement::latest(adder_title.clone()))
        .unwrap();
    assert!(ctx.inventory.get(&adder_title, Level::Install).is_some());

    let removed = ctx
        .uninstall(&adder_title, UninstallTarget::Everything)
        .unwrap();

    assert!(removed);
    assert!(!ctx.cache.is_installed(&adder_title));
    assert!(ctx.inventory.get(&adder_title, Level::Install).is_none());
    assert!(ctx.inventory.get(&adder_title, Level::Download).is_some());
}

#[test]
fn test_block_at_finds_enclosing_block() {
    let setup = Setup::new();
    let adder = TestBlock::create(&setup.ws(), "math", "adder");
    adder.write_source("rtl/adder.vhd", ADDER);
    let ctx = setup.context(ScriptedChooser::new());

    let found = ctx.block_at(&adder.path.join("rtl")).unwrap();

    assert_eq!(found, title("math.adder"));
}

#[test]
fn test_download_installed_block_into_workspace() {
    let setup = Setup::new();
    let adder = TestBlock::create(&setup.ws(), "math", "adder");
    adder.write_source("adder.vhd", ADDER);
    adder.release("1.0.0");
    let adder_title = title("math.adder");
    setup
        .context(ScriptedChooser::new())
        .install(&Requirement::latest(adder_title.clone()))
        .unwrap();
    fs::remove_dir_all(&adder.path).unwrap();

    let mut ctx = setup.context(ScriptedChooser::new());
    assert!(ctx.inventory.get(&adder_title, Level::Download).is_none());
    let path = ctx.download(&adder_title).unwrap();

    assert_eq!(path, setup.ws().join("math").join("adder"));
    let block = ctx.inventory.get(&adder_title, Level::Download).unwrap();
    assert_eq!(block.version(), &VersionId::new(1, 0, 0));
    let repo = block.repository().unwrap();
    assert_eq!(repo.remote_url().unwrap(), None);
    assert!(repo.list_tags().unwrap().contains(&"v1.0.0-yard".to_string()));
    assert!(path.join("adder.vhd").is_file());

    let again = ctx.download(&adder_title).unwrap_err();
    assert!(matches!(again, Error::AlreadyExists { .. }));
}

#[test]
fn test_download_unknown_block_fails() {
    let setup = Setup::new();
    let mut ctx = setup.context(ScriptedChooser::new());

    let err = ctx.download(&title("math.ghost")).unwrap_err();

    assert!(matches!(err, Error::BlockNotFound { .. }));
}
