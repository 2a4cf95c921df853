//! Design units discovered in a block's HDL sources.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::title::Title;

/// HDL a source file is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Vhdl,
    Verilog,
}

/// Extensions of VHDL sources.
pub const VHDL_EXTENSIONS: [&str; 2] = ["vhd", "vhdl"];

/// Extensions of Verilog and SystemVerilog sources.
pub const VERILOG_EXTENSIONS: [&str; 3] = ["v", "sv", "vh"];

impl Language {
    /// Language of a source file, judged by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        if VHDL_EXTENSIONS.contains(&ext.as_str()) {
            Some(Language::Vhdl)
        } else if VERILOG_EXTENSIONS.contains(&ext.as_str()) {
            Some(Language::Verilog)
        } else {
            None
        }
    }

    /// Whether identifiers compare case-insensitively.
    pub fn case_insensitive(self) -> bool {
        matches!(self, Language::Vhdl)
    }
}

/// Whether a unit is a design (entity/module) or a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Entity,
    Package,
}

/// Reference from one unit to another, as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitRef {
    /// Library named at the reference site; `None` means the unit's own library.
    pub library: Option<String>,
    pub name: String,
}

impl UnitRef {
    pub fn new(library: Option<&str>, name: &str) -> Self {
        Self {
            library: library.map(str::to_string),
            name: name.to_string(),
        }
    }
}

/// A unit as yielded by a scan, before its requirements are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStub {
    pub name: String,
    pub kind: UnitKind,
    pub language: Language,
    pub is_testbench: bool,
    pub file: PathBuf,
}

/// A fully decoded design unit owned by a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub block: Title,
    pub name: String,
    pub kind: UnitKind,
    pub language: Language,
    pub is_testbench: bool,
    pub file: PathBuf,
    /// Requirements with the library filled in.
    pub requires: Vec<UnitRef>,
}

impl Unit {
    /// Complete a stub: attach the owning block and resolve `work`-relative
    /// references to the block's library.
    pub fn from_stub(block: &Title, stub: UnitStub, requires: Vec<UnitRef>) -> Self {
        let requires = requires
            .into_iter()
            .filter(|r| !r.name.eq_ignore_ascii_case(&stub.name))
            .map(|r| UnitRef {
                library: Some(r.library.unwrap_or_else(|| block.library().to_string())),
                name: r.name,
            })
            .collect();
        Self {
            block: block.clone(),
            name: stub.name,
            kind: stub.kind,
            language: stub.language,
            is_testbench: stub.is_testbench,
            file: stub.file,
            requires,
        }
    }

    pub fn library(&self) -> &str {
        self.block.library()
    }

    pub fn is_package(&self) -> bool {
        self.kind == UnitKind::Package
    }

    /// Lowercased `library.name` used to resolve references.
    pub fn key(&self) -> String {
        unit_key(self.library(), &self.name)
    }

    /// Whether this unit requires the unit `library.name`.
    pub fn requires_unit(&self, library: &str, name: &str) -> bool {
        self.requires.iter().any(|r| {
            r.name.eq_ignore_ascii_case(name)
                && r.library
                    .as_deref()
                    .is_some_and(|l| l.eq_ignore_ascii_case(library))
        })
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.library(), self.name)
    }
}

/// Lowercased lookup key for a unit.
pub fn unit_key(library: &str, name: &str) -> String {
    format!("{}.{}", library.to_lowercase(), name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stub_resolves_work_library_and_drops_self() {
        let title = Title::parse("math.alu").unwrap();
        let stub = UnitStub {
            name: "alu".into(),
            kind: UnitKind::Entity,
            language: Language::Vhdl,
            is_testbench: false,
            file: PathBuf::from("alu.vhd"),
        };
        let unit = Unit::from_stub(
            &title,
            stub,
            vec![
                UnitRef::new(None, "adder"),
                UnitRef::new(Some("util"), "fifo"),
                UnitRef::new(None, "ALU"),
            ],
        );

        assert_eq!(unit.requires.len(), 2);
        assert!(unit.requires_unit("MATH", "Adder"));
        assert!(unit.requires_unit("util", "fifo"));
        assert_eq!(unit.key(), "math.alu");
    }
}
