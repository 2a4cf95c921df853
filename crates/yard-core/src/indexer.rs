//! Locating design units inside HDL source files.
//!
//! The core only needs the [`SourceIndexer`] trait. [`DeclarationScanner`] is
//! a line-oriented implementation good enough for conventional VHDL and
//! Verilog code; it does not parse the languages.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Captures;

use regex::Regex;

use crate::error::Result;
use crate::unit::{Language, UnitKind, UnitRef, UnitStub, VERILOG_EXTENSIONS, VHDL_EXTENSIONS};

/// Finds design units and their requirements in source files.
pub trait SourceIndexer {
    /// File extensions (without dot) this indexer understands.
    fn extensions(&self) -> Vec<&'static str>;

    /// Declared units in `files`.
    fn scan(&self, files: &[PathBuf]) -> Result<Vec<UnitStub>>;

    /// Units referenced by `unit`.
    fn decode(&self, unit: &UnitStub) -> Result<Vec<UnitRef>>;
}

/// Libraries that never name blocks.
const STANDARD_LIBRARIES: [&str; 4] = ["ieee", "std", "unisim", "work_std"];

const VERILOG_KEYWORDS: [&str; 24] = [
    "module", "endmodule", "input", "output", "inout", "wire", "reg", "logic", "assign",
    "always", "always_ff", "always_comb", "initial", "if", "else", "for", "while", "case",
    "begin", "end", "function", "task", "return", "localparam",
];

/// Stretch of source text owned by one design unit.
#[derive(Debug)]
struct Span {
    owner: String,
    start: usize,
    end: usize,
}

/// Unit owning the text at `pos`, if any span covers it.
fn owner_at(spans: &[Span], pos: usize) -> Option<&str> {
    spans
        .iter()
        .rev()
        .find(|s| s.start <= pos && pos < s.end)
        .map(|s| s.owner.as_str())
}

/// First unit declared after `pos`; context clauses apply to it.
fn next_owner(spans: &[Span], pos: usize) -> Option<&str> {
    spans
        .iter()
        .find(|s| s.start >= pos)
        .map(|s| s.owner.as_str())
}

/// Regex-based [`SourceIndexer`] for VHDL and Verilog.
#[derive(Debug)]
pub struct DeclarationScanner {
    vhdl_entity: Regex,
    vhdl_package: Regex,
    vhdl_port: Regex,
    vhdl_end: Regex,
    vhdl_direct: Regex,
    vhdl_use: Regex,
    vhdl_component: Regex,
    vhdl_unit: Regex,
    verilog_module: Regex,
    verilog_unit: Regex,
    verilog_unit_end: Regex,
    verilog_package: Regex,
    verilog_instance: Regex,
    verilog_import: Regex,
}

impl DeclarationScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            vhdl_entity: Regex::new(r"(?im)^\s*entity\s+(\w+)\s+is\b")?,
            vhdl_package: Regex::new(r"(?im)^\s*package\s+(\w+)\s+is\b")?,
            vhdl_port: Regex::new(r"(?i)\bport\s*\(")?,
            vhdl_end: Regex::new(r"(?i)\bend\b")?,
            vhdl_direct: Regex::new(r"(?i)\bentity\s+(\w+)\.(\w+)")?,
            vhdl_use: Regex::new(r"(?i)\buse\s+(\w+)\.(\w+)\s*\.")?,
            vhdl_component: Regex::new(
                r"(?im)^\s*\w+\s*:\s*(?:component\s+)?(\w+)\s+(?:generic|port)\s+map\b",
            )?,
            vhdl_unit: Regex::new(
                r"(?im)^[ \t]*(?:entity\s+(\w+)|package\s+body\s+(\w+)|package\s+(\w+)|architecture\s+\w+\s+of\s+(\w+))\s+is\b",
            )?,
            verilog_module: Regex::new(r"(?m)^\s*module\s+(\w+)\s*(#\s*\([^;]*?\))?\s*(\([^;]*?\))?\s*;")?,
            verilog_package: Regex::new(r"(?m)^\s*package\s+(\w+)\s*;")?,
            verilog_unit: Regex::new(r"(?m)^[ \t]*(?:module|package)\s+(\w+)")?,
            verilog_unit_end: Regex::new(r"\bend(?:module|package)\b")?,
            verilog_instance: Regex::new(r"(?m)^\s*(\w+)\s+(?:#\s*\([^;]*?\)\s*)?(\w+)\s*\(")?,
            verilog_import: Regex::new(r"\bimport\s+(\w+)\s*::")?,
        })
    }

    fn scan_vhdl(&self, file: &Path, text: &str, out: &mut Vec<UnitStub>) {
        for caps in self.vhdl_entity.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let rest = &text[whole.end()..];
            let declaration = match self.vhdl_end.find(rest) {
                Some(end) => &rest[..end.start()],
                None => rest,
            };
            out.push(UnitStub {
                name: name.as_str().to_string(),
                kind: UnitKind::Entity,
                language: Language::Vhdl,
                is_testbench: !self.vhdl_port.is_match(declaration)
                    || looks_like_bench(name.as_str()),
                file: file.to_path_buf(),
            });
        }
        for caps in self.vhdl_package.captures_iter(text) {
            let Some(name) = caps.get(1) else { continue };
            out.push(UnitStub {
                name: name.as_str().to_string(),
                kind: UnitKind::Package,
                language: Language::Vhdl,
                is_testbench: false,
                file: file.to_path_buf(),
            });
        }
    }

    fn scan_verilog(&self, file: &Path, text: &str, out: &mut Vec<UnitStub>) {
        for caps in self.verilog_module.captures_iter(text) {
            let Some(name) = caps.get(1) else { continue };
            let has_ports = caps.get(3).is_some_and(|ports| {
                !ports
                    .as_str()
                    .trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())
                    .is_empty()
            });
            out.push(UnitStub {
                name: name.as_str().to_string(),
                kind: UnitKind::Entity,
                language: Language::Verilog,
                is_testbench: !has_ports || looks_like_bench(name.as_str()),
                file: file.to_path_buf(),
            });
        }
        for caps in self.verilog_package.captures_iter(text) {
            let Some(name) = caps.get(1) else { continue };
            out.push(UnitStub {
                name: name.as_str().to_string(),
                kind: UnitKind::Package,
                language: Language::Verilog,
                is_testbench: false,
                file: file.to_path_buf(),
            });
        }
    }

    /// VHDL design units in order. An architecture or package body extends
    /// the unit it belongs to; each span runs up to the next unit.
    fn vhdl_spans(&self, text: &str) -> Vec<Span> {
        let starts: Vec<(String, usize)> = self
            .vhdl_unit
            .captures_iter(text)
            .filter_map(|caps| {
                let owner = (1..=4).find_map(|i| caps.get(i))?;
                Some((owner.as_str().to_string(), caps.get(0)?.start()))
            })
            .collect();
        starts
            .iter()
            .enumerate()
            .map(|(i, (owner, start))| Span {
                owner: owner.clone(),
                start: *start,
                end: starts.get(i + 1).map_or(text.len(), |(_, next)| *next),
            })
            .collect()
    }

    /// Verilog modules and packages, each up to its `endmodule`/`endpackage`.
    fn verilog_spans(&self, text: &str) -> Vec<Span> {
        self.verilog_unit
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let owner = caps.get(1)?.as_str().to_string();
                let end = self
                    .verilog_unit_end
                    .find_at(text, whole.end())
                    .map_or(text.len(), |m| m.end());
                Some(Span {
                    owner,
                    start: whole.start(),
                    end,
                })
            })
            .collect()
    }

    /// References made by the VHDL unit `name`.
    ///
    /// Instantiations count for the unit whose text contains them; `use`
    /// clauses count for the unit declared after them.
    fn decode_vhdl(&self, text: &str, name: &str) -> Vec<UnitRef> {
        let spans = self.vhdl_spans(text);
        let inside = |caps: &Captures<'_>| {
            caps.get(1)
                .and_then(|m| owner_at(&spans, m.start()))
                .is_some_and(|owner| owner.eq_ignore_ascii_case(name))
        };

        let mut refs = Vec::new();
        for caps in self.vhdl_direct.captures_iter(text).filter(|c| inside(c)) {
            if let (Some(lib), Some(unit)) = (caps.get(1), caps.get(2)) {
                refs.push(library_ref(lib.as_str(), unit.as_str()));
            }
        }
        for caps in self.vhdl_use.captures_iter(text) {
            let applies = caps
                .get(1)
                .and_then(|m| next_owner(&spans, m.start()).or_else(|| owner_at(&spans, m.start())))
                .is_some_and(|owner| owner.eq_ignore_ascii_case(name));
            if !applies {
                continue;
            }
            if let (Some(lib), Some(unit)) = (caps.get(1), caps.get(2)) {
                if STANDARD_LIBRARIES.contains(&lib.as_str().to_lowercase().as_str()) {
                    continue;
                }
                refs.push(library_ref(lib.as_str(), unit.as_str()));
            }
        }
        for caps in self.vhdl_component.captures_iter(text).filter(|c| inside(c)) {
            if let Some(unit) = caps.get(1) {
                refs.push(UnitRef::new(None, unit.as_str()));
            }
        }
        refs
    }

    /// References made by the Verilog unit `name`. Imports at file scope
    /// count for the next module.
    fn decode_verilog(&self, text: &str, name: &str) -> Vec<UnitRef> {
        let spans = self.verilog_spans(text);
        let owner = |pos: usize| owner_at(&spans, pos).or_else(|| next_owner(&spans, pos));
        let ours = |caps: &Captures<'_>| {
            caps.get(1)
                .and_then(|m| owner(m.start()))
                .is_some_and(|o| o == name)
        };

        let mut refs = Vec::new();
        for caps in self.verilog_instance.captures_iter(text).filter(|c| ours(c)) {
            let Some(unit) = caps.get(1) else { continue };
            if VERILOG_KEYWORDS.contains(&unit.as_str()) {
                continue;
            }
            refs.push(UnitRef::new(None, unit.as_str()));
        }
        for caps in self.verilog_import.captures_iter(text).filter(|c| ours(c)) {
            if let Some(unit) = caps.get(1) {
                refs.push(UnitRef::new(None, unit.as_str()));
            }
        }
        refs
    }
}

impl SourceIndexer for DeclarationScanner {
    fn extensions(&self) -> Vec<&'static str> {
        VHDL_EXTENSIONS
            .iter()
            .chain(VERILOG_EXTENSIONS.iter())
            .copied()
            .collect()
    }

    fn scan(&self, files: &[PathBuf]) -> Result<Vec<UnitStub>> {
        let mut stubs = Vec::new();
        for file in files {
            let Some(language) = Language::from_path(file) else {
                continue;
            };
            let text = yard_fs::io::read_text(file)?;
            let text = strip_comments(&text, language);
            match language {
                Language::Vhdl => self.scan_vhdl(file, &text, &mut stubs),
                Language::Verilog => self.scan_verilog(file, &text, &mut stubs),
            }
        }
        Ok(stubs)
    }

    fn decode(&self, unit: &UnitStub) -> Result<Vec<UnitRef>> {
        let text = yard_fs::io::read_text(&unit.file)?;
        let text = strip_comments(&text, unit.language);
        let refs = match unit.language {
            Language::Vhdl => self.decode_vhdl(&text, &unit.name),
            Language::Verilog => self.decode_verilog(&text, &unit.name),
        };

        let mut seen = HashSet::new();
        Ok(refs
            .into_iter()
            .filter(|r| !r.name.eq_ignore_ascii_case(&unit.name))
            .filter(|r| {
                let key = (
                    r.library.as_deref().map(str::to_lowercase),
                    r.name.to_lowercase(),
                );
                seen.insert(key)
            })
            .collect())
    }
}

fn library_ref(library: &str, name: &str) -> UnitRef {
    if library.eq_ignore_ascii_case("work") {
        UnitRef::new(None, name)
    } else {
        UnitRef::new(Some(library), name)
    }
}

fn looks_like_bench(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with("_tb") || lower.starts_with("tb_")
}

/// Drop line comments so commented-out declarations are not picked up.
pub(crate) fn strip_comments(text: &str, language: Language) -> String {
    let marker = match language {
        Language::Vhdl => "--",
        Language::Verilog => "//",
    };
    text.lines()
        .map(|line| match line.find(marker) {
            Some(idx) => &line[..idx],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ADDER: &str = "library ieee;\nuse ieee.std_logic_1164.all;\n\n\
        entity adder is\n  port (a, b : in std_logic; s : out std_logic);\nend entity;\n\n\
        architecture rtl of adder is\nbegin\n  s <= a xor b;\nend architecture;\n";

    const ALU: &str = "library math;\nuse math.types_pkg.all;\n\n\
        entity alu is\n  port (x : in std_logic);\nend entity;\n\n\
        architecture rtl of alu is\nbegin\n  u0 : entity work.adder port map (a => x, b => x, s => open);\n\
          u1 : half_adder port map (x, x);\n  -- u2 : entity work.ghost port map ();\nend architecture;\n";

    const BENCH: &str = "entity alu_tb is\nend entity;\n\n\
        architecture sim of alu_tb is\nbegin\n  dut : entity work.alu port map (x => '0');\nend architecture;\n";

    const PKG: &str = "package types_pkg is\n  constant W : natural := 8;\nend package;\n\
        package body types_pkg is\nend package body;\n";

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_scan_vhdl_units() {
        let temp = TempDir::new().unwrap();
        let files = vec![
            write(temp.path(), "adder.vhd", ADDER),
            write(temp.path(), "alu_tb.vhd", BENCH),
            write(temp.path(), "types_pkg.vhd", PKG),
        ];
        let scanner = DeclarationScanner::new().unwrap();

        let stubs = scanner.scan(&files).unwrap();

        let names: Vec<_> = stubs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["adder", "alu_tb", "types_pkg"]);
        assert!(!stubs[0].is_testbench);
        assert!(stubs[1].is_testbench);
        assert_eq!(stubs[2].kind, UnitKind::Package);
    }

    #[test]
    fn test_decode_vhdl_references() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "alu.vhd", ALU);
        let scanner = DeclarationScanner::new().unwrap();
        let stub = scanner.scan(&[file]).unwrap().remove(0);

        let refs = scanner.decode(&stub).unwrap();

        assert!(refs.contains(&UnitRef::new(None, "adder")));
        assert!(refs.contains(&UnitRef::new(None, "half_adder")));
        assert!(refs.contains(&UnitRef::new(Some("math"), "types_pkg")));
        assert!(!refs.iter().any(|r| r.name == "ghost"));
        assert!(!refs.iter().any(|r| r.name == "std_logic_1164"));
    }

    #[test]
    fn test_scan_and_decode_verilog() {
        let temp = TempDir::new().unwrap();
        let top = write(
            temp.path(),
            "top.v",
            "module top(input clk, output q);\n  counter #(.W(4)) u_cnt (.clk(clk));\n  assign q = 1'b0;\nendmodule\n",
        );
        let bench = write(
            temp.path(),
            "top_tb.sv",
            "module top_tb;\n  top dut(.clk(), .q());\nendmodule\n",
        );
        let scanner = DeclarationScanner::new().unwrap();

        let stubs = scanner.scan(&[top, bench]).unwrap();
        assert_eq!(stubs.len(), 2);
        assert!(!stubs[0].is_testbench);
        assert!(stubs[1].is_testbench);

        let refs = scanner.decode(&stubs[0]).unwrap();
        assert_eq!(refs, vec![UnitRef::new(None, "counter")]);
        let refs = scanner.decode(&stubs[1]).unwrap();
        assert_eq!(refs, vec![UnitRef::new(None, "top")]);
    }

    const ONE_FILE: &str = "library ieee;\nuse ieee.std_logic_1164.all;\n\n\
        entity sub is\n  port (a : in std_logic);\nend entity;\n\n\
        architecture rtl of sub is\nbegin\nend architecture;\n\n\
        use work.types_pkg.all;\n\n\
        entity top is\n  port (x : in std_logic);\nend entity;\n\n\
        architecture rtl of top is\nbegin\n  u0 : entity work.sub port map (a => x);\nend architecture;\n\n\
        entity top_tb is\nend entity;\n\n\
        architecture sim of top_tb is\nbegin\n  dut : top port map (x => '0');\nend architecture;\n";

    #[test]
    fn test_decode_keeps_references_with_their_unit() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "top.vhd", ONE_FILE);
        let scanner = DeclarationScanner::new().unwrap();
        let stubs = scanner.scan(&[file]).unwrap();
        let names: Vec<_> = stubs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["sub", "top", "top_tb"]);

        assert!(scanner.decode(&stubs[0]).unwrap().is_empty());
        assert_eq!(
            scanner.decode(&stubs[1]).unwrap(),
            vec![UnitRef::new(None, "sub"), UnitRef::new(None, "types_pkg")]
        );
        assert_eq!(
            scanner.decode(&stubs[2]).unwrap(),
            vec![UnitRef::new(None, "top")]
        );
    }

    #[test]
    fn test_decode_verilog_modules_sharing_a_file() {
        let temp = TempDir::new().unwrap();
        let file = write(
            temp.path(),
            "soc.sv",
            "module leaf(input a);\nendmodule\n\n\
             import bus_pkg::*;\nmodule soc(input clk);\n  leaf u_leaf (.a(clk));\nendmodule\n",
        );
        let scanner = DeclarationScanner::new().unwrap();
        let stubs = scanner.scan(&[file]).unwrap();

        assert!(scanner.decode(&stubs[0]).unwrap().is_empty());
        assert_eq!(
            scanner.decode(&stubs[1]).unwrap(),
            vec![UnitRef::new(None, "leaf"), UnitRef::new(None, "bus_pkg")]
        );
    }

    #[test]
    fn test_unknown_extensions_are_skipped() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "notes.txt", "entity fake is port(); end;");
        let scanner = DeclarationScanner::new().unwrap();
        assert!(scanner.scan(&[file]).unwrap().is_empty());
    }
}
