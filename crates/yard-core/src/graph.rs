//! Dependency graph over design units and the blocks that own them.
//!
//! Edges point from dependent to dependency: if unit A instantiates unit B
//! the edge is `A -> B`, and a topological sort yields B before A.
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//! use yard_core::graph::UnitGraph;
//! use yard_core::title::Title;
//! use yard_core::unit::{Language, Unit, UnitKind, UnitRef, UnitStub};
//!
//! let title = Title::parse("math.alu").unwrap();
//! let unit = |name: &str, requires: Vec<UnitRef>| {
//!     let stub = UnitStub {
//!         name: name.to_string(),
//!         kind: UnitKind::Entity,
//!         language: Language::Vhdl,
//!         is_testbench: false,
//!         file: PathBuf::from(format!("{name}.vhd")),
//!     };
//!     Unit::from_stub(&title, stub, requires)
//! };
//!
//! let mut graph = UnitGraph::new();
//! graph.add_unit(unit("alu", vec![UnitRef::new(None, "adder")]));
//! graph.add_unit(unit("adder", vec![]));
//!
//! let order = graph.topological_sort().unwrap();
//! let names: Vec<_> = order.units.iter().map(|u| u.name.as_str()).collect();
//! assert_eq!(names, ["adder", "alu"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::title::{Requirement, Title};
use crate::unit::{Unit, unit_key};

/// A vertex: a design unit or a block title reached through `derives`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vertex {
    Unit(Unit),
    Block(Title),
}

/// Result of a topological sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOrder {
    /// Units with every requirement before its dependents.
    pub units: Vec<Unit>,
    /// Owning blocks in the order their units first appear, without repeats.
    pub blocks: Vec<Title>,
}

/// Directed graph of requirements between units and between blocks.
#[derive(Debug, Clone, Default)]
pub struct UnitGraph {
    vertices: BTreeMap<String, Vertex>,
    /// Adjacency list: key requires each value.
    edges: BTreeMap<String, BTreeSet<String>>,
}

fn block_id(title: &Title) -> String {
    let (market, library, name) = title.key();
    format!("@{market}.{library}.{name}")
}

impl UnitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit and connect it to every known unit it requires, and every
    /// known unit requiring it. A later unit with the same key replaces the
    /// earlier one.
    pub fn add_unit(&mut self, unit: Unit) {
        let id = unit.key();
        for req in &unit.requires {
            let library = req.library.as_deref().unwrap_or(unit.library());
            let target = unit_key(library, &req.name);
            if target != id {
                self.edges.entry(id.clone()).or_default().insert(target);
            }
        }
        self.edges.entry(id.clone()).or_default();
        self.vertices.insert(id, Vertex::Unit(unit));
    }

    /// Add a block vertex with edges to the blocks it derives.
    pub fn add_block(&mut self, title: &Title, derives: &[Requirement]) {
        let id = block_id(title);
        self.vertices
            .entry(id.clone())
            .or_insert_with(|| Vertex::Block(title.clone()));
        for req in derives {
            let target = block_id(&req.title);
            self.vertices
                .entry(target.clone())
                .or_insert_with(|| Vertex::Block(req.title.clone()));
            self.edges.entry(id.clone()).or_default().insert(target);
        }
        self.edges.entry(id).or_default();
    }

    /// Edges whose both ends are known vertices.
    fn live_edges(&self) -> impl Iterator<Item = (&String, &String)> {
        self.edges.iter().flat_map(move |(from, tos)| {
            tos.iter()
                .filter(|to| self.vertices.contains_key(*to))
                .map(move |to| (from, to))
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.live_edges().count()
    }

    /// Every unit, ordered by key.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.vertices.values().filter_map(|v| match v {
            Vertex::Unit(u) => Some(u),
            Vertex::Block(_) => None,
        })
    }

    /// Look a unit up by name, optionally restricted to a library.
    pub fn find_unit(&self, library: Option<&str>, name: &str) -> Option<&Unit> {
        match library {
            Some(library) => match self.vertices.get(&unit_key(library, name)) {
                Some(Vertex::Unit(u)) => Some(u),
                _ => None,
            },
            None => self.units().find(|u| u.name.eq_ignore_ascii_case(name)),
        }
    }

    /// Units the given unit requires directly.
    pub fn requirements_of(&self, unit: &Unit) -> Vec<&Unit> {
        self.edges
            .get(&unit.key())
            .into_iter()
            .flatten()
            .filter_map(|id| match self.vertices.get(id) {
                Some(Vertex::Unit(u)) => Some(u),
                _ => None,
            })
            .collect()
    }

    /// Units that directly require the given unit.
    pub fn dependents_of(&self, unit: &Unit) -> Vec<&Unit> {
        let id = unit.key();
        self.live_edges()
            .filter(|(_, to)| **to == id)
            .filter_map(|(from, _)| match self.vertices.get(from) {
                Some(Vertex::Unit(u)) => Some(u),
                _ => None,
            })
            .collect()
    }

    /// Order the graph so every requirement precedes its dependents.
    ///
    /// Each vertex starts with its number of outstanding requirements; ready
    /// vertices are emitted in ascending key order. A graph without edges
    /// still yields every unit, with a warning.
    ///
    /// # Errors
    ///
    /// Returns `Error::DependencyCycle` if some vertices can never become ready.
    pub fn topological_sort(&self) -> Result<BuildOrder> {
        let mut remaining: BTreeMap<&str, usize> =
            self.vertices.keys().map(|id| (id.as_str(), 0)).collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut edge_count = 0;
        for (from, to) in self.live_edges() {
            edge_count += 1;
            if let Some(count) = remaining.get_mut(from.as_str()) {
                *count += 1;
            }
            dependents.entry(to.as_str()).or_default().push(from.as_str());
        }
        if edge_count == 0 && !self.vertices.is_empty() {
            tracing::warn!(vertices = self.vertices.len(), "no edges found; order is arbitrary");
        }

        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut emitted = Vec::with_capacity(self.vertices.len());

        while let Some(current) = ready.pop_first() {
            emitted.push(current);
            for dependent in dependents.get(current).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if emitted.len() != self.vertices.len() {
            let done: BTreeSet<&str> = emitted.iter().copied().collect();
            let participants = self
                .vertices
                .keys()
                .filter(|id| !done.contains(id.as_str()))
                .cloned()
                .collect();
            return Err(Error::DependencyCycle { participants });
        }

        let mut order = BuildOrder {
            units: Vec::new(),
            blocks: Vec::new(),
        };
        for id in emitted {
            if let Some(Vertex::Unit(unit)) = self.vertices.get(id) {
                if !order.blocks.contains(&unit.block) {
                    order.blocks.push(unit.block.clone());
                }
                order.units.push(unit.clone());
            }
        }
        Ok(order)
    }

    /// Draw the entities below `top` as a tree. Packages are left out.
    ///
    /// ```text
    /// math.alu
    /// +- math.adder
    /// |  \- math.half_adder
    /// \- util.fifo
    /// ```
    pub fn render_tree(&self, top: &Unit) -> String {
        let mut out = format!("{top}\n");
        let mut path = vec![top.key()];
        self.render_children(top, "", &mut path, &mut out);
        out
    }

    fn render_children(&self, unit: &Unit, indent: &str, path: &mut Vec<String>, out: &mut String) {
        let children: Vec<&Unit> = self
            .requirements_of(unit)
            .into_iter()
            .filter(|u| !u.is_package())
            .collect();
        for (i, child) in children.iter().enumerate() {
            let last = i + 1 == children.len();
            let (branch, carry) = if last { ("\\- ", "   ") } else { ("+- ", "|  ") };
            out.push_str(&format!("{indent}{branch}{child}\n"));

            let key = child.key();
            if path.contains(&key) {
                continue;
            }
            path.push(key);
            self.render_children(child, &format!("{indent}{carry}"), path, out);
            path.pop();
        }
    }
}
