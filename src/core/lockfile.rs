//
//  Copyright (C) 2022-2024  Chase Ruskin
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use super::algo::DependencyGraph;
use super::module::{ModuleId, Origin, ResolvedModule};
use super::reference::{RefKind, Revision};
use crate::util::anyerror::Fault;
use crate::util::filesystem;
use crate::util::graph::NodeIndex;
use serde_derive::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = "Manifest.lock";

/// A problem found during resolution that does not stop it.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Warning {
    /// A cache directory exists without a record of what was fetched there.
    UntrackedCache { module: ModuleId, path: PathBuf },
    /// A requester asked for a module in a different place than where it was
    /// already resolved.
    RelocatedModule {
        module: ModuleId,
        path: PathBuf,
        requested: PathBuf,
        by: ModuleId,
    },
    MissingFile { module: ModuleId, path: PathBuf },
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UntrackedCache { module, path } => write!(
                f,
                "using existing directory {:?} for {} without knowing its revision",
                path, module
            ),
            Self::RelocatedModule {
                module,
                path,
                requested,
                by,
            } => write!(
                f,
                "{} requested {} at {:?} but it is already placed at {:?}",
                by, module, requested, path
            ),
            Self::MissingFile { module, path } => {
                write!(f, "file {:?} listed by {} does not exist", path, module)
            }
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ModuleEntry {
    id: ModuleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<String>,
    path: String,
    origin: Origin,
}

impl From<&ResolvedModule> for ModuleEntry {
    fn from(module: &ResolvedModule) -> Self {
        Self {
            id: module.get_id().clone(),
            kind: module.get_kind().map(|k: &RefKind| k.to_string()),
            location: module.get_location().to_string(),
            revision: module.get_revision().as_deref().map(|r| r.to_string()),
            path: filesystem::into_std_str(module.get_path()),
            origin: module.get_origin(),
        }
    }
}

impl ModuleEntry {
    pub fn get_id(&self) -> &ModuleId {
        &self.id
    }

    pub fn get_origin(&self) -> Origin {
        self.origin
    }

    pub fn get_revision(&self) -> Revision {
        Revision::new(self.revision.as_deref())
    }
}

/// What a resolution settled on for every module, in build order.
#[derive(Debug, PartialEq, Serialize)]
pub struct Report {
    #[serde(rename = "module")]
    modules: Vec<ModuleEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<Warning>,
}

impl Report {
    pub fn new(graph: &DependencyGraph, order: &[NodeIndex], warnings: Vec<Warning>) -> Self {
        Self {
            modules: order
                .iter()
                .filter_map(|i| graph.get_node_by_index(*i))
                .map(|n| ModuleEntry::from(n.as_ref()))
                .collect(),
            warnings: warnings,
        }
    }

    pub fn get_modules(&self) -> &Vec<ModuleEntry> {
        &self.modules
    }

    pub fn get_warnings(&self) -> &Vec<Warning> {
        &self.warnings
    }

    pub fn get(&self, id: &ModuleId) -> Option<&ModuleEntry> {
        self.modules.iter().find(|m| &m.id == id)
    }

    pub fn to_json(&self) -> Result<String, Fault> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Renders the lock file contents.
    ///
    /// The lock file records the external modules only; warnings are left
    /// out.
    pub fn to_lock(&self) -> Result<String, Fault> {
        #[derive(Serialize)]
        struct Lock<'a> {
            module: Vec<&'a ModuleEntry>,
        }
        let lock = Lock {
            module: self
                .modules
                .iter()
                .filter(|m| m.origin != Origin::Root)
                .collect(),
        };
        let body = toml::to_string(&lock)?;
        Ok(format!(
            "# This file is automatically generated by hdlfetch.\n# It is not intended for manual editing.\n\n{}",
            body
        ))
    }

    /// Writes the lock file into the directory `root`.
    pub fn write_lock(&self, root: &Path) -> Result<PathBuf, Fault> {
        let path = root.join(LOCK_FILE);
        std::fs::write(&path, self.to_lock()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::manifest::Manifest;
    use std::sync::Arc;

    fn graph() -> (DependencyGraph, Vec<NodeIndex>) {
        let root = Arc::new(Manifest::from_text("", &PathBuf::from("/work/top/Manifest.toml")).unwrap());
        let dep = Arc::new(Manifest::from_text("", &PathBuf::from("/work/ip/hdmi/Manifest.toml")).unwrap());
        let mut g = DependencyGraph::new();
        let r = g.add_node(root.get_id().clone(), ResolvedModule::root(root.clone()));
        let h = g.add_node(
            ModuleId::new("github.com/hdl-util/hdmi"),
            ResolvedModule::new(
                ModuleId::new("github.com/hdl-util/hdmi"),
                RefKind::Git,
                String::from("git@github.com:hdl-util/hdmi.git"),
                Revision::new(Some("master")),
                PathBuf::from("/work/ip/hdmi"),
                Origin::Fetched,
                dep,
            ),
        );
        g.add_edge_by_index(r, h, 0);
        (g, vec![h, r])
    }

    #[test]
    fn report_in_build_order() {
        let (g, order) = graph();
        let report = Report::new(&g, &order, Vec::new());
        assert_eq!(report.get_modules().len(), 2);
        assert_eq!(report.get_modules()[0].get_origin(), Origin::Fetched);
        assert_eq!(report.get_modules()[1].get_origin(), Origin::Root);
        let entry = report.get(&ModuleId::new("github.com/hdl-util/hdmi")).unwrap();
        assert_eq!(entry.get_revision(), Revision::new(Some("master")));
    }

    #[test]
    fn lock_lists_external_modules() {
        let (g, order) = graph();
        let report = Report::new(&g, &order, Vec::new());
        let text = report.to_lock().unwrap();
        assert!(text.contains("[[module]]"));
        assert!(text.contains("id = \"github.com/hdl-util/hdmi\""));
        assert!(text.contains("revision = \"master\""));
        assert!(text.contains("origin = \"fetched\""));
        assert_eq!(text.contains("origin = \"root\""), false);
    }

    #[test]
    fn json_carries_warnings() {
        let (g, order) = graph();
        let report = Report::new(
            &g,
            &order,
            vec![Warning::MissingFile {
                module: ModuleId::new("/work/top"),
                path: PathBuf::from("/work/top/top.sv"),
            }],
        );
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["module"][1]["origin"], "root");
        assert_eq!(json["warnings"][0]["kind"], "missing-file");
        assert_eq!(json["warnings"][0]["path"], "/work/top/top.sv");
    }
}
