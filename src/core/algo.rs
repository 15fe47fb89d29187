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

//! Builds the dependency graph of every module reachable from a root
//! manifest.

use super::fetch::{CacheStatus, FetchJob};
use super::lockfile::Warning;
use super::manifest::Manifest;
use super::module::{ModuleId, Origin, ResolvedModule};
use super::reference::ExternalReference;
use super::resolver::{ResolvedRef, Resolver};
use crate::error::{CyclePath, Error};
use crate::util::graph::{Mark, NodeIndex};
use crate::util::graphmap::GraphMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Modules keyed by identity; edges point from a dependent to its
/// dependency and are labeled with the declaration position.
pub type DependencyGraph = GraphMap<ModuleId, ResolvedModule, usize>;

/// Loaded manifests kept for the lifetime of a session.
#[derive(Debug, Default)]
pub struct ManifestMemo(HashMap<PathBuf, Arc<Manifest>>);

impl ManifestMemo {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Loads the manifest in `dir`, reusing an earlier read of the same
    /// directory.
    ///
    /// Failed reads are not remembered.
    pub fn load(&mut self, dir: &Path) -> Result<Arc<Manifest>, Error> {
        if let Some(m) = self.0.get(dir) {
            return Ok(m.clone());
        }
        let manifest = Arc::new(Manifest::from_path(dir)?);
        self.0.insert(dir.to_path_buf(), manifest.clone());
        Ok(manifest)
    }

    /// Drops the manifest read from `dir` so the next load reads it again.
    pub fn forget(&mut self, dir: &Path) {
        self.0.remove(dir);
    }
}

/// The result of walking everything currently reachable from the root.
#[derive(Debug)]
pub struct Pass {
    graph: DependencyGraph,
    root: NodeIndex,
    pending: BTreeMap<ModuleId, FetchJob>,
    errors: Vec<Error>,
    warnings: Vec<Warning>,
}

impl Pass {
    pub fn get_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn get_root(&self) -> NodeIndex {
        self.root
    }

    /// Modules that must be fetched before their subtrees can be walked.
    pub fn get_pending(&self) -> &BTreeMap<ModuleId, FetchJob> {
        &self.pending
    }

    pub fn get_errors(&self) -> &Vec<Error> {
        &self.errors
    }

    pub fn get_warnings(&self) -> &Vec<Warning> {
        &self.warnings
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.pending.is_empty()
    }

    pub fn into_parts(self) -> (DependencyGraph, NodeIndex, BTreeMap<ModuleId, FetchJob>, Vec<Error>, Vec<Warning>) {
        (self.graph, self.root, self.pending, self.errors, self.warnings)
    }

    /// Lists the module indices with every dependency before its dependents.
    pub fn build_order(&self) -> Vec<NodeIndex> {
        build_order(&self.graph, self.root)
    }
}

/// Lists the module indices of `graph` with every dependency before its
/// dependents, breaking ties by declaration order.
pub fn build_order(graph: &DependencyGraph, root: NodeIndex) -> Vec<NodeIndex> {
    graph.get_graph().postorder(root)
}

/// Renders the dependency tree starting at `root`.
pub fn tree_to_string(graph: &DependencyGraph, root: NodeIndex) -> String {
    let mut tree = String::new();
    for (twig, index) in graph.get_graph().treeview(root) {
        let node = match graph.get_node_by_index(index) {
            Some(n) => n.as_ref(),
            None => continue,
        };
        let label = match node.get_revision().as_deref() {
            Some(rev) => format!("{} ({})", node.get_id(), rev),
            None => node.get_id().to_string(),
        };
        tree.push_str(&format!("{}{}\n", twig, label));
    }
    tree
}

struct Frame {
    id: ModuleId,
    index: NodeIndex,
    manifest: Arc<Manifest>,
    next: usize,
}

/// Walks the graph from `root` depth-first in declaration order.
///
/// Modules whose cache path cannot be used are recorded as pending and their
/// subtrees are left for a later pass. Manifest errors stop only the branch
/// they occur in so one pass reports every problem it can find.
///
/// The claims held by `resolver` outlive the pass, so a module keeps the
/// cache path it was first given no matter which requester reaches it first
/// in a later pass.
pub fn build_pass(
    root: Arc<Manifest>,
    memo: &mut ManifestMemo,
    resolver: &mut Resolver,
    fetched: &HashSet<ModuleId>,
) -> Pass {
    let mut graph = DependencyGraph::new();
    let mut marks: HashMap<ModuleId, Mark> = HashMap::new();
    let mut pending = BTreeMap::new();
    let mut errors = Vec::new();

    let root_id = root.get_id().clone();
    let root_index = graph.add_node(root_id.clone(), ResolvedModule::root(root.clone()));
    marks.insert(root_id.clone(), Mark::Gray);
    let mut stack = vec![Frame {
        id: root_id,
        index: root_index,
        manifest: root,
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        // leave the module once every reference is explored
        if frame.next >= frame.manifest.get_references().len() {
            marks.insert(frame.id.clone(), Mark::Black);
            stack.pop();
            continue;
        }
        let position = frame.next;
        frame.next += 1;
        let reference: ExternalReference = frame.manifest.get_references()[position].clone();
        let requester = frame.id.clone();
        let parent = frame.index;
        let manifest = frame.manifest.clone();

        let target = match resolver.resolve(&reference, &requester, &manifest) {
            Ok(t) => t,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        match marks.get(target.get_id()).copied().unwrap_or(Mark::White) {
            Mark::Gray => {
                let start = stack
                    .iter()
                    .position(|f| &f.id == target.get_id())
                    .unwrap_or(0);
                let mut path: Vec<ModuleId> = stack[start..].iter().map(|f| f.id.clone()).collect();
                path.push(target.get_id().clone());
                errors.push(Error::CyclicDependency(CyclePath(path)));
            }
            Mark::Black => {
                // diamonds share the node that already exists
                if let Some(node) = graph.get_node_by_key(target.get_id()) {
                    let index = node.index();
                    if graph.add_edge_by_index(parent, index, position).is_ok() == false {
                        tracing::debug!("{} already depends on {}", requester, target.get_id());
                    }
                }
            }
            Mark::White => {
                marks.insert(target.get_id().clone(), Mark::Black);
                let origin = match target.is_local() {
                    true => Origin::Local,
                    false => {
                        let status = CacheStatus::probe(
                            target.get_path(),
                            target.get_location(),
                            target.get_revision(),
                        );
                        if status.is_usable() == false {
                            tracing::debug!("{} is not available at {:?}", target.get_id(), target.get_path());
                            pending.insert(target.get_id().clone(), FetchJob::new(&target, &requester));
                            continue;
                        }
                        if status == CacheStatus::Untracked {
                            let warning = Warning::UntrackedCache {
                                module: target.get_id().clone(),
                                path: target.get_path().clone(),
                            };
                            resolver.record(warning);
                        }
                        match fetched.contains(target.get_id()) {
                            true => Origin::Fetched,
                            false => Origin::Cached,
                        }
                    }
                };
                let child = match memo.load(target.get_path()) {
                    Ok(m) => m,
                    Err(e) => {
                        errors.push(e);
                        continue;
                    }
                };
                let index = graph.add_node(target.get_id().clone(), into_module(target.clone(), origin, child.clone()));
                graph.add_edge_by_index(parent, index, position);
                marks.insert(target.get_id().clone(), Mark::Gray);
                stack.push(Frame {
                    id: target.get_id().clone(),
                    index: index,
                    manifest: child,
                    next: 0,
                });
            }
        }
    }

    let warnings = resolver.take_warnings();
    Pass {
        graph: graph,
        root: root_index,
        pending: pending,
        errors: errors,
        warnings: warnings,
    }
}

fn into_module(target: ResolvedRef, origin: Origin, manifest: Arc<Manifest>) -> ResolvedModule {
    ResolvedModule::new(
        target.get_id().clone(),
        *target.get_kind(),
        target.get_location().to_string(),
        target.get_revision().clone(),
        target.get_path().clone(),
        origin,
        manifest,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::manifest::MANIFEST_FILE;

    /// Writes a manifest with `text` into `root/dir`.
    fn module(root: &Path, dir: &str, text: &str) -> PathBuf {
        let path = root.join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join(MANIFEST_FILE), text).unwrap();
        path
    }

    fn walk(top: &Path) -> Pass {
        let mut memo = ManifestMemo::new();
        let root = memo.load(top).unwrap();
        build_pass(root, &mut memo, &mut Resolver::new(None), &HashSet::new())
    }

    fn order_names(pass: &Pass) -> Vec<String> {
        pass.build_order()
            .into_iter()
            .map(|i| pass.get_graph().get_key_by_index(i).unwrap().derived_name().to_string())
            .collect()
    }

    #[test]
    fn diamond_shares_one_node() {
        let dir = tempfile::tempdir().unwrap();
        let top = module(dir.path(), "top", "[modules]\nlocal = [\"../a\", \"../b\"]\n");
        module(dir.path(), "a", "[modules]\nlocal = [\"../c\"]\n");
        module(dir.path(), "b", "[modules]\nlocal = [\"../c\"]\n");
        module(dir.path(), "c", "");
        let pass = walk(&top);
        assert_eq!(pass.is_complete(), true);
        assert_eq!(pass.get_graph().node_count(), 4);
        assert_eq!(pass.get_graph().get_graph().edge_count(), 4);
        assert_eq!(order_names(&pass), vec!["c", "a", "b", "top"]);
    }

    #[test]
    fn cycle_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let top = module(dir.path(), "top", "[modules]\nlocal = [\"../x\"]\n");
        module(dir.path(), "x", "[modules]\nlocal = [\"../y\"]\n");
        module(dir.path(), "y", "[modules]\nlocal = [\"../x\"]\n");
        let pass = walk(&top);
        let x = ModuleId::from_dir(&crate::util::filesystem::normalize(dir.path().join("x")));
        let y = ModuleId::from_dir(&crate::util::filesystem::normalize(dir.path().join("y")));
        assert_eq!(
            pass.get_errors(),
            &vec![Error::CyclicDependency(CyclePath(vec![x.clone(), y, x]))]
        );
    }

    #[test]
    fn branch_errors_are_all_collected() {
        let dir = tempfile::tempdir().unwrap();
        let top = module(dir.path(), "top", "[modules]\nlocal = [\"../a\", \"../missing\", \"../b\"]\n");
        module(dir.path(), "a", "bogus = 1\n");
        module(dir.path(), "b", "");
        let pass = walk(&top);
        assert_eq!(pass.get_errors().len(), 2);
        assert!(matches!(pass.get_errors()[0], Error::ManifestMalformed(..)));
        assert!(matches!(pass.get_errors()[1], Error::ManifestNotFound(..)));
        // the healthy branch is still walked
        assert_eq!(pass.get_graph().node_count(), 2);
    }

    #[test]
    fn absent_git_modules_are_pending() {
        let dir = tempfile::tempdir().unwrap();
        let top = module(
            dir.path(),
            "top",
            "fetchto = \"ip\"\n[modules]\ngit = [\"git@github.com:hdl-util/hdmi.git::master\"]\n",
        );
        let pass = walk(&top);
        assert_eq!(pass.get_errors().len(), 0);
        let job = pass.get_pending().get(&ModuleId::new("github.com/hdl-util/hdmi")).unwrap();
        assert_eq!(job.get_path(), &crate::util::filesystem::normalize(top.join("ip/hdmi")));
        assert_eq!(pass.is_complete(), false);
    }

    #[test]
    fn untracked_directories_are_used() {
        let dir = tempfile::tempdir().unwrap();
        let top = module(
            dir.path(),
            "top",
            "fetchto = \"ip\"\n[modules]\ngit = [\"https://github.com/hdl-util/sound.git\"]\n",
        );
        module(&top, "ip/sound", "files = [\"sound.sv\"]\n");
        let pass = walk(&top);
        assert_eq!(pass.is_complete(), true);
        assert!(matches!(pass.get_warnings()[0], Warning::UntrackedCache { .. }));
        let node = pass
            .get_graph()
            .get_node_by_key(&ModuleId::new("github.com/hdl-util/sound"))
            .unwrap();
        assert_eq!(node.as_ref().get_origin(), Origin::Cached);
    }

    #[test]
    fn tree_follows_declarations() {
        let dir = tempfile::tempdir().unwrap();
        let top = module(dir.path(), "top", "[modules]\nlocal = [\"../a\", \"../b\"]\n");
        module(dir.path(), "a", "[modules]\nlocal = [\"../c\"]\n");
        module(dir.path(), "b", "");
        module(dir.path(), "c", "");
        let pass = walk(&top);
        let text = tree_to_string(pass.get_graph(), pass.get_root());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("top"));
        assert!(lines[1].starts_with("├─ ") && lines[1].ends_with("/a"));
        assert!(lines[2].starts_with("│  └─ ") && lines[2].ends_with("/c"));
        assert!(lines[3].starts_with("└─ ") && lines[3].ends_with("/b"));
    }
}
