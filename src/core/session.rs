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

//! A resolution session drives graph passes and fetch waves until every
//! reachable module is available, then merges the file lists.

use super::algo::{self, DependencyGraph, ManifestMemo};
use super::blueprint::BuildFileList;
use super::fetch::{Fetch, FetchError, FetchFailure, FetchJob, Orchestrator};
use super::lockfile::Report;
use super::module::ModuleId;
use super::resolver::Resolver;
use crate::error::{Error, Failure};
use crate::util::graph::NodeIndex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The outcome of a successful resolution.
#[derive(Debug)]
pub struct Resolution {
    files: BuildFileList,
    graph: DependencyGraph,
    root: NodeIndex,
    order: Vec<NodeIndex>,
    report: Report,
}

impl Resolution {
    pub fn get_files(&self) -> &BuildFileList {
        &self.files
    }

    pub fn get_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn get_root(&self) -> NodeIndex {
        self.root
    }

    /// Module indices with every dependency before its dependents.
    pub fn get_order(&self) -> &Vec<NodeIndex> {
        &self.order
    }

    pub fn get_report(&self) -> &Report {
        &self.report
    }

    /// Renders the dependency tree in declaration order.
    pub fn tree(&self) -> String {
        algo::tree_to_string(&self.graph, self.root)
    }
}

/// Owns the state shared by every step of resolving one root manifest.
pub struct Session {
    manifest: PathBuf,
    fetch_dir: Option<PathBuf>,
    jobs: usize,
    offline: bool,
    fetcher: Arc<dyn Fetch>,
    memo: ManifestMemo,
}

impl Session {
    /// Creates a session for the root manifest at `manifest` (a file or its
    /// directory) that fetches through `fetcher`.
    pub fn new(manifest: &Path, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            manifest: manifest.to_path_buf(),
            fetch_dir: None,
            jobs: default_jobs(),
            offline: false,
            fetcher: fetcher,
            memo: ManifestMemo::new(),
        }
    }

    /// Places every fetched module in `dir` instead of each manifest's
    /// `fetchto`.
    pub fn fetch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.fetch_dir = dir;
        self
    }

    /// Sets the most fetches allowed to run at once.
    pub fn jobs(mut self, n: usize) -> Self {
        self.jobs = n.max(1);
        self
    }

    /// Forbids calling the fetch collaborator.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn get_jobs(&self) -> usize {
        self.jobs
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Resolves the root manifest into a single ordered file list.
    ///
    /// Every error found is returned together; no partial list is produced.
    pub async fn resolve(&mut self) -> Result<Resolution, Failure> {
        let root = self.memo.load(&self.manifest)?;
        tracing::info!("resolving {}", root.get_id());
        let mut fetched: HashSet<ModuleId> = HashSet::new();
        // claims outlive each pass
        let mut resolver = Resolver::new(self.fetch_dir.clone());

        loop {
            let pass = algo::build_pass(root.clone(), &mut self.memo, &mut resolver, &fetched);
            let (graph, root_index, pending, errors, mut warnings) = pass.into_parts();
            if errors.is_empty() == false {
                return Err(Failure::new(errors));
            }

            if pending.is_empty() == true {
                let order = algo::build_order(&graph, root_index);
                let (files, mut file_warnings) = BuildFileList::merge(&graph, &order).map_err(Failure::new)?;
                warnings.append(&mut file_warnings);
                let report = Report::new(&graph, &order, warnings);
                tracing::info!("resolved {} module(s) and {} file(s)", order.len(), files.len());
                return Ok(Resolution {
                    files: files,
                    graph: graph,
                    root: root_index,
                    order: order,
                    report: report,
                });
            }

            if self.offline == true {
                return Err(Error::FetchIncomplete(fail_all(pending.into_values(), FetchError::Offline)).into());
            }

            // a module fetched once already cannot be made available this session
            let (repeated, wave): (Vec<FetchJob>, Vec<FetchJob>) =
                pending.into_values().partition(|j| fetched.contains(j.get_id()));
            if repeated.is_empty() == false {
                return Err(Error::FetchIncomplete(fail_all(repeated.into_iter(), FetchError::Unavailable)).into());
            }

            for job in &wave {
                fetched.insert(job.get_id().clone());
                self.memo.forget(job.get_path());
            }
            let failures = Orchestrator::new(self.fetcher.clone(), self.jobs).run(wave).await;
            if failures.is_empty() == false {
                return Err(Error::FetchIncomplete(failures).into());
            }
        }
    }
}

fn fail_all(jobs: impl Iterator<Item = FetchJob>, error: FetchError) -> Vec<FetchFailure> {
    jobs.map(|j| j.fail(error.clone())).collect()
}

/// The number of fetches run at once when none is configured.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
