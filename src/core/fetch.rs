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

//! Dispatches fetches for missing modules and decides whether a cache path
//! already holds a module at the required revision.

use super::module::ModuleId;
use super::reference::Revision;
use super::resolver::ResolvedRef;
use crate::util::url::Url;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// File written inside a fetched module recording what was fetched there.
pub const STAMP_FILE: &str = ".hdlfetch-rev";

/// The collaborator that materializes a module at a destination.
///
/// Calling `fetch` again with the same arguments must leave the destination
/// in the same state.
pub trait Fetch: Send + Sync {
    fn fetch(&self, location: &str, revision: Option<&str>, destination: &Path) -> Result<(), FetchError>;
}

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("failed to run {0:?}: {1}")]
    Spawn(String, String),
    #[error("exited with error code: {0}")]
    ExitCode(i32),
    #[error("terminated by signal")]
    Signal,
    #[error("{0}")]
    Io(String),
    #[error("destination {0:?} does not exist after fetching")]
    MissingDestination(PathBuf),
    #[error("fetching is disabled while offline")]
    Offline,
    #[error("module is still unavailable after it was fetched")]
    Unavailable,
    #[error("fetch task stopped unexpectedly: {0}")]
    Task(String),
}

impl From<std::io::Error> for FetchError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<fs_extra::error::Error> for FetchError {
    fn from(value: fs_extra::error::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// A module that must be fetched before its subtree can be explored.
#[derive(Debug, PartialEq, Clone)]
pub struct FetchJob {
    id: ModuleId,
    location: String,
    revision: Revision,
    path: PathBuf,
    requester: ModuleId,
}

impl FetchJob {
    pub fn new(target: &ResolvedRef, requester: &ModuleId) -> Self {
        Self {
            id: target.get_id().clone(),
            location: target.get_location().to_string(),
            revision: target.get_revision().clone(),
            path: target.get_path().clone(),
            requester: requester.clone(),
        }
    }

    pub fn get_id(&self) -> &ModuleId {
        &self.id
    }

    pub fn get_path(&self) -> &PathBuf {
        &self.path
    }

    /// Reports this job as not completed due to `error`.
    pub fn fail(self, error: FetchError) -> FetchFailure {
        FetchFailure {
            module: self.id,
            location: self.location,
            revision: self.revision,
            requester: self.requester,
            error: error,
        }
    }
}

/// A module that is still missing or at the wrong revision.
#[derive(Debug, PartialEq, Clone)]
pub struct FetchFailure {
    module: ModuleId,
    location: String,
    revision: Revision,
    requester: ModuleId,
    error: FetchError,
}

impl FetchFailure {
    pub fn get_module(&self) -> &ModuleId {
        &self.module
    }

    pub fn get_error(&self) -> &FetchError {
        &self.error
    }

    pub fn is_offline(&self) -> bool {
        self.error == FetchError::Offline
    }
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} at {}, required by {}): {}",
            self.module, self.location, self.revision, self.requester, self.error
        )
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Stamp {
    location: String,
    revision: Option<String>,
}

/// Records that `location` at `revision` now lives in `dir`.
pub fn write_stamp(dir: &Path, location: &str, revision: &Revision) -> Result<(), FetchError> {
    let stamp = Stamp {
        location: location.to_string(),
        revision: revision.as_deref().map(|r| r.to_string()),
    };
    let text = toml::to_string(&stamp).map_err(|e| FetchError::Io(e.to_string()))?;
    std::fs::write(dir.join(STAMP_FILE), text)?;
    Ok(())
}

#[derive(Debug, PartialEq)]
pub enum CacheStatus {
    /// Fetched earlier at the required revision.
    Present,
    /// The directory exists but was not fetched by this tool.
    Untracked,
    /// Fetched earlier at a different location or revision.
    Stale,
    Missing,
}

impl CacheStatus {
    /// Inspects the cache path `dir` for a module fetched from `location` at
    /// `revision`.
    pub fn probe(dir: &Path, location: &str, revision: &Revision) -> Self {
        if dir.is_dir() == false {
            return Self::Missing;
        }
        let text = match std::fs::read_to_string(dir.join(STAMP_FILE)) {
            Ok(t) => t,
            Err(_) => return Self::Untracked,
        };
        match toml::from_str::<Stamp>(&text) {
            Ok(stamp) => {
                match same_location(&stamp.location, location) && stamp.revision.as_deref() == revision.as_deref() {
                    true => Self::Present,
                    false => Self::Stale,
                }
            }
            Err(_) => Self::Stale,
        }
    }

    /// Checks if the cache path can be used without fetching.
    pub fn is_usable(&self) -> bool {
        match self {
            Self::Present | Self::Untracked => true,
            Self::Stale | Self::Missing => false,
        }
    }
}

/// Checks if two spellings of a location name the same repository.
fn same_location(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (Url::from_str(a), Url::from_str(b)) {
        (Ok(x), Ok(y)) => x.canonical() == y.canonical(),
        _ => false,
    }
}

/// Runs fetch jobs concurrently, never more than `jobs` at a time.
pub struct Orchestrator {
    fetcher: Arc<dyn Fetch>,
    jobs: usize,
}

impl Orchestrator {
    pub fn new(fetcher: Arc<dyn Fetch>, jobs: usize) -> Self {
        Self {
            fetcher: fetcher,
            jobs: jobs.max(1),
        }
    }

    /// Fetches every job in `wave`.
    ///
    /// A failing job does not stop the others. The failures are returned
    /// sorted by module identity.
    pub async fn run(&self, wave: Vec<FetchJob>) -> Vec<FetchFailure> {
        tracing::info!("fetching {} module(s) with up to {} job(s)", wave.len(), self.jobs);
        let limit = Arc::new(Semaphore::new(self.jobs));
        let mut set = JoinSet::new();
        // jobs whose task has not reported back yet
        let mut outstanding: BTreeMap<ModuleId, FetchJob> = BTreeMap::new();

        for job in wave {
            outstanding.insert(job.id.clone(), job.clone());
            let limit = limit.clone();
            let fetcher = self.fetcher.clone();
            set.spawn(async move {
                let _permit = match limit.acquire_owned().await {
                    Ok(p) => p,
                    Err(e) => return Err(job.fail(FetchError::Task(e.to_string()))),
                };
                let location = job.location.clone();
                let revision = job.revision.clone();
                let path = job.path.clone();
                let result = tokio::task::spawn_blocking(move || fetch_one(fetcher.as_ref(), &location, &revision, &path))
                    .await
                    .unwrap_or_else(|e| Err(FetchError::Task(e.to_string())));
                match result {
                    Ok(()) => Ok(job),
                    Err(e) => Err(job.fail(e)),
                }
            });
        }

        let mut failures = Vec::new();
        let mut lost: Option<String> = None;
        while let Some(result) = set.join_next().await {
            match result {
                Ok(Ok(job)) => {
                    tracing::debug!("fetched {} into {:?}", job.id, job.path);
                    outstanding.remove(&job.id);
                }
                Ok(Err(failure)) => {
                    tracing::error!(module = %failure.module, error = %failure.error, "fetch failed");
                    outstanding.remove(&failure.module);
                    failures.push(failure);
                }
                Err(e) => {
                    tracing::error!("fetch task stopped: {}", e);
                    lost = Some(e.to_string());
                }
            }
        }
        // a task that died never returned its job
        for job in outstanding.into_values() {
            let reason = lost.clone().unwrap_or_else(|| String::from("no result was returned"));
            failures.push(job.fail(FetchError::Task(reason)));
        }
        failures.sort_by(|a, b| a.module.cmp(&b.module));
        failures
    }
}

/// Calls the collaborator and confirms the destination afterward.
fn fetch_one(fetcher: &dyn Fetch, location: &str, revision: &Revision, dest: &Path) -> Result<(), FetchError> {
    fetcher.fetch(location, revision.as_deref(), dest)?;
    if dest.is_dir() == false {
        return Err(FetchError::MissingDestination(dest.to_path_buf()));
    }
    write_stamp(dest, location, revision)
}
