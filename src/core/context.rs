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

use super::config::{Config, Configs, Locality, CONFIG_FILE};
use super::extgit::ExtGit;
use super::manifest::Manifest;
use super::session::{self, Session};
use crate::error::Error;
use crate::util::filesystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CONFIG_ENV: &str = "HDLFETCH_CONFIG";
pub const FETCH_DIR_ENV: &str = "HDLFETCH_FETCH_DIR";
pub const JOBS_ENV: &str = "HDLFETCH_JOBS";

/// Everything known about how to run a session before it starts.
#[derive(Debug, PartialEq)]
pub struct Context {
    manifest_dir: PathBuf,
    fetch_dir: Option<PathBuf>,
    jobs: usize,
    git: Option<String>,
    offline: bool,
}

impl Context {
    pub fn new() -> Context {
        Context {
            manifest_dir: PathBuf::new(),
            fetch_dir: None,
            jobs: session::default_jobs(),
            git: None,
            offline: false,
        }
    }

    /// Sets the root manifest.
    ///
    /// Without `path`, the nearest directory holding a manifest is searched
    /// for from the current working directory upward.
    pub fn manifest(mut self, path: Option<&Path>) -> Result<Context, ContextError> {
        let cwd = std::env::current_dir().map_err(|e| ContextError(e.to_string()))?;
        self.manifest_dir = match path {
            Some(p) => {
                let p = filesystem::resolve_rel_path(&cwd, p);
                match p.is_file() {
                    true => p.parent().map(|d| d.to_path_buf()).unwrap_or(p),
                    false => p,
                }
            }
            None => match Self::find_manifest_dir(&cwd) {
                Some(dir) => dir,
                None => {
                    return Err(ContextError(format!(
                        "no manifest was found in {:?} or any of its parents",
                        cwd
                    )))
                }
            },
        };
        Ok(self)
    }

    /// Finds the nearest directory at or above `dir` that holds a manifest.
    pub fn find_manifest_dir(dir: &Path) -> Option<PathBuf> {
        let mut cwd = dir.to_path_buf();
        loop {
            if Manifest::exists_in(&cwd) == true {
                break Some(cwd);
            } else if cwd.pop() == false {
                break None;
            }
        }
    }

    /// Applies the configuration layers: the file named by `key` in the
    /// environment and the configuration file beside the root manifest.
    pub fn configs(self, key: &str) -> Result<Context, Error> {
        let mut configs = Configs::new();
        if let Ok(global) = std::env::var(key) {
            configs = configs.load(PathBuf::from(global), Locality::Global)?;
        }
        let local = self.manifest_dir.join(CONFIG_FILE);
        if local.is_file() == true {
            configs = configs.load(local, Locality::Local)?;
        }
        Ok(self.config(Config::from(configs)))
    }

    /// Applies the values set in `cfg`.
    pub fn config(mut self, cfg: Config) -> Context {
        if let Some(general) = cfg.get_general() {
            if let Some(dir) = general.get_fetch_dir() {
                self.fetch_dir = Some(dir);
            }
            if let Some(n) = general.get_jobs() {
                self.jobs = n;
            }
            if let Some(git) = general.get_git() {
                self.git = Some(git.clone());
            }
            self.offline = general.is_offline();
        }
        self
    }

    /// Applies the environment variable overrides read through `lookup`.
    pub fn env_overrides<F>(mut self, lookup: F) -> Result<Context, ContextError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(FETCH_DIR_ENV) {
            self.fetch_dir = Some(PathBuf::from(dir));
        }
        if let Some(n) = lookup(JOBS_ENV) {
            self.jobs = match n.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ContextError(format!(
                        "{} must be a positive number but is \"{}\"",
                        JOBS_ENV, n
                    )))
                }
            };
        }
        Ok(self)
    }

    /// Applies the command-line flags, which take precedence over everything.
    pub fn flags(mut self, fetch_dir: Option<PathBuf>, jobs: Option<usize>, offline: bool) -> Context {
        if let Some(dir) = fetch_dir {
            self.fetch_dir = Some(dir);
        }
        if let Some(n) = jobs {
            self.jobs = n;
        }
        if offline == true {
            self.offline = true;
        }
        self
    }

    pub fn get_manifest_dir(&self) -> &PathBuf {
        &self.manifest_dir
    }

    pub fn get_fetch_dir(&self) -> Option<&PathBuf> {
        self.fetch_dir.as_ref()
    }

    pub fn get_jobs(&self) -> usize {
        self.jobs
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Creates a session fetching through the git command.
    pub fn session(&self) -> Result<Session, ContextError> {
        let cwd = std::env::current_dir().map_err(|e| ContextError(e.to_string()))?;
        let fetch_dir = self
            .fetch_dir
            .as_ref()
            .map(|d| filesystem::resolve_rel_path(&cwd, d));
        let git = ExtGit::new().command(self.git.clone());
        Ok(Session::new(&self.manifest_dir, Arc::new(git))
            .fetch_dir(fetch_dir)
            .jobs(self.jobs)
            .offline(self.offline))
    }
}

#[derive(Debug, PartialEq)]
pub struct ContextError(pub String);

impl std::error::Error for ContextError {}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::manifest::MANIFEST_FILE;
    use std::str::FromStr;

    #[test]
    fn finds_nearest_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("rtl").join("sub");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "").unwrap();
        assert_eq!(Context::find_manifest_dir(&nested), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn flags_override_env_override_config() {
        let cfg = Config::from_str("[general]\nfetch-dir = \"/cfg/ip\"\njobs = 3\noffline = true\n").unwrap();
        let ctx = Context::new().config(cfg);
        assert_eq!(ctx.get_fetch_dir(), Some(&PathBuf::from("/cfg/ip")));
        assert_eq!(ctx.get_jobs(), 3);
        assert_eq!(ctx.is_offline(), true);

        let ctx = ctx
            .env_overrides(|key| match key {
                FETCH_DIR_ENV => Some(String::from("/env/ip")),
                JOBS_ENV => Some(String::from("8")),
                _ => None,
            })
            .unwrap();
        assert_eq!(ctx.get_fetch_dir(), Some(&PathBuf::from("/env/ip")));
        assert_eq!(ctx.get_jobs(), 8);

        let ctx = ctx.flags(Some(PathBuf::from("/cli/ip")), None, false);
        assert_eq!(ctx.get_fetch_dir(), Some(&PathBuf::from("/cli/ip")));
        assert_eq!(ctx.get_jobs(), 8);
    }

    #[test]
    fn bad_jobs_variable() {
        let err = Context::new()
            .env_overrides(|key| match key {
                JOBS_ENV => Some(String::from("zero")),
                _ => None,
            })
            .unwrap_err();
        assert!(err.to_string().contains(JOBS_ENV));
    }
}
