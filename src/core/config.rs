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

use crate::error::{Error, LastError};
use crate::util::filesystem;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, PartialEq, Clone)]
pub enum Locality {
    /// Named by the environment for every project.
    Global,
    /// Beside the root manifest.
    Local,
    /// Reached through an `include` entry.
    Other,
}

#[derive(Debug, PartialEq)]
pub struct Configs {
    inner: Vec<(PathBuf, Config, Locality)>,
}

impl Configs {
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }

    /// Loads the configuration `file` and every file it includes.
    ///
    /// Files already loaded are skipped so include loops terminate.
    pub fn load(self, file: PathBuf, lvl: Locality) -> Result<Self, Error> {
        let mut configs = self.inner;
        let mut set: HashSet<PathBuf> = configs.iter().map(|(p, _, _)| p.clone()).collect();

        let file = filesystem::absolute(&file).map_err(|e| Error::ConfigMalformed(file.clone(), LastError(e.to_string())))?;
        let mut to_process = vec![(file, lvl)];
        while let Some((path, local)) = to_process.pop() {
            if set.insert(path.clone()) == false {
                continue;
            }
            let cfg = Config::from_file(&path)?;
            let base = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
            // access its neighboring files in their listed order
            for next in cfg.get_includes().into_iter().rev() {
                to_process.push((filesystem::resolve_rel_path(&base, next), Locality::Other));
            }
            configs.push((path, cfg, local));
        }
        Ok(Self { inner: configs })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl From<Configs> for Config {
    /// Transform the multi-layered configurations into a single level.
    ///
    /// This function processes configurations in the following order:
    /// 1. LOCAL
    /// 2. GLOBAL
    /// 3. INCLUDES (first to last)
    ///
    /// Once a value is set (not None), then it will not be overridden by any
    /// configuration file later in the processing order.
    fn from(value: Configs) -> Self {
        let mut single = Config::new();
        let mut value = value;
        let local = value.inner.iter().position(|p| p.2 == Locality::Local);
        if let Some(i) = local {
            single.append(value.inner.remove(i).1);
        }
        let global = value.inner.iter().position(|p| p.2 == Locality::Global);
        if let Some(i) = global {
            single.append(value.inner.remove(i).1);
        }
        value.inner.into_iter().for_each(|p| {
            single.append(p.1);
        });
        single
    }
}

#[derive(PartialEq, Debug, Serialize, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct General {
    #[serde(rename = "fetch-dir")]
    fetch_dir: Option<String>,
    jobs: Option<usize>,
    git: Option<String>,
    offline: Option<bool>,
}

impl General {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_fetch_dir(&self) -> Option<PathBuf> {
        self.fetch_dir.as_ref().map(|p| PathBuf::from(p))
    }

    pub fn get_jobs(&self) -> Option<usize> {
        self.jobs
    }

    pub fn get_git(&self) -> Option<&String> {
        self.git.as_ref()
    }

    pub fn is_offline(&self) -> bool {
        self.offline.unwrap_or(false)
    }

    /// Merges any populated data from `rhs` into attributes that do not already
    /// have data defined in `self`.
    pub fn merge(&mut self, rhs: Option<Self>) {
        if let Some(rhs) = rhs {
            if self.fetch_dir.is_none() == true {
                self.fetch_dir = rhs.fetch_dir;
            }
            if self.jobs.is_none() == true {
                self.jobs = rhs.jobs;
            }
            if self.git.is_none() == true {
                self.git = rhs.git;
            }
            if self.offline.is_none() == true {
                self.offline = rhs.offline;
            }
        }
    }
}

#[derive(PartialEq, Debug, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    include: Option<Vec<PathBuf>>,
    general: Option<General>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the configuration file at `path`.
    ///
    /// A relative `fetch-dir` is resolved against the file's own directory.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::ConfigMalformed(path.to_path_buf(), LastError(e.to_string())))?;
        let mut cfg = Self::from_str(&contents)
            .map_err(|e| Error::ConfigMalformed(path.to_path_buf(), LastError(e.to_string().trim_end().to_string())))?;
        let base = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
        if let Some(general) = &mut cfg.general {
            if let Some(dir) = &general.fetch_dir {
                general.fetch_dir = Some(filesystem::into_std_str(&filesystem::resolve_rel_path(&base, dir)));
            }
        }
        Ok(cfg)
    }

    /// Adds the new information to the existing configuration to combine data.
    ///
    /// Existing data in `self` has precedence over any incoming data from `rhs`.
    pub fn append(&mut self, rhs: Self) {
        match &mut self.include {
            Some(v) => v.append(&mut rhs.include.unwrap_or(Vec::new())),
            None => self.include = rhs.include,
        }
        match &mut self.general {
            Some(v) => v.merge(rhs.general),
            None => self.general = rhs.general,
        }
    }

    pub fn get_includes(&self) -> Vec<&PathBuf> {
        match &self.include {
            Some(i) => i.iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn get_general(&self) -> Option<&General> {
        self.general.as_ref()
    }
}

impl FromStr for Config {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}
