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
use super::lockfile::Warning;
use super::module::ModuleId;
use crate::error::Error;
use crate::util::filesystem;
use crate::util::graph::NodeIndex;
use serde_derive::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const BLUEPRINT_FILE: &str = "blueprint.tsv";

/// A source file and the module that declared it.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct BuildFile {
    module: ModuleId,
    path: PathBuf,
}

impl BuildFile {
    pub fn get_module(&self) -> &ModuleId {
        &self.module
    }

    pub fn get_path(&self) -> &PathBuf {
        &self.path
    }
}

/// Every source file of a resolved project with dependencies listed before
/// their dependents.
#[derive(Debug, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct BuildFileList(Vec<BuildFile>);

impl BuildFileList {
    pub fn inner(&self) -> &Vec<BuildFile> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> Vec<&PathBuf> {
        self.0.iter().map(|f| f.get_path()).collect()
    }

    /// Merges the files of every module in `order`.
    ///
    /// Each module contributes its files in their declared order. A path
    /// declared twice is an error naming both owners, and every duplicate is
    /// reported. Files missing from disk only produce warnings.
    pub fn merge(graph: &DependencyGraph, order: &[NodeIndex]) -> Result<(Self, Vec<Warning>), Vec<Error>> {
        let mut files: Vec<BuildFile> = Vec::new();
        let mut owners: HashMap<PathBuf, ModuleId> = HashMap::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for index in order {
            let module = match graph.get_node_by_index(*index) {
                Some(n) => n.as_ref(),
                None => continue,
            };
            for path in module.get_manifest().file_paths() {
                if let Some(first) = owners.get(&path) {
                    errors.push(Error::DuplicateFile {
                        path: path,
                        first: first.clone(),
                        second: module.get_id().clone(),
                    });
                    continue;
                }
                if path.exists() == false {
                    let warning = Warning::MissingFile {
                        module: module.get_id().clone(),
                        path: path.clone(),
                    };
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                }
                owners.insert(path.clone(), module.get_id().clone());
                files.push(BuildFile {
                    module: module.get_id().clone(),
                    path: path,
                });
            }
        }

        match errors.is_empty() {
            true => Ok((Self(files), warnings)),
            false => Err(errors),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Format {
    /// One path per line.
    List,
    /// The owning module and the path separated by a tab on each line.
    Tsv,
}

impl Default for Format {
    fn default() -> Self {
        Self::List
    }
}

/// Renders a build file list for downstream tools.
pub struct Blueprint<'a> {
    format: Format,
    files: &'a BuildFileList,
}

impl<'a> Blueprint<'a> {
    pub fn new(files: &'a BuildFileList, fmt: Format) -> Self {
        Self {
            format: fmt,
            files: files,
        }
    }

    /// Writes the rendered list to `path`.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_string())
    }
}

impl<'a> std::fmt::Display for Blueprint<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for file in self.files.inner() {
            let path = filesystem::into_std_str(file.get_path());
            match self.format {
                Format::List => writeln!(f, "{}", path)?,
                Format::Tsv => writeln!(f, "{}\t{}", file.get_module(), path)?,
            }
        }
        Ok(())
    }
}
