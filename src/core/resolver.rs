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

//! Turns external references into canonical module identities and cache
//! paths, keeping track of every claim made so far in one graph pass.

use super::lockfile::Warning;
use super::manifest::Manifest;
use super::module::ModuleId;
use super::reference::{ExternalReference, RefKind, Revision};
use crate::error::Error;
use crate::util::filesystem;
use crate::util::url::{self, Url};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// An external reference after its identity and destination are known.
#[derive(Debug, PartialEq, Clone)]
pub struct ResolvedRef {
    id: ModuleId,
    kind: RefKind,
    location: String,
    revision: Revision,
    path: PathBuf,
}

impl ResolvedRef {
    pub fn get_id(&self) -> &ModuleId {
        &self.id
    }

    pub fn get_kind(&self) -> &RefKind {
        &self.kind
    }

    /// The location handed to the fetch collaborator.
    ///
    /// Filesystem locations are made absolute against the requesting manifest.
    pub fn get_location(&self) -> &str {
        &self.location
    }

    pub fn get_revision(&self) -> &Revision {
        &self.revision
    }

    pub fn get_path(&self) -> &PathBuf {
        &self.path
    }

    pub fn is_local(&self) -> bool {
        self.kind == RefKind::Local
    }
}

#[derive(Debug)]
struct Claim {
    revision: Revision,
    requester: ModuleId,
    path: PathBuf,
}

#[derive(Debug)]
pub struct Resolver {
    fetch_dir: Option<PathBuf>,
    claims: HashMap<ModuleId, Claim>,
    paths: HashMap<PathBuf, ModuleId>,
    warnings: Vec<Warning>,
    logged: HashSet<Warning>,
}

impl Resolver {
    /// Creates a resolver with no claims.
    ///
    /// When `fetch_dir` is set it replaces the `fetchto` of every manifest.
    pub fn new(fetch_dir: Option<PathBuf>) -> Self {
        Self {
            fetch_dir: fetch_dir.map(|p| filesystem::normalize(p)),
            claims: HashMap::new(),
            paths: HashMap::new(),
            warnings: Vec::new(),
            logged: HashSet::new(),
        }
    }

    /// Computes the canonical identity of `reference` as declared in the
    /// manifest living in `base`.
    pub fn identify(reference: &ExternalReference, base: &Path) -> ModuleId {
        match reference.get_kind() {
            RefKind::Local => ModuleId::from_dir(&filesystem::resolve_rel_path(
                base,
                reference.get_location(),
            )),
            RefKind::Git => match Url::from_str(reference.get_location()) {
                Ok(url) => ModuleId::new(&url.canonical()),
                // a repository on the filesystem is identified by its directory
                Err(_) => {
                    let path = filesystem::resolve_rel_path(base, strip_file_scheme(reference.get_location()));
                    let text = filesystem::into_std_str(&path);
                    ModuleId::new(&format!("/{}", url::trim_repo_path(&text)))
                }
            },
        }
    }

    /// Resolves `reference` declared by the module `requester` whose manifest
    /// is `manifest`.
    ///
    /// Resolving the same module again yields the path of the first claim.
    pub fn resolve(
        &mut self,
        reference: &ExternalReference,
        requester: &ModuleId,
        manifest: &Manifest,
    ) -> Result<ResolvedRef, Error> {
        let id = Self::identify(reference, manifest.get_root());
        let revision = reference.get_revision().clone();

        let (location, path) = match reference.get_kind() {
            RefKind::Local => {
                let dir = filesystem::resolve_rel_path(manifest.get_root(), reference.get_location());
                (filesystem::into_std_str(&dir), dir)
            }
            RefKind::Git => {
                let dest = match &self.fetch_dir {
                    Some(dir) => dir.clone(),
                    None => manifest.fetch_dir(),
                };
                (
                    Self::fetch_location(reference.get_location(), manifest.get_root()),
                    dest.join(id.derived_name()),
                )
            }
        };

        // the module was already claimed during this pass
        if let Some(claim) = self.claims.get(&id) {
            if claim.revision != revision {
                return Err(Error::RevisionConflict {
                    module: id,
                    first: claim.revision.clone(),
                    first_by: claim.requester.clone(),
                    second: revision,
                    second_by: requester.clone(),
                });
            }
            let claim_path = claim.path.clone();
            if claim_path != path {
                let warning = Warning::RelocatedModule {
                    module: id.clone(),
                    path: claim_path.clone(),
                    requested: path,
                    by: requester.clone(),
                };
                self.record(warning);
            }
            return Ok(ResolvedRef {
                path: claim_path,
                id: id,
                kind: *reference.get_kind(),
                location: location,
                revision: revision,
            });
        }

        if reference.get_kind() == &RefKind::Git {
            match self.paths.get(&path) {
                Some(other) if other != &id => {
                    return Err(Error::CachePathCollision {
                        path: path,
                        first: other.clone(),
                        second: id,
                    })
                }
                _ => {
                    self.paths.insert(path.clone(), id.clone());
                }
            }
        }

        tracing::debug!("resolved {} to {:?}", id, path);
        self.claims.insert(
            id.clone(),
            Claim {
                revision: revision.clone(),
                requester: requester.clone(),
                path: path.clone(),
            },
        );
        Ok(ResolvedRef {
            id: id,
            kind: *reference.get_kind(),
            location: location,
            revision: revision,
            path: path,
        })
    }

    /// Keeps `warning` for the current pass.
    ///
    /// Each distinct warning is logged only the first time it is seen.
    pub fn record(&mut self, warning: Warning) {
        if self.logged.insert(warning.clone()) == true {
            tracing::warn!("{}", warning);
        }
        self.warnings.push(warning);
    }

    /// Removes and returns the warnings recorded so far.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    fn fetch_location(location: &str, base: &Path) -> String {
        match Url::from_str(location) {
            Ok(_) => location.to_string(),
            Err(_) => filesystem::into_std_str(&filesystem::resolve_rel_path(
                base,
                strip_file_scheme(location),
            )),
        }
    }
}

fn strip_file_scheme(location: &str) -> &str {
    location.strip_prefix("file://").unwrap_or(location)
}

#[cfg(test)]
mod test {
    use super::*;

    fn manifest(dir: &str, text: &str) -> Manifest {
        Manifest::from_text(text, &PathBuf::from(dir).join("Manifest.toml")).unwrap()
    }

    #[test]
    fn identify_git_spellings() {
        let base = PathBuf::from("/work/top");
        let a = ExternalReference::git("git@github.com:hdl-util/hdmi.git", None);
        let b = ExternalReference::git("https://github.com/hdl-util/hdmi", None);
        assert_eq!(Resolver::identify(&a, &base), ModuleId::new("github.com/hdl-util/hdmi"));
        assert_eq!(Resolver::identify(&a, &base), Resolver::identify(&b, &base));
        // repositories on the filesystem
        let c = ExternalReference::git("../repos/sound.git", None);
        assert_eq!(Resolver::identify(&c, &base), ModuleId::new("/work/repos/sound"));
        let d = ExternalReference::git("file:///work/repos/sound.git", None);
        assert_eq!(Resolver::identify(&c, &base), Resolver::identify(&d, &base));
    }

    #[test]
    fn cache_path_is_deterministic() {
        let top = manifest("/work/top/board", "fetchto = \"../../ip_cores\"\n");
        let mut res = Resolver::new(None);
        let r = ExternalReference::git("git@github.com:hdl-util/hdmi.git", Some("master"));
        let first = res.resolve(&r, top.get_id(), &top).unwrap();
        let second = res.resolve(&r, top.get_id(), &top).unwrap();
        assert_eq!(first.get_path(), &PathBuf::from("/work/ip_cores/hdmi"));
        assert_eq!(first, second);
        assert_eq!(res.take_warnings().len(), 0);
    }

    #[test]
    fn conflicting_pins() {
        let a = manifest("/work/a", "");
        let b = manifest("/work/b", "");
        let mut res = Resolver::new(Some(PathBuf::from("/cache")));
        res.resolve(&ExternalReference::git("https://github.com/x/core.git", Some("v1.0")), a.get_id(), &a)
            .unwrap();
        let err = res
            .resolve(&ExternalReference::git("git@github.com:x/core.git", None), b.get_id(), &b)
            .unwrap_err();
        assert_eq!(
            err,
            Error::RevisionConflict {
                module: ModuleId::new("github.com/x/core"),
                first: Revision::new(Some("v1.0")),
                first_by: ModuleId::new("/work/a"),
                second: Revision::default(),
                second_by: ModuleId::new("/work/b"),
            }
        );
    }

    #[test]
    fn colliding_names() {
        let top = manifest("/work/top", "fetchto = \"ip\"\n");
        let mut res = Resolver::new(None);
        res.resolve(&ExternalReference::git("https://github.com/a/hdmi.git", None), top.get_id(), &top)
            .unwrap();
        let err = res
            .resolve(&ExternalReference::git("https://github.com/b/hdmi.git", None), top.get_id(), &top)
            .unwrap_err();
        assert_eq!(
            err,
            Error::CachePathCollision {
                path: PathBuf::from("/work/top/ip/hdmi"),
                first: ModuleId::new("github.com/a/hdmi"),
                second: ModuleId::new("github.com/b/hdmi"),
            }
        );
    }

    #[test]
    fn first_destination_wins() {
        let a = manifest("/work/a", "fetchto = \"deps\"\n");
        let b = manifest("/work/b", "fetchto = \"deps\"\n");
        let mut res = Resolver::new(None);
        let r = ExternalReference::git("https://github.com/x/core.git", None);
        res.resolve(&r, a.get_id(), &a).unwrap();
        let again = res.resolve(&r, b.get_id(), &b).unwrap();
        assert_eq!(again.get_path(), &PathBuf::from("/work/a/deps/core"));
        assert_eq!(
            res.take_warnings(),
            vec![Warning::RelocatedModule {
                module: ModuleId::new("github.com/x/core"),
                path: PathBuf::from("/work/a/deps/core"),
                requested: PathBuf::from("/work/b/deps/core"),
                by: ModuleId::new("/work/b"),
            }]
        );
    }

    #[test]
    fn local_references_stay_in_place() {
        let top = manifest("/work/top/board", "fetchto = \"ip\"\n");
        let mut res = Resolver::new(Some(PathBuf::from("/cache")));
        let r = res
            .resolve(&ExternalReference::local("../common"), top.get_id(), &top)
            .unwrap();
        assert_eq!(r.get_id(), &ModuleId::new("/work/top/common"));
        assert_eq!(r.get_path(), &PathBuf::from("/work/top/common"));
        assert_eq!(r.is_local(), true);
    }
}
