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

use super::manifest::Manifest;
use super::reference::{RefKind, Revision};
use serde_derive::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The canonical identity of a module.
///
/// Git modules are identified by their normalized `host/path` location while
/// local modules and the root manifest are identified by their directory.
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }

    /// Creates the identity of a module that lives in the directory `dir`.
    pub fn from_dir(dir: &Path) -> Self {
        Self(crate::util::filesystem::into_std_str(dir))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final path segment of the identity, used to name the module's
    /// directory inside a fetch destination.
    pub fn derived_name(&self) -> &str {
        let trimmed = self.0.trim_end_matches('/');
        match trimmed.rsplit_once('/') {
            Some((_, name)) if name.is_empty() == false => name,
            _ => trimmed,
        }
    }
}

impl Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the content of a module came from during a resolution session.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The top-level manifest the session started from.
    Root,
    /// A directory on the local filesystem referenced in place.
    Local,
    /// Already present in the fetch destination at the required revision.
    Cached,
    /// Fetched by this session.
    Fetched,
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Local => write!(f, "local"),
            Self::Cached => write!(f, "cached"),
            Self::Fetched => write!(f, "fetched"),
        }
    }
}

/// A module reached during graph building, shared by every manifest that
/// depends on it.
#[derive(Debug, PartialEq)]
pub struct ResolvedModule {
    id: ModuleId,
    kind: Option<RefKind>,
    location: String,
    revision: Revision,
    path: PathBuf,
    origin: Origin,
    manifest: Arc<Manifest>,
}

impl ResolvedModule {
    /// Creates the synthetic node for the top-level manifest.
    pub fn root(manifest: Arc<Manifest>) -> Self {
        Self {
            id: manifest.get_id().clone(),
            kind: None,
            location: crate::util::filesystem::into_std_str(manifest.get_root()),
            revision: Revision::default(),
            path: manifest.get_root().to_path_buf(),
            origin: Origin::Root,
            manifest: manifest,
        }
    }

    pub fn new(
        id: ModuleId,
        kind: RefKind,
        location: String,
        revision: Revision,
        path: PathBuf,
        origin: Origin,
        manifest: Arc<Manifest>,
    ) -> Self {
        Self {
            id,
            kind: Some(kind),
            location,
            revision,
            path,
            origin,
            manifest,
        }
    }

    pub fn get_id(&self) -> &ModuleId {
        &self.id
    }

    /// Returns `None` for the synthetic root node.
    pub fn get_kind(&self) -> Option<&RefKind> {
        self.kind.as_ref()
    }

    pub fn get_location(&self) -> &str {
        &self.location
    }

    pub fn get_revision(&self) -> &Revision {
        &self.revision
    }

    pub fn get_path(&self) -> &PathBuf {
        &self.path
    }

    pub fn get_origin(&self) -> Origin {
        self.origin
    }

    pub fn get_manifest(&self) -> &Manifest {
        &self.manifest
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derived_name() {
        assert_eq!(ModuleId::new("github.com/hdl-util/hdmi").derived_name(), "hdmi");
        assert_eq!(ModuleId::new("/work/ip/common/").derived_name(), "common");
        assert_eq!(ModuleId::new("sdram").derived_name(), "sdram");
    }
}
