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

use super::module::ModuleId;
use super::reference::{ExternalReference, GitDecl};
use crate::error::{Error, LastError};
use crate::util::filesystem;
use serde_derive::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const MANIFEST_FILE: &str = "Manifest.toml";

/// The declarations exactly as written in a manifest file.
///
/// Every field may be left out; a missing field is the same as an empty one.
#[derive(Deserialize, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
struct ManifestDecl {
    files: Option<Vec<String>>,
    fetchto: Option<String>,
    modules: Option<ModulesDecl>,
}

#[derive(Deserialize, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
struct ModulesDecl {
    local: Option<Vec<String>>,
    git: Option<Vec<GitDecl>>,
}

impl FromStr for ManifestDecl {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

/// A module's local source files, its external dependencies, and where its
/// fetched dependencies are stored.
#[derive(Debug, PartialEq)]
pub struct Manifest {
    id: ModuleId,
    /// Absolute directory holding the manifest file.
    root: PathBuf,
    path: PathBuf,
    files: Vec<String>,
    references: Vec<ExternalReference>,
    fetchto: String,
}

impl Manifest {
    /// Reads the manifest at `path`.
    ///
    /// `path` may name the manifest file itself or the directory that holds a
    /// [MANIFEST_FILE].
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let path = filesystem::absolute(path)
            .map_err(|e| Error::ManifestNotFound(path.to_path_buf(), LastError(e.to_string())))?;
        let file = match path.is_dir() {
            true => path.join(MANIFEST_FILE),
            false => path,
        };
        let contents = std::fs::read_to_string(&file)
            .map_err(|e| Error::ManifestNotFound(file.clone(), LastError(e.to_string())))?;
        Self::from_text(&contents, &file)
    }

    /// Parses the manifest `text` as if it were read from the file `file`.
    ///
    /// `file` must be absolute since every relative path in the manifest is
    /// resolved against its parent directory.
    pub fn from_text(text: &str, file: &Path) -> Result<Self, Error> {
        let malformed = |msg: String| Error::ManifestMalformed(file.to_path_buf(), LastError(msg));

        let decl = ManifestDecl::from_str(text).map_err(|e| malformed(e.to_string().trim_end().to_string()))?;
        let root = match file.parent() {
            Some(p) => filesystem::normalize(p),
            None => return Err(malformed(String::from("manifest has no parent directory"))),
        };

        let files = decl.files.unwrap_or_default();
        if let Some(i) = files.iter().position(|f| f.trim().is_empty()) {
            return Err(malformed(format!("entry {} of \"files\" is empty", i + 1)));
        }

        // local references come before git references
        let mut references = Vec::new();
        let modules = decl.modules.unwrap_or_default();
        for (i, local) in modules.local.unwrap_or_default().into_iter().enumerate() {
            if local.trim().is_empty() == true {
                return Err(malformed(format!("entry {} of \"modules.local\" is empty", i + 1)));
            }
            references.push(ExternalReference::local(local.trim()));
        }
        for git in modules.git.unwrap_or_default() {
            references.push(git.0);
        }

        Ok(Self {
            id: ModuleId::from_dir(&root),
            root: root,
            path: file.to_path_buf(),
            files: files,
            references: references,
            fetchto: decl.fetchto.unwrap_or_default(),
        })
    }

    /// Checks if `dir` holds a manifest file.
    pub fn exists_in(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).is_file()
    }

    pub fn get_id(&self) -> &ModuleId {
        &self.id
    }

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    /// The local files in their declared order, exactly as written.
    pub fn get_files(&self) -> &Vec<String> {
        &self.files
    }

    /// The external references in declaration order.
    pub fn get_references(&self) -> &Vec<ExternalReference> {
        &self.references
    }

    pub fn get_fetchto(&self) -> &str {
        &self.fetchto
    }

    /// The absolute directory where this manifest's fetched modules belong.
    pub fn fetch_dir(&self) -> PathBuf {
        filesystem::resolve_rel_path(&self.root, &self.fetchto)
    }

    /// The local files resolved against the manifest's own directory.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|f| filesystem::resolve_rel_path(&self.root, f.trim()))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::reference::{RefKind, Revision};

    fn file() -> PathBuf {
        PathBuf::from("/work/top/mkrvidor4000").join(MANIFEST_FILE)
    }

    #[test]
    fn ut_full() {
        let man = Manifest::from_text(EX1, &file()).unwrap();
        assert_eq!(man.get_files(), &vec![String::from("mkrvidor4000_top.sv"), String::from("MIPI_RX_ST.v")]);
        assert_eq!(man.get_references().len(), 6);
        // local entries come first
        assert_eq!(man.get_references()[0], ExternalReference::local("../common"));
        assert_eq!(man.get_references()[1].get_kind(), &RefKind::Git);
        assert_eq!(man.get_references()[1].get_location(), "git@github.com:hdl-util/hdmi.git");
        assert_eq!(man.get_references()[1].get_revision(), &Revision::new(Some("master")));
        assert_eq!(man.get_fetchto(), "../../ip_cores");
        assert_eq!(man.fetch_dir(), PathBuf::from("/work/ip_cores"));
        assert_eq!(man.get_id(), &ModuleId::new("/work/top/mkrvidor4000"));
    }

    #[test]
    fn ut_minimal() {
        let man = Manifest::from_text("", &file()).unwrap();
        assert_eq!(man.get_files().len(), 0);
        assert_eq!(man.get_references().len(), 0);
        // no destination means the manifest's own directory
        assert_eq!(man.fetch_dir(), PathBuf::from("/work/top/mkrvidor4000"));
    }

    #[test]
    fn ut_files_are_manifest_local() {
        let man = Manifest::from_text(EX2, &file()).unwrap();
        assert_eq!(
            man.file_paths(),
            vec![
                PathBuf::from("/work/top/mkrvidor4000/rtl/top.sv"),
                PathBuf::from("/work/top/shared/pll.v"),
            ]
        );
    }

    #[test]
    fn ut_bad_shape() {
        let err = Manifest::from_text(ERR1, &file()).unwrap_err();
        assert!(matches!(err, Error::ManifestMalformed(..)));
        // unknown keys are rejected
        let err = Manifest::from_text("top_module = \"top\"\n", &file()).unwrap_err();
        assert!(matches!(err, Error::ManifestMalformed(..)));
        // empty file entries are rejected
        let err = Manifest::from_text("files = [\"a.v\", \" \"]\n", &file()).unwrap_err();
        assert_eq!(
            err,
            Error::ManifestMalformed(file(), LastError(String::from("entry 2 of \"files\" is empty")))
        );
        // empty revision pins are rejected
        let err = Manifest::from_text("[modules]\ngit = [\"https://x.org/a.git::\"]\n", &file()).unwrap_err();
        assert!(matches!(err, Error::ManifestMalformed(..)));
    }

    #[test]
    fn ut_from_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), EX2).unwrap();
        // by directory
        let man = Manifest::from_path(dir.path()).unwrap();
        assert_eq!(man.get_files().len(), 2);
        // by file
        let man = Manifest::from_path(&dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(man.get_path(), dir.path().join(MANIFEST_FILE));
        assert_eq!(Manifest::exists_in(dir.path()), true);
        // missing
        let err = Manifest::from_path(&dir.path().join("nested")).unwrap_err();
        assert!(matches!(err, Error::ManifestNotFound(..)));
    }

    const EX1: &str = r#"files = [
    "mkrvidor4000_top.sv",
    "MIPI_RX_ST.v"
]

fetchto = "../../ip_cores"

[modules]
local = ["../common"]
git = [
    "git@github.com:hdl-util/hdmi.git::master",
    "git@github.com:hdl-util/sound.git::master",
    "git@github.com:hdl-util/vga-text-mode.git::master",
    "git@github.com:hdl-util/mipi-ccs.git::master",
    "git@github.com:hdl-util/mipi-csi-2.git::master",
]
"#;

    const EX2: &str = r#"files = ["rtl/top.sv", "../shared/./pll.v"]
"#;

    const ERR1: &str = r#"files = "top.sv"
"#;
}
