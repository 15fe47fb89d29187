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

//! An external reference points to another module's location and an optional
//! pinned revision.

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Separates the location from the revision in the compact reference form.
pub const REVISION_DELIMITER: &str = "::";

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum RefKind {
    /// A repository fetched through the version-control collaborator.
    Git,
    /// A directory on the local filesystem, used in place.
    Local,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// A branch, tag, or commit-like pin.
///
/// An absent pin means the remote's default head; it is still compared like
/// any other pin, so `None` and `Some("master")` are different revisions.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct Revision(Option<String>);

impl Revision {
    pub fn new(rev: Option<&str>) -> Self {
        Self(rev.map(|r| r.to_string()))
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_pinned(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(r) => write!(f, "{:?}", r),
            None => write!(f, "the default branch"),
        }
    }
}

impl Serialize for Revision {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.0 {
            Some(r) => serializer.serialize_str(r),
            None => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct ExternalReference {
    kind: RefKind,
    location: String,
    revision: Revision,
}

impl ExternalReference {
    pub fn git(location: &str, revision: Option<&str>) -> Self {
        Self {
            kind: RefKind::Git,
            location: location.to_string(),
            revision: Revision::new(revision),
        }
    }

    pub fn local(path: &str) -> Self {
        Self {
            kind: RefKind::Local,
            location: path.to_string(),
            revision: Revision::default(),
        }
    }

    pub fn get_kind(&self) -> &RefKind {
        &self.kind
    }

    pub fn get_location(&self) -> &str {
        &self.location
    }

    pub fn get_revision(&self) -> &Revision {
        &self.revision
    }
}

impl fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision.as_deref() {
            Some(r) => write!(f, "{}{}{}", self.location, REVISION_DELIMITER, r),
            None => write!(f, "{}", self.location),
        }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ReferenceError {
    #[error("reference has an empty location")]
    EmptyLocation,
    #[error("reference {0:?} has an empty revision after \"::\"")]
    EmptyRevision(String),
}

impl FromStr for ExternalReference {
    type Err = ReferenceError;

    /// Parses the compact `location[::revision]` form of a git reference.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (location, revision) = match s.rsplit_once(REVISION_DELIMITER) {
            Some((loc, rev)) => match rev.trim().is_empty() {
                true => return Err(ReferenceError::EmptyRevision(s.to_string())),
                false => (loc.trim(), Some(rev.trim())),
            },
            None => (s, None),
        };
        if location.is_empty() == true {
            return Err(ReferenceError::EmptyLocation);
        }
        Ok(Self::git(location, revision))
    }
}

/// The table form of a git reference.
#[derive(Debug, PartialEq, serde_derive::Deserialize)]
#[serde(deny_unknown_fields)]
struct GitTable {
    url: String,
    rev: Option<String>,
}

impl TryFrom<GitTable> for ExternalReference {
    type Error = ReferenceError;

    fn try_from(value: GitTable) -> Result<Self, Self::Error> {
        if value.url.trim().is_empty() == true {
            return Err(ReferenceError::EmptyLocation);
        }
        match value.rev.as_deref().map(|r| r.trim()) {
            Some("") => Err(ReferenceError::EmptyRevision(value.url)),
            rev => Ok(Self::git(value.url.trim(), rev)),
        }
    }
}

/// Accepts either the compact string form or the `{ url, rev }` table form of
/// a git reference.
pub fn string_or_table<'de, D>(deserializer: D) -> Result<ExternalReference, D::Error>
where
    D: de::Deserializer<'de>,
{
    struct GitVisitor;

    impl<'de> Visitor<'de> for GitVisitor {
        type Value = ExternalReference;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a \"location::revision\" string or a table with \"url\" and \"rev\"")
        }

        fn visit_str<E>(self, value: &str) -> Result<ExternalReference, E>
        where
            E: de::Error,
        {
            ExternalReference::from_str(value).map_err(E::custom)
        }

        fn visit_map<M>(self, map: M) -> Result<ExternalReference, M::Error>
        where
            M: MapAccess<'de>,
        {
            // falls back on the derived version of deser for the table form
            let table: GitTable = Deserialize::deserialize(de::value::MapAccessDeserializer::new(map))?;
            ExternalReference::try_from(table).map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_any(GitVisitor)
}

/// Wrapper so a list of git references can be deserialized element by element.
#[derive(Debug, PartialEq)]
pub struct GitDecl(pub ExternalReference);

impl<'de> Deserialize<'de> for GitDecl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        Ok(GitDecl(string_or_table(deserializer)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_str_compact() {
        let r = ExternalReference::from_str("git@github.com:hdl-util/hdmi.git::master").unwrap();
        assert_eq!(r.get_location(), "git@github.com:hdl-util/hdmi.git");
        assert_eq!(r.get_revision(), &Revision::new(Some("master")));
        assert_eq!(r.get_kind(), &RefKind::Git);

        // scheme separators are not mistaken for the revision delimiter
        let r = ExternalReference::from_str("https://github.com/hdl-util/sound.git").unwrap();
        assert_eq!(r.get_location(), "https://github.com/hdl-util/sound.git");
        assert_eq!(r.get_revision().is_pinned(), false);
    }

    #[test]
    fn from_str_rejects_empty_parts() {
        assert_eq!(
            ExternalReference::from_str("https://github.com/a/b.git::"),
            Err(ReferenceError::EmptyRevision(String::from("https://github.com/a/b.git::")))
        );
        assert_eq!(
            ExternalReference::from_str("::v1.0"),
            Err(ReferenceError::EmptyLocation)
        );
        assert_eq!(ExternalReference::from_str("  "), Err(ReferenceError::EmptyLocation));
    }

    #[test]
    fn display_round_trips_compact_form() {
        let text = "git@github.com:hdl-util/vga-text-mode.git::v0.3";
        assert_eq!(ExternalReference::from_str(text).unwrap().to_string(), text);
    }

    #[derive(Debug, serde_derive::Deserialize)]
    struct Holder {
        git: Vec<GitDecl>,
    }

    #[test]
    fn deser_string_or_table() {
        let h: Holder = toml::from_str(
            r#"git = [
    "git@github.com:hdl-util/hdmi.git::master",
    { url = "https://github.com/hdl-util/sound.git", rev = "v1.2" },
    { url = "https://github.com/hdl-util/mipi-ccs.git" },
]"#,
        )
        .unwrap();
        assert_eq!(h.git.len(), 3);
        assert_eq!(h.git[1].0.get_revision(), &Revision::new(Some("v1.2")));
        assert_eq!(h.git[2].0.get_revision(), &Revision::default());
    }

    #[test]
    fn deser_rejects_unknown_table_keys() {
        let h = toml::from_str::<Holder>(r#"git = [{ url = "https://x.org/a.git", branch = "main" }]"#);
        assert!(h.is_err());
    }

    #[test]
    fn revision_display() {
        assert_eq!(Revision::new(Some("v1.0")).to_string(), "\"v1.0\"");
        assert_eq!(Revision::default().to_string(), "the default branch");
    }
}
