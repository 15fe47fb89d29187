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

use crate::core::fetch::FetchFailure;
use crate::core::module::ModuleId;
use crate::core::reference::Revision;
use colored::Colorize;
use std::{fmt::Display, path::PathBuf};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("failed to read manifest {0:?}: {1}")]
    ManifestNotFound(PathBuf, LastError),
    #[error("failed to parse manifest {0:?}: {1}")]
    ManifestMalformed(PathBuf, LastError),
    #[error("module {module} is pinned to {first} by {first_by} but to {second} by {second_by}")]
    RevisionConflict {
        module: ModuleId,
        first: Revision,
        first_by: ModuleId,
        second: Revision,
        second_by: ModuleId,
    },
    #[error("cyclic dependency detected: {0}")]
    CyclicDependency(CyclePath),
    #[error("modules {first} and {second} would both be fetched into {path:?}")]
    CachePathCollision {
        path: PathBuf,
        first: ModuleId,
        second: ModuleId,
    },
    #[error("{} required module(s) are missing or at the wrong revision:{}", .0.len(), FetchList(.0))]
    FetchIncomplete(Vec<FetchFailure>),
    #[error("file {path:?} is declared by both {first} and {second}")]
    DuplicateFile {
        path: PathBuf,
        first: ModuleId,
        second: ModuleId,
    },
    #[error("failed to load configuration {0:?}: {1}")]
    ConfigMalformed(PathBuf, LastError),
}

impl Error {
    /// Suggests a remedy for errors that have a common fix.
    pub fn hint(&self) -> Option<Hint> {
        match self {
            Self::RevisionConflict { .. } => Some(Hint::PinOneRevision),
            Self::CachePathCollision { .. } => Some(Hint::SeparateFetchDirs),
            Self::FetchIncomplete(list) => match list.iter().any(|f| f.is_offline()) {
                true => Some(Hint::GoOnline),
                false => None,
            },
            _ => None,
        }
    }

    pub fn lowerize(s: String) -> String {
        // get the first word
        let first_word = match s.split_whitespace().next() {
            Some(w) => w,
            None => return s,
        };
        // retain punctuation if the first word is all-caps and longer than 1 character
        if first_word.len() > 1 && first_word.chars().any(|c| c.is_ascii_lowercase()) == false {
            s
        } else {
            s.char_indices()
                .map(|(i, c)| if i == 0 { c.to_ascii_lowercase() } else { c })
                .collect()
        }
    }
}

/// The ordered list of modules that close a dependency cycle.
///
/// The first and last entries name the same module.
#[derive(Debug, PartialEq, Clone)]
pub struct CyclePath(pub Vec<ModuleId>);

impl CyclePath {
    pub fn inner(&self) -> &Vec<ModuleId> {
        &self.0
    }
}

impl Display for CyclePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chain: Vec<String> = self.0.iter().map(|m| m.to_string()).collect();
        write!(f, "{}", chain.join(" -> "))
    }
}

struct FetchList<'a>(&'a Vec<FetchFailure>);

impl<'a> Display for FetchList<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for failure in self.0 {
            write!(f, "\n    {}", failure)?;
        }
        Ok(())
    }
}

/// The message of a lower-level error, stored as text so it can be compared
/// and re-reported without its original type.
#[derive(Debug, PartialEq, Clone)]
pub struct LastError(pub String);

impl Display for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Error::lowerize(self.0.to_string()))
    }
}

/// Every error found while resolving one root manifest.
///
/// A resolution never stops at the first structural problem, so callers see
/// each broken module in one report.
#[derive(Debug, PartialEq)]
pub struct Failure(Vec<Error>);

impl Failure {
    pub fn new(errors: Vec<Error>) -> Self {
        Self(errors)
    }

    pub fn errors(&self) -> &Vec<Error> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Error> for Failure {
    fn from(value: Error) -> Self {
        Self(vec![value])
    }
}

impl std::error::Error for Failure {}

impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.len() {
            1 => write!(f, "{}", self.0[0]),
            n => {
                write!(f, "resolution failed with {} errors:", n)?;
                for (i, e) in self.0.iter().enumerate() {
                    write!(f, "\n  {}. {}", i + 1, e)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Hint {
    PinOneRevision,
    SeparateFetchDirs,
    GoOnline,
}

impl Display for Hint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::PinOneRevision => "update the manifests so every reference to the module uses the same revision",
            Self::SeparateFetchDirs => "set a different \"fetchto\" for one of the modules or rename a repository",
            Self::GoOnline => "remove the \"--offline\" flag to allow missing modules to be fetched",
        };
        write!(
            f,
            "\n\n{}: {}",
            "hint".green(),
            Error::lowerize(message.to_string())
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lowerize() {
        assert_eq!(Error::lowerize(String::from("No such file")), "no such file");
        assert_eq!(Error::lowerize(String::from("IO failure")), "IO failure");
        assert_eq!(Error::lowerize(String::new()), "");
    }

    #[test]
    fn cycle_display() {
        let path = CyclePath(vec![
            ModuleId::new("github.com/a/x"),
            ModuleId::new("github.com/a/y"),
            ModuleId::new("github.com/a/x"),
        ]);
        assert_eq!(
            path.to_string(),
            "github.com/a/x -> github.com/a/y -> github.com/a/x"
        );
    }

    #[test]
    fn failure_lists_every_error() {
        let f = Failure::new(vec![
            Error::ManifestNotFound(PathBuf::from("/a"), LastError(String::from("Gone"))),
            Error::ManifestNotFound(PathBuf::from("/b"), LastError(String::from("Gone"))),
        ]);
        let text = f.to_string();
        assert!(text.starts_with("resolution failed with 2 errors:"));
        assert!(text.contains("1. failed to read manifest \"/a\": gone"));
        assert!(text.contains("2. failed to read manifest \"/b\": gone"));
    }
}
