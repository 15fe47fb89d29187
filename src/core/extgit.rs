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

use super::fetch::{Fetch, FetchError};
use std::path::Path;
use std::process::Command;

/// A series of git commands run through subprocesses.
#[derive(Debug, PartialEq)]
pub struct ExtGit {
    command: String,
}

impl ExtGit {
    pub fn new() -> Self {
        Self {
            command: String::from("git"),
        }
    }

    /// Sets the command for calling git through processes.
    ///
    /// When `s` is `None`, the command assumes git is on the path and is simply `git`.
    pub fn command(mut self, s: Option<String>) -> Self {
        self.command = s.unwrap_or(String::from("git"));
        self
    }

    pub fn get_command(&self) -> &str {
        &self.command
    }

    /// Runs git with `args` from the directory `dir`.
    fn run(&self, args: &[&str], dir: &Path) -> Result<(), FetchError> {
        tracing::debug!("running {} {} in {:?}", self.command, args.join(" "), dir);
        let output = Command::new(&self.command)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| FetchError::Spawn(self.command.clone(), e.to_string()))?;
        match output.status.code() {
            Some(0) => Ok(()),
            Some(num) => {
                tracing::debug!("{}", String::from_utf8_lossy(&output.stderr).trim_end());
                Err(FetchError::ExitCode(num))
            }
            None => Err(FetchError::Signal),
        }
    }

    /// Clones the repository `url` into `dest` at `revision`.
    ///
    /// The clone happens in a temporary directory and its contents are copied
    /// into `dest`, so a failed clone never leaves a partial module behind.
    fn clone(&self, url: &str, revision: Option<&str>, dest: &Path) -> Result<(), FetchError> {
        let tmp_path = tempfile::tempdir()?;
        self.run(&["clone", "--quiet", url, "repo"], tmp_path.path())?;
        let repo = tmp_path.path().join("repo");
        if let Some(rev) = revision {
            self.run(&["checkout", "--quiet", "--detach", rev], &repo)?;
        }
        std::fs::create_dir_all(&dest)?;

        let mut from_paths = Vec::new();
        for entry in std::fs::read_dir(&repo)? {
            from_paths.push(entry?.path());
        }
        let mut options = fs_extra::dir::CopyOptions::new();
        options.overwrite = true;
        // copy rather than rename because of windows issues
        fs_extra::copy_items(&from_paths, &dest, &options)?;
        Ok(())
    }

    /// Moves an existing clone at `dest` to `revision`.
    fn update(&self, revision: Option<&str>, dest: &Path) -> Result<(), FetchError> {
        self.run(&["fetch", "--quiet", "--tags", "origin"], dest)?;
        match revision {
            // prefer the remote branch so a moved branch is followed
            Some(rev) => match self.run(&["checkout", "--quiet", "--detach", &format!("origin/{}", rev)], dest) {
                Ok(()) => Ok(()),
                Err(_) => self.run(&["checkout", "--quiet", "--detach", rev], dest),
            },
            None => self.run(&["checkout", "--quiet", "--detach", "origin/HEAD"], dest),
        }
    }
}

impl Fetch for ExtGit {
    fn fetch(&self, location: &str, revision: Option<&str>, destination: &Path) -> Result<(), FetchError> {
        match destination.join(".git").is_dir() {
            true => self.update(revision, destination),
            false => self.clone(location, revision, destination),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_command() {
        assert_eq!(ExtGit::new().get_command(), "git");
        assert_eq!(ExtGit::new().command(None).get_command(), "git");
        assert_eq!(
            ExtGit::new().command(Some(String::from("/usr/local/bin/git"))).get_command(),
            "/usr/local/bin/git"
        );
    }

    #[test]
    fn unknown_command_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let git = ExtGit::new().command(Some(String::from("hdlfetch-no-such-git")));
        let err = git
            .fetch("https://example.org/a.git", None, &dir.path().join("a"))
            .unwrap_err();
        assert!(matches!(err, FetchError::Spawn(..)));
        // nothing is left at the destination
        assert_eq!(dir.path().join("a").exists(), false);
    }
}
