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

use std::path::{Component, Path, PathBuf};

/// Removes `.` components and folds `..` components into their parents
/// without touching the filesystem.
///
/// A `..` that would climb above the root (or above the start of a relative
/// path) is kept as-is.
pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut result = PathBuf::new();
    let mut depth: usize = 0;
    for comp in path.as_ref().components() {
        match comp {
            Component::Prefix(_) | Component::RootDir => result.push(comp.as_os_str()),
            Component::CurDir => (),
            Component::ParentDir => {
                if depth > 0 {
                    result.pop();
                    depth -= 1;
                } else if result.has_root() == false {
                    result.push("..");
                }
            }
            Component::Normal(part) => {
                result.push(part);
                depth += 1;
            }
        }
    }
    result
}

/// Resolves `path` against `root` when it is relative, then normalizes it.
///
/// Manifest-local paths always go through this function so they are never
/// interpreted against the process working directory.
pub fn resolve_rel_path<P: AsRef<Path>>(root: &Path, path: P) -> PathBuf {
    let path = path.as_ref();
    match path.is_relative() {
        true => normalize(root.join(path)),
        false => normalize(path),
    }
}

/// Converts `path` into an absolute path using the current working directory
/// as the base for relative paths.
pub fn absolute<P: AsRef<Path>>(path: P) -> std::io::Result<PathBuf> {
    let path = path.as_ref();
    match path.is_relative() {
        true => Ok(resolve_rel_path(&std::env::current_dir()?, path)),
        false => Ok(normalize(path)),
    }
}

/// Displays a path with forward slashes regardless of the host platform.
pub fn into_std_str(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}
