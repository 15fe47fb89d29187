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

pub const HELP: &str = r#"Fetch the dependencies and print the ordered file list.

Usage:
    hdlfetch resolve [options] [<manifest>]

Args:
    <manifest>          manifest file or its directory (default: nearest)

Options:
    --jobs <n>          maximum number of fetches running at once
    --fetch-dir <dir>   fetch every git module into this directory
    --offline           never fetch and fail if a module is missing
    --blueprint <file>  write the file list with owners to a file (or
                        blueprint.tsv inside a directory)
    --lock              write the resolved modules to Manifest.lock
    --json              print the resolution report as json

Use 'hdlfetch resolve --help' to read more about the command.
"#;
