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

pub const HELP: &str = r#"Hdlfetch is a dependency resolver and source fetcher for HDL projects.

Usage:
    hdlfetch [options] [command]

Commands:
    resolve         fetch the dependencies and print the ordered file list
    tree            view the dependency graph

Options:
    --version       print version information and exit
    --verbose       display debug messages while running
    --color <when>  coloring: 'auto', 'always', or 'never'
    --help, -h      print help information

Use 'hdlfetch <command> --help' to read more about a command.
"#;
