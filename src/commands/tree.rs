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

use crate::commands::helps::tree;
use crate::commands::resolve;
use std::path::PathBuf;

use cliproc::{cli, proc, stage::*};
use cliproc::{Arg, Cli, Help, Subcommand};

#[derive(Debug, PartialEq)]
pub struct Tree {
    manifest: Option<PathBuf>,
    offline: bool,
}

impl Subcommand<()> for Tree {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(tree::HELP))?;
        Ok(Tree {
            offline: cli.check(Arg::flag("offline"))?,
            manifest: cli.get(Arg::positional("manifest"))?,
        })
    }

    fn execute(self, _: &()) -> proc::Result {
        let (_, resolution) = resolve::run(self.manifest.as_ref(), None, None, self.offline)?;
        print!("{}", resolution.tree());
        Ok(())
    }
}
