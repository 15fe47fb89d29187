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

use crate::commands::helps::hdlfetch::HELP;
use crate::commands::resolve::Resolve;
use crate::commands::tree::Tree;
use crate::util::anyerror::AnyError;
use crate::util::logging;
use std::io::IsTerminal;
use std::str::FromStr;

use cliproc::{cli, proc, stage::*};
use cliproc::{Arg, Cli, Command, Help, Subcommand};

#[derive(Debug, PartialEq)]
pub struct Hdlfetch {
    version: bool,
    verbose: bool,
    color: Option<ColorMode>,
    command: Option<HdlfetchSubcommand>,
}

impl Command for Hdlfetch {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(HELP))?;
        Ok(Hdlfetch {
            // flags
            version: cli.check(Arg::flag("version"))?,
            verbose: cli.check(Arg::flag("verbose"))?,
            // options
            color: cli.get(Arg::option("color").value("when"))?,
            // subcommands
            command: cli.nest(Arg::subcommand("command"))?,
        })
    }

    fn execute(self) -> proc::Result {
        // prioritize version information
        if self.version == true {
            println!("hdlfetch {}", VERSION);
            return Ok(());
        }

        let color = self.color.unwrap_or(ColorMode::Auto);
        color.apply();
        logging::init(self.verbose, color.for_stderr());

        match self.command {
            Some(command) => command.execute(&()),
            None => {
                print!("{}", HELP);
                Ok(())
            }
        }
    }
}

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, PartialEq)]
enum HdlfetchSubcommand {
    Resolve(Resolve),
    Tree(Tree),
}

impl Subcommand<()> for HdlfetchSubcommand {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        match cli.select(&["resolve", "tree"])?.as_ref() {
            "resolve" => Ok(HdlfetchSubcommand::Resolve(Resolve::interpret(cli)?)),
            "tree" => Ok(HdlfetchSubcommand::Tree(Tree::interpret(cli)?)),
            _ => unreachable!("an unimplemented command was passed through"),
        }
    }

    fn execute(self, c: &()) -> proc::Result {
        match self {
            HdlfetchSubcommand::Resolve(sub) => sub.execute(c),
            HdlfetchSubcommand::Tree(sub) => sub.execute(c),
        }
    }
}

/// When to color the output written to the terminal.
#[derive(Debug, PartialEq, Clone, Copy)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Forces the choice onto every `colored` string.
    fn apply(&self) {
        match self {
            Self::Auto => colored::control::unset_override(),
            Self::Always => colored::control::set_override(true),
            Self::Never => colored::control::set_override(false),
        }
    }

    fn for_stderr(&self) -> bool {
        match self {
            Self::Auto => std::io::stderr().is_terminal(),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

impl FromStr for ColorMode {
    type Err = AnyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err(AnyError(format!(
                "unknown coloring \"{}\"; expecting 'auto', 'always', or 'never'",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn color_modes() {
        assert_eq!(ColorMode::from_str("always").unwrap(), ColorMode::Always);
        assert_eq!(ColorMode::from_str("never").unwrap().for_stderr(), false);
        assert!(ColorMode::from_str("sometimes").is_err());
    }
}
