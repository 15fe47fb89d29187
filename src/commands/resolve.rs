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

use crate::commands::helps::resolve;
use crate::core::blueprint::{Blueprint, Format, BLUEPRINT_FILE};
use crate::core::context::{Context, CONFIG_ENV};
use crate::core::session::Resolution;
use crate::error::{Failure, Hint};
use crate::util::anyerror::{AnyError, Fault};
use std::path::PathBuf;

use cliproc::{cli, proc, stage::*};
use cliproc::{Arg, Cli, Help, Subcommand};

#[derive(Debug, PartialEq)]
pub struct Resolve {
    manifest: Option<PathBuf>,
    jobs: Option<usize>,
    fetch_dir: Option<PathBuf>,
    offline: bool,
    blueprint: Option<PathBuf>,
    lock: bool,
    json: bool,
}

impl Subcommand<()> for Resolve {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(resolve::HELP))?;
        Ok(Resolve {
            // flags
            offline: cli.check(Arg::flag("offline"))?,
            lock: cli.check(Arg::flag("lock"))?,
            json: cli.check(Arg::flag("json"))?,
            // options
            jobs: cli.get(Arg::option("jobs").value("n"))?,
            fetch_dir: cli.get(Arg::option("fetch-dir").value("dir"))?,
            blueprint: cli.get(Arg::option("blueprint").value("file"))?,
            // positionals
            manifest: cli.get(Arg::positional("manifest"))?,
        })
    }

    fn execute(self, _: &()) -> proc::Result {
        if self.jobs == Some(0) {
            return Err(AnyError::from("option \"--jobs\" must be at least 1"))?;
        }
        let (context, resolution) = run(
            self.manifest.as_ref(),
            self.fetch_dir.clone(),
            self.jobs,
            self.offline,
        )?;

        if let Some(path) = &self.blueprint {
            let path = match path.is_dir() {
                true => path.join(BLUEPRINT_FILE),
                false => path.clone(),
            };
            Blueprint::new(resolution.get_files(), Format::Tsv).write(&path)?;
        }
        if self.lock == true {
            resolution.get_report().write_lock(context.get_manifest_dir())?;
        }

        match self.json {
            true => println!("{}", resolution.get_report().to_json()?),
            false => print!("{}", Blueprint::new(resolution.get_files(), Format::List)),
        }
        Ok(())
    }
}

/// Assembles the context from every configuration layer and resolves the
/// root manifest to completion.
pub fn run(
    manifest: Option<&PathBuf>,
    fetch_dir: Option<PathBuf>,
    jobs: Option<usize>,
    offline: bool,
) -> Result<(Context, Resolution), Fault> {
    let context = Context::new()
        .manifest(manifest.map(|p| p.as_path()))?
        .configs(CONFIG_ENV)?
        .env_overrides(|key| std::env::var(key).ok())?
        .flags(fetch_dir, jobs, offline);

    let mut session = context.session()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    match runtime.block_on(session.resolve()) {
        Ok(resolution) => Ok((context, resolution)),
        Err(failure) => Err(explain(failure).into()),
    }
}

/// Renders every error of a failed resolution followed by the remedies that
/// apply to it.
fn explain(failure: Failure) -> AnyError {
    let mut hints: Vec<Hint> = Vec::new();
    for hint in failure.errors().iter().filter_map(|e| e.hint()) {
        if hints.contains(&hint) == false {
            hints.push(hint);
        }
    }
    let mut message = failure.to_string();
    for hint in hints {
        message.push_str(&hint.to_string());
    }
    AnyError(message)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::module::ModuleId;
    use crate::core::reference::Revision;
    use crate::error::Error;

    #[test]
    fn explain_dedupes_hints() {
        let conflict = |m: &str| Error::RevisionConflict {
            module: ModuleId::new(m),
            first: Revision::new(Some("1.0.0")),
            first_by: ModuleId::new("top"),
            second: Revision::new(Some("2.0.0")),
            second_by: ModuleId::new("lib"),
        };
        let message = explain(Failure::new(vec![conflict("uart"), conflict("spi")])).to_string();
        assert_eq!(message.matches("hint").count(), 1);
        assert!(message.contains("2 errors"));
    }
}
