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

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding a filter directive such as `hdlfetch=debug`.
pub const LOG_ENV: &str = "HDLFETCH_LOG";

/// Selects the filter directive for the console.
///
/// An explicit directive in the environment always wins over `verbose`.
pub fn directive(env: Option<String>, verbose: bool) -> String {
    match env {
        Some(d) if d.trim().is_empty() == false => d,
        _ => match verbose {
            true => String::from("debug"),
            false => String::from("warn"),
        },
    }
}

/// Installs the console subscriber writing to stderr.
///
/// Only the binary calls this; the library only emits events.
pub fn init(verbose: bool, color: bool) {
    let filter = EnvFilter::try_new(directive(std::env::var(LOG_ENV).ok(), verbose))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(color)
        .without_time()
        .with_filter(filter);

    // a second call keeps the first subscriber
    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}
