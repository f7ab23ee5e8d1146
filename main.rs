/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::process::ExitCode;

use tinydag::prefs::{AppPreferences, command_line};

fn main() -> ExitCode {
    let cli = command_line().run();

    let mut prefs = match AppPreferences::load(cli.config.as_deref()) {
        Ok(prefs) => prefs,
        Err(e) => {
            eprintln!("tinydag: {e}");
            return ExitCode::FAILURE;
        },
    };
    prefs.apply_command_line(&cli);
    if let Err(e) = prefs.validate() {
        eprintln!("tinydag: {e}");
        return ExitCode::FAILURE;
    }

    tinydag::runtime::init_tracing(&prefs.effective_log_filter());
    log::info!("tinydag {} ({})", tinydag::VERSION, prefs.server_url);

    match tinydag::runtime::run(cli.command, prefs) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        },
    }
}
