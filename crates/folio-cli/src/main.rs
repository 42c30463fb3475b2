//! `folio` binary entry point

use anyhow::Context;
use folio_cli::{cli, commands, logging, FolioSettings};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let matches = cli::command().get_matches();

    let settings = match matches.get_one::<PathBuf>("settings") {
        Some(path) => FolioSettings::load(path)?,
        None => FolioSettings::default(),
    };
    logging::init(&settings, matches.get_flag("verbose")).context("failed to set up logging")?;

    let output = commands::run(&matches, &settings)?;
    if !output.is_empty() {
        println!("{}", output.trim_end());
    }
    Ok(())
}
