//! Dispatch logic: extract params from ArgMatches and convert to command args.

use std::path::PathBuf;

use clap::ArgMatches;
use ionic_vm::Verbosity;

use super::ColorChoice;
use crate::commands::dump::DumpArgs;
use crate::commands::macros::MacrosArgs;

pub struct DumpParams {
    pub input: PathBuf,
    pub color: ColorChoice,
    pub trace: bool,
    pub verbose: bool,
    pub json: bool,
}

impl DumpParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            input: input(m),
            color: parse_color(m),
            trace: m.get_flag("trace"),
            verbose: m.get_flag("verbose"),
            json: m.get_flag("json"),
        }
    }
}

impl From<DumpParams> for DumpArgs {
    fn from(p: DumpParams) -> Self {
        let verbosity = if p.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Default
        };
        Self {
            input: p.input,
            // JSON output is never colored.
            color: !p.json && p.color.should_colorize(),
            trace: p.trace.then_some(verbosity),
            json: p.json,
        }
    }
}

pub struct MacrosParams {
    pub input: PathBuf,
    pub color: ColorChoice,
}

impl MacrosParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            input: input(m),
            color: parse_color(m),
        }
    }
}

impl From<MacrosParams> for MacrosArgs {
    fn from(p: MacrosParams) -> Self {
        Self {
            input: p.input,
            color: p.color.should_colorize(),
        }
    }
}

fn input(m: &ArgMatches) -> PathBuf {
    m.get_one::<PathBuf>("input")
        .cloned()
        .expect("input is a required argument")
}

fn parse_color(m: &ArgMatches) -> ColorChoice {
    match m.get_one::<String>("color").map(|s| s.as_str()) {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}
