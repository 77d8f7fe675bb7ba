use std::path::PathBuf;

use ionic_vm::Verbosity;

use super::*;
use crate::cli::commands::{dump_command, macros_command};
use crate::commands::dump::DumpArgs;

#[test]
fn dump_flags() {
    let m = dump_command()
        .try_get_matches_from(["dump", "data.10n", "--trace", "-v", "--color", "never"])
        .unwrap();
    let params = DumpParams::from_matches(&m);

    assert_eq!(params.input, PathBuf::from("data.10n"));
    assert_eq!(params.color, ColorChoice::Never);
    assert!(params.trace);
    assert!(params.verbose);
    assert!(!params.json);

    let args: DumpArgs = params.into();
    assert_eq!(args.trace, Some(Verbosity::Verbose));
    assert!(!args.color);
}

#[test]
fn dump_defaults() {
    let m = dump_command().try_get_matches_from(["dump", "-"]).unwrap();
    let params = DumpParams::from_matches(&m);

    assert_eq!(params.input, PathBuf::from("-"));
    assert_eq!(params.color, ColorChoice::Auto);
    assert!(!params.trace);

    let args: DumpArgs = params.into();
    assert_eq!(args.trace, None);
}

#[test]
fn json_output_is_never_colored() {
    let m = dump_command()
        .try_get_matches_from(["dump", "data.10n", "--json", "--color", "always"])
        .unwrap();

    let args: DumpArgs = DumpParams::from_matches(&m).into();

    assert!(args.json);
    assert!(!args.color);
}

#[test]
fn verbose_requires_trace() {
    let result = dump_command().try_get_matches_from(["dump", "data.10n", "-v"]);

    assert!(result.is_err());
}

#[test]
fn input_is_required() {
    assert!(dump_command().try_get_matches_from(["dump"]).is_err());
    assert!(macros_command().try_get_matches_from(["macros"]).is_err());
}

#[test]
fn macros_rejects_dump_flags() {
    let result = macros_command().try_get_matches_from(["macros", "data.10n", "--json"]);

    assert!(result.is_err());
}

#[test]
fn macros_params() {
    let m = macros_command()
        .try_get_matches_from(["macros", "data.10n", "--color", "always"])
        .unwrap();
    let params = MacrosParams::from_matches(&m);

    assert_eq!(params.input, PathBuf::from("data.10n"));
    assert_eq!(params.color, ColorChoice::Always);
}

#[test]
fn unknown_color_is_rejected() {
    let result = dump_command().try_get_matches_from(["dump", "data.10n", "--color", "sometimes"]);

    assert!(result.is_err());
}

#[test]
fn cli_requires_subcommand() {
    let result = build_cli().try_get_matches_from(["ionic"]);

    assert!(result.is_err());
}
