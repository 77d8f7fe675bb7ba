//! Command builders for the CLI.

use clap::Command;

use super::args::*;

/// Build the complete CLI with all subcommands.
pub fn build_cli() -> Command {
    Command::new("ionic")
        .about("Inspect binary Ion 1.0 and 1.1 streams")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(dump_command())
        .subcommand(macros_command())
}

/// Print every value of a stream, with macros expanded.
pub fn dump_command() -> Command {
    Command::new("dump")
        .about("Print the values of a stream")
        .after_help(
            r#"EXAMPLES:
  ionic dump data.10n                 # one value per line
  ionic dump data.10n --json          # JSON lines
  ionic dump data.10n --trace -v      # show macro expansions
  cat data.10n | ionic dump -"#,
        )
        .arg(input_arg())
        .arg(color_arg())
        .arg(trace_arg())
        .arg(verbose_arg().requires("trace"))
        .arg(json_arg())
}

/// Print the macro table in effect at the end of a stream.
pub fn macros_command() -> Command {
    Command::new("macros")
        .about("Show the active macro table and template bytecode")
        .after_help(
            r#"EXAMPLES:
  ionic macros data.10n
  ionic macros data.10n --color never"#,
        )
        .arg(input_arg())
        .arg(color_arg())
}
