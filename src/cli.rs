//! Command-line interface for tokimun.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tokimun - compile a Lua superset to plain, portable Lua
#[derive(Parser)]
#[command(name = "tokimun")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Files to compile (when no subcommand is specified)
    #[command(flatten)]
    pub compile: CompileArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile .tkm files to Lua
    #[command(visible_alias = "c")]
    Compile(CompileArgs),

    /// Compile a file and run it with the first Lua interpreter on PATH
    #[command(visible_alias = "r")]
    Run {
        /// Path to the .tkm file
        file: PathBuf,

        /// Suppress the compile banner
        #[arg(short, long)]
        quiet: bool,
    },

    /// Watch files and recompile on change (not implemented yet)
    #[command(visible_alias = "w")]
    Watch {
        /// Files to watch
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Print version information
    #[command(visible_alias = "v")]
    Version,

    /// Print this help
    #[command(visible_alias = "h")]
    Help,
}

#[derive(Args, Debug, Default, Clone)]
pub struct CompileArgs {
    /// Source files or glob patterns
    pub files: Vec<String>,

    /// Output file (default: input with .lua extension)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print compiled output to stdout
    #[arg(short, long)]
    pub print: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Write to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}

impl CompileArgs {
    pub const fn to_stdout(&self) -> bool {
        self.print || self.stdout
    }
}

impl Cli {
    /// Resolve the actual command to run
    pub fn resolve_command(self) -> ResolvedCommand {
        match self.command {
            Some(Commands::Compile(args)) => ResolvedCommand::Compile(args),
            Some(Commands::Run { file, quiet }) => ResolvedCommand::Run { file, quiet },
            Some(Commands::Watch { files }) => ResolvedCommand::Watch { files },
            Some(Commands::Version) => ResolvedCommand::Version,
            Some(Commands::Help) => ResolvedCommand::Help,
            // tokimun file.tkm [options]
            None if !self.compile.files.is_empty() => ResolvedCommand::Compile(self.compile),
            None => ResolvedCommand::Help,
        }
    }
}

/// Resolved command after processing CLI arguments
pub enum ResolvedCommand {
    Compile(CompileArgs),
    Run { file: PathBuf, quiet: bool },
    Watch { files: Vec<String> },
    Version,
    Help,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(args: &[&str]) -> ResolvedCommand {
        Cli::try_parse_from(args).unwrap().resolve_command()
    }

    #[test]
    fn bare_file_compiles() {
        let ResolvedCommand::Compile(args) = resolve(&["tokimun", "main.tkm", "-q"]) else {
            panic!("expected compile");
        };
        assert_eq!(args.files, ["main.tkm"]);
        assert!(args.quiet);
    }

    #[test]
    fn compile_alias_with_options() {
        let ResolvedCommand::Compile(args) =
            resolve(&["tokimun", "c", "a.tkm", "-o", "out.lua", "--stdout"])
        else {
            panic!("expected compile");
        };
        assert_eq!(args.output, Some(PathBuf::from("out.lua")));
        assert!(args.to_stdout());
        assert!(!args.print);
    }

    #[test]
    fn run_alias() {
        let ResolvedCommand::Run { file, quiet } = resolve(&["tokimun", "r", "game.tkm"]) else {
            panic!("expected run");
        };
        assert_eq!(file, PathBuf::from("game.tkm"));
        assert!(!quiet);
    }

    #[test]
    fn short_commands() {
        assert!(matches!(resolve(&["tokimun", "v"]), ResolvedCommand::Version));
        assert!(matches!(resolve(&["tokimun", "h"]), ResolvedCommand::Help));
        assert!(matches!(resolve(&["tokimun"]), ResolvedCommand::Help));
        assert!(matches!(
            resolve(&["tokimun", "w", "a.tkm"]),
            ResolvedCommand::Watch { .. }
        ));
    }

    #[test]
    fn watch_needs_files() {
        assert!(Cli::try_parse_from(["tokimun", "watch"]).is_err());
    }
}
