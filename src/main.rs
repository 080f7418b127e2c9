//! CLI tool to compile tokimun files to Lua and run them.

mod cli;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use clap::{CommandFactory, Parser};
use cli::{Cli, CompileArgs, ResolvedCommand};
use tracing_subscriber::EnvFilter;

/// Interpreters tried by `run`, in order of preference.
const INTERPRETERS: [&str; 6] = ["lua", "luajit", "lua5.4", "lua5.3", "lua5.2", "lua5.1"];

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("'{0}' is not a .tkm file")]
    NotSource(String),
    #[error("cannot read '{path}': {source}")]
    Read { path: String, source: io::Error },
    #[error("cannot write '{path}': {source}")]
    Write { path: String, source: io::Error },
    #[error("{path}: {source}")]
    Compile { path: String, source: tokimun::Error },
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("no input files specified")]
    NoInput,
    #[error("-o can only be used with a single input file")]
    OutputWithManyInputs,
    #[error("cannot create temp file: {0}")]
    TempFile(io::Error),
    #[error("no Lua interpreter found. Install lua or luajit.")]
    NoInterpreter,
    #[error("cannot start '{interpreter}': {source}")]
    Spawn {
        interpreter: String,
        source: io::Error,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.resolve_command() {
        ResolvedCommand::Compile(args) => compile_files(&args),
        ResolvedCommand::Run { file, quiet } => run_file(&file, quiet),
        ResolvedCommand::Watch { files } => {
            watch(&files);
            Ok(ExitCode::SUCCESS)
        }
        ResolvedCommand::Version => {
            println!("tokimun v{}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
        ResolvedCommand::Help => {
            println!("{}", Cli::command().render_help());
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr, filtered by `TOKIMUN_LOG` (default `warn`).
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("TOKIMUN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Expand glob patterns; a pattern with no match is kept as a literal
/// path so the error names what the user typed.
fn expand_inputs(patterns: &[String]) -> Result<Vec<String>, CliError> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        let paths = glob::glob(pattern).map_err(|source| CliError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        let matches: Vec<String> = paths
            .filter_map(Result::ok)
            .map(|path| path.display().to_string())
            .collect();
        if matches.is_empty() {
            inputs.push(pattern.clone());
        } else {
            inputs.extend(matches);
        }
    }
    Ok(inputs)
}

fn compile_files(args: &CompileArgs) -> Result<ExitCode, CliError> {
    let inputs = expand_inputs(&args.files)?;
    if inputs.is_empty() {
        return Err(CliError::NoInput);
    }
    if args.output.is_some() && inputs.len() > 1 {
        return Err(CliError::OutputWithManyInputs);
    }
    tracing::debug!(count = inputs.len(), "compiling inputs");

    let mut failed = false;
    for input in &inputs {
        if let Err(e) = compile_file(input, args) {
            eprintln!("error: {e}");
            failed = true;
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn compile_file(input: &str, args: &CompileArgs) -> Result<(), CliError> {
    if !input.ends_with(".tkm") {
        return Err(CliError::NotSource(input.to_string()));
    }
    let lua = compile_source(Path::new(input))?;

    if args.to_stdout() {
        let mut stdout = io::stdout().lock();
        return stdout
            .write_all(lua.as_bytes())
            .map_err(|source| CliError::Write {
                path: "<stdout>".to_string(),
                source,
            });
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| Path::new(input).with_extension("lua"));
    fs::write(&output, &lua).map_err(|source| CliError::Write {
        path: output.display().to_string(),
        source,
    })?;

    if !args.quiet {
        println!("✓ {input} → {}", output.display());
    }
    Ok(())
}

fn compile_source(path: &Path) -> Result<String, CliError> {
    let display = path.display().to_string();
    let source = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: display.clone(),
        source,
    })?;
    tokimun::compile(&source).map_err(|source| CliError::Compile {
        path: display,
        source,
    })
}

fn find_interpreter() -> Option<PathBuf> {
    INTERPRETERS.iter().find_map(|name| which::which(name).ok())
}

fn run_file(file: &Path, quiet: bool) -> Result<ExitCode, CliError> {
    let lua = compile_source(file)?;

    let mut temp = tempfile::Builder::new()
        .prefix("tokimun-")
        .suffix(".lua")
        .tempfile()
        .map_err(CliError::TempFile)?;
    temp.write_all(lua.as_bytes()).map_err(CliError::TempFile)?;
    // Close the handle; the file is removed when `script` drops.
    let script = temp.into_temp_path();

    let interpreter = find_interpreter().ok_or(CliError::NoInterpreter)?;
    tracing::debug!(interpreter = %interpreter.display(), "running compiled script");

    if !quiet {
        println!("✓ compiled {}", file.display());
        println!("─────────────────────────");
    }

    let status = Command::new(&interpreter)
        .arg(&script)
        .status()
        .map_err(|source| CliError::Spawn {
            interpreter: interpreter.display().to_string(),
            source,
        })?;

    Ok(status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .map_or(ExitCode::FAILURE, ExitCode::from))
}

fn watch(files: &[String]) {
    tracing::debug!(count = files.len(), "watch requested");
    println!("Watch mode is not implemented yet.");
    println!("For now, use a file watcher like entr or watchexec:");
    println!();
    println!("  ls *.tkm | entr -c tokimun compile /_");
    println!("  watchexec -e tkm -- tokimun compile *.tkm");
}
