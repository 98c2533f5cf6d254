//! The `descent` CLI surface (spec §5.4 / §6): `generate`, `validate`,
//! `debug`. A thin, real binary — not a product — wired with `clap`
//! derive the way `wolfram-parser`'s `paclet` bin and
//! `logicaffeine-cli` are in the retrieval pack.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::instrument;

use crate::ast;
use crate::debug_tree;
use crate::error::Error;
use crate::generate::{self, GenerateOptions};
use crate::ir;
use crate::lexer;
use crate::validate;

#[derive(Parser, Debug)]
#[command(name = "descent", version, about = "A recursive-descent parser generator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a `.desc` grammar and render it through a target's templates.
    Generate {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "rust")]
        target: String,
        #[arg(long, default_value = "templates")]
        templates: PathBuf,
        #[arg(long)]
        trace: bool,
    },
    /// Run the full pipeline up through validation and report diagnostics.
    Validate { file: PathBuf },
    /// Print an intermediate pipeline stage as a tree.
    Debug {
        file: PathBuf,
        #[arg(long)]
        tokens: bool,
        #[arg(long)]
        ast: bool,
        #[arg(long)]
        ir: bool,
    },
}

fn init_tracing(trace: bool) {
    let filter = if trace {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn format_diagnostic(level: &str, file: &std::path::Path, lineno: usize, message: &str) -> String {
    format!("{} ({}:{}): {}", level, file.display(), lineno, message)
}

fn read_source(file: &std::path::Path) -> Result<String, ExitCode> {
    fs::read_to_string(file).map_err(|e| {
        eprintln!("ERROR ({}): {}", file.display(), e);
        ExitCode::FAILURE
    })
}

#[instrument(level = "debug", skip(source), fields(file = %file.display()))]
fn build_ir(file: &std::path::Path, source: &str) -> Result<ir::IrParser, Error> {
    let tokens = lexer::tokenize(source)?;
    let machine = ast::parser::parse(&tokens)?;
    ir::build(&machine)
}

fn report_fatal(file: &std::path::Path, err: &Error) {
    let lineno = err.lineno().unwrap_or(0);
    eprintln!("{}", format_diagnostic("ERROR", file, lineno, &err.to_string()));
}

fn report_validation(file: &std::path::Path, report: &validate::ValidationReport) {
    for warning in &report.warnings {
        eprintln!("{}", format_diagnostic("WARNING", file, warning.lineno, &warning.message));
    }
    for error in &report.errors {
        eprintln!("{}", format_diagnostic("ERROR", file, error.lineno, &error.message));
    }
}

fn run_generate(file: PathBuf, output: Option<PathBuf>, target: String, templates: PathBuf, trace: bool) -> ExitCode {
    init_tracing(trace);
    let source = match read_source(&file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let ir = match build_ir(&file, &source) {
        Ok(ir) => ir,
        Err(e) => {
            report_fatal(&file, &e);
            return ExitCode::FAILURE;
        }
    };

    let report = validate::validate(&ir);
    report_validation(&file, &report);
    if report.has_errors() {
        return ExitCode::FAILURE;
    }

    let options = GenerateOptions { target, templates_dir: templates, trace };
    match generate::generate(&ir, &options) {
        Ok(rendered) => {
            match output {
                Some(path) => {
                    if let Err(e) = fs::write(&path, rendered) {
                        eprintln!("ERROR ({}): {}", path.display(), e);
                        return ExitCode::FAILURE;
                    }
                }
                None => print!("{}", rendered),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_fatal(&file, &e);
            ExitCode::FAILURE
        }
    }
}

fn run_validate(file: PathBuf) -> ExitCode {
    init_tracing(false);
    let source = match read_source(&file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match build_ir(&file, &source) {
        Ok(ir) => {
            let report = validate::validate(&ir);
            report_validation(&file, &report);
            if report.has_errors() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            report_fatal(&file, &e);
            ExitCode::FAILURE
        }
    }
}

fn run_debug(file: PathBuf, tokens: bool, ast_flag: bool, ir_flag: bool) -> ExitCode {
    init_tracing(false);
    let source = match read_source(&file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let show_all = !tokens && !ast_flag && !ir_flag;

    let lexed = match lexer::tokenize(&source) {
        Ok(t) => t,
        Err(e) => {
            report_fatal(&file, &e.into());
            return ExitCode::FAILURE;
        }
    };
    if tokens || show_all {
        let _ = ptree::print_tree(&debug_tree::tokens_tree(&lexed));
    }

    let machine = match ast::parser::parse(&lexed) {
        Ok(m) => m,
        Err(e) => {
            report_fatal(&file, &e.into());
            return ExitCode::FAILURE;
        }
    };
    if ast_flag || show_all {
        let _ = ptree::print_tree(&debug_tree::ast_tree(&machine));
    }

    if ir_flag || show_all {
        match ir::build(&machine) {
            Ok(parser_ir) => {
                let _ = ptree::print_tree(&debug_tree::ir_tree(&parser_ir));
            }
            Err(e) => {
                report_fatal(&file, &e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Generate { file, output, target, templates, trace } => run_generate(file, output, target, templates, trace),
        Command::Validate { file } => run_validate(file),
        Command::Debug { file, tokens, ast, ir } => run_debug(file, tokens, ast, ir),
    }
}
