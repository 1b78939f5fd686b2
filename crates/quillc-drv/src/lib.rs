//! quillc-drv - The `quillc` command-line driver.
//!
//! Orchestrates the pipeline: read the source file, lex, compile into
//! the object file (default `interpreted_file.o` in the working
//! directory), then interpret the object file. The compile phase and the
//! interpret phase each get their own scope stack — compile-time
//! pre-evaluation never leaks state into the run.
//!
//! Exit contract: 0 on success; nonzero on any user or internal error,
//! with a grouped-by-severity report followed by a chronological report
//! on stderr.

pub mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use quillc_gen::{CompileOptions, StatementCompiler};
use quillc_int::Interpreter;
use quillc_lex::{tokenize_bytes, LangTerms};
use quillc_util::{LogLevel, MessageCollector};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

/// Compile and interpret a Quill source file.
///
/// # Usage
///
/// ```text
/// quillc prog.ql
/// quillc prog.ql -o custom.o
/// quillc prog.ql --log-level illustrative
/// quillc prog.ql --dump-tokens
/// ```
#[derive(Debug, Parser)]
#[command(name = "quillc", version, about = "Compile and interpret Quill source")]
pub struct Cli {
    /// Source file to compile and run.
    pub source: PathBuf,

    /// Compiled object file to produce.
    #[arg(short, long, default_value = "interpreted_file.o")]
    pub output: PathBuf,

    /// Verbosity: silent, illustrative, verbose, effusive or debug.
    #[arg(long, default_value_t = LogLevel::Silent)]
    pub log_level: LogLevel,

    /// Give up after this many user errors.
    #[arg(long, default_value_t = 30)]
    pub error_limit: usize,

    /// Print the committed token stream and stop before compiling.
    #[arg(long)]
    pub dump_tokens: bool,
}

/// Run the whole pipeline for one source file.
///
/// # Example
///
/// ```no_run
/// use clap::Parser;
///
/// let cli = quillc_drv::Cli::parse_from(["quillc", "prog.ql"]);
/// if let Err(err) = quillc_drv::run(cli) {
///     eprintln!("error: {err:#}");
///     std::process::exit(1);
/// }
/// ```
pub fn run(cli: Cli) -> Result<()> {
    logging::init(cli.log_level);
    let terms = LangTerms::new();

    // Phase 1: lex.
    let source_name = cli.source.display().to_string();
    let bytes = std::fs::read(&cli.source)
        .with_context(|| format!("cannot read source file {source_name}"))?;
    let tokens = match tokenize_bytes(&bytes, &source_name, &terms) {
        Ok(tokens) => tokens,
        Err(err) => bail!("lexing failed: {err}"),
    };
    log::info!("lexed {} tokens from {source_name}", tokens.len());

    if cli.dump_tokens {
        for tkn in &tokens {
            println!("{}", tkn.descr_with_pos());
        }
        return Ok(());
    }

    // Phase 2: compile to the object file.
    let mut compile_msgs = MessageCollector::new();
    let out_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&cli.output)
        .with_context(|| format!("cannot create object file {}", cli.output.display()))?;
    let opts = CompileOptions {
        user_error_limit: cli.error_limit,
        log_level: cli.log_level,
    };
    let compiler = StatementCompiler::new(tokens, &terms, out_file, opts);
    let compile_result = compiler.compile(&mut compile_msgs);

    report(&compile_msgs);
    if let Err(fatal) = compile_result {
        bail!("compilation halted: {fatal}");
    }
    if compile_msgs.has_user_errors() || compile_msgs.has_internal_errors() {
        bail!(
            "compilation failed with {} error(s)",
            compile_msgs
                .chronological()
                .iter()
                .filter(|m| m.kind >= quillc_util::MessageKind::UserError)
                .count()
        );
    }
    log::info!("wrote {}", cli.output.display());

    // Phase 3: interpret the object file on a fresh scope stack.
    let object = File::open(&cli.output)
        .with_context(|| format!("cannot reopen object file {}", cli.output.display()))?;
    let mut run_msgs = MessageCollector::new();
    let mut interp = Interpreter::new(object, &terms)
        .with_illustrative(cli.log_level.is_illustrative());
    if let Err(err) = interp.run(&mut run_msgs) {
        report(&run_msgs);
        bail!("run-time error in {source_name}: {err}");
    }
    report(&run_msgs);

    if cli.log_level >= LogLevel::Debug {
        eprint!("{}", interp.scopes().display_variables());
    }
    Ok(())
}

/// Print the grouped-by-severity report, then the chronological one,
/// to stderr. Quiet when nothing was collected.
fn report(msgs: &MessageCollector) {
    let grouped = msgs.grouped_report();
    if grouped.is_empty() {
        return;
    }
    eprint!("{grouped}");
    eprintln!("---- in order of occurrence ----");
    eprint!("{}", msgs.chronological_report());
}
