//! vicore entrypoint: run a key script against a file.
//!
//! The file is loaded into a buffer, the keys are fed to the command
//! interpreter until they run out, and the buffer is written back when it
//! changed. Register contents survive between runs through the history
//! file unless disabled in the config or on the command line.
use anyhow::{Context, Result};
use clap::Parser;
use core_actions::collab::{AcceptPrompt, DeclinePrompt, ExRequest, ExSink};
use core_actions::{EditOptions, Interpreter};
use core_config::{Config, load_from};
use core_events::ScriptedKeys;
use core_state::history::{read_history, write_history};
use core_state::{EditorState, Registers};
use core_text::Buffer;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

const LOG_FILE: &str = "vicore.log";

/// CLI arguments.
#[derive(Parser, Debug, Default)]
#[command(name = "vicore", version, about = "Run vi commands against a file")]
struct Args {
    /// File to edit. Missing files start as an empty buffer.
    pub path: Option<PathBuf>,
    /// Keys to execute, in `<Esc>` / `<C-v>` / `<CR>` notation.
    #[arg(long = "keys", short = 'k', default_value = "")]
    pub keys: String,
    /// Read the keys from a file instead (appended after `--keys`).
    #[arg(long = "keys-file")]
    pub keys_file: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `vicore.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Register history file (overrides the configured location).
    #[arg(long = "registers")]
    pub registers: Option<PathBuf>,
    /// Neither load nor save register history.
    #[arg(long = "no-history")]
    pub no_history: bool,
    /// Answer yes to "continue anyway?" prompts for oversized registers.
    #[arg(long = "yes", short = 'y')]
    pub yes: bool,
    /// Print the buffer to stdout instead of writing the file.
    #[arg(long = "print")]
    pub print: bool,
    /// List registers after the run, like `:display`. Optionally limited to
    /// the given register names.
    #[arg(long = "display", value_name = "NAMES", num_args = 0..=1, default_missing_value = "")]
    pub display: Option<String>,
}

/// Ex command lines requested by `!`, `=` and `:` are reported, not run.
struct ReportEx;

impl ExSink for ReportEx {
    fn submit(&mut self, request: ExRequest) {
        info!(target: "runtime", command = request.command.as_str(), range = ?request.range, "ex_request");
        eprintln!(":{}", request.command);
    }
}

/// What a session did, for the exit report and tests.
struct SessionOutcome {
    state: EditorState,
    wrote: bool,
    history_saved: bool,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global tracing subscriber already installed; drop guard so writer shuts down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

/// Line terminator a file was read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// CRLF only when every line feed follows a carriage return. Mixed files
    /// are edited as LF with the stray `\r` kept as line content.
    fn detect(content: &str) -> Self {
        let lf = content.matches('\n').count();
        if lf > 0 && content.matches("\r\n").count() == lf {
            Self::CrLf
        } else {
            if content.contains("\r\n") {
                warn!(target: "runtime", "mixed_line_endings");
            }
            Self::Lf
        }
    }

    fn encode(self, contents: String) -> String {
        match self {
            Self::Lf => contents,
            Self::CrLf => contents.replace('\n', "\r\n"),
        }
    }
}

fn load_buffer(path: Option<&Path>) -> Result<(Buffer, LineEnding)> {
    let Some(path) = path else {
        return Ok((Buffer::from_str("untitled", "")?, LineEnding::Lf));
    };
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("file");
    match fs::read_to_string(path) {
        Ok(content) => {
            let ending = LineEnding::detect(&content);
            debug!(
                target: "runtime",
                file = %path.display(),
                size_bytes = content.len(),
                ?ending,
                "file_read_ok"
            );
            let buffer = match ending {
                LineEnding::CrLf => Buffer::from_str(name, &content.replace("\r\n", "\n"))?,
                LineEnding::Lf => Buffer::from_str(name, &content)?,
            };
            Ok((buffer, ending))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(target: "runtime", file = %path.display(), "new_file");
            Ok((Buffer::from_str(name, "")?, LineEnding::Lf))
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

fn history_path(args: &Args, config: &Config) -> Option<PathBuf> {
    if args.no_history || !config.file.registers.history {
        return None;
    }
    Some(args.registers.clone().unwrap_or_else(|| config.history_path()))
}

fn load_history(registers: &mut Registers, path: &Path) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!(target: "runtime", file = %path.display(), error = %e, "history_unavailable");
            return;
        }
    };
    match read_history(registers, BufReader::new(file), false) {
        Ok(report) => info!(
            target: "runtime",
            restored = report.restored,
            skipped = report.skipped,
            "history_loaded"
        ),
        Err(e) => warn!(target: "runtime", error = %e, "history_read_failed"),
    }
}

fn save_history(registers: &Registers, path: &Path, max_lines: Option<usize>) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    let written = write_history(registers, &mut out, max_lines)?;
    out.flush()?;
    info!(target: "runtime", written, file = %path.display(), "history_saved");
    Ok(())
}

fn read_keys(args: &Args) -> Result<ScriptedKeys> {
    let mut keys = ScriptedKeys::parse(&args.keys)?;
    if let Some(path) = args.keys_file.as_ref() {
        let script = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        keys.push_script(script.trim_end_matches('\n'))?;
    }
    Ok(keys)
}

fn run_session(args: &Args, config: &Config) -> Result<SessionOutcome> {
    let mut keys = read_keys(args)?;
    let (buffer, ending) = load_buffer(args.path.as_deref())?;

    let mut state = EditorState::new(buffer);
    state.registers = Registers::new().with_max_bytes(config.file.registers.max_bytes);
    if let Some(path) = args.path.as_ref() {
        state = state.with_file_name(path);
    }
    let history = history_path(args, config);
    if let Some(path) = history.as_deref() {
        load_history(&mut state.registers, path);
    }

    let mut interp = Interpreter::new(state, EditOptions::from(config)).with_ex_sink(ReportEx);
    interp = if args.yes {
        interp.with_prompt(AcceptPrompt)
    } else {
        interp.with_prompt(DeclinePrompt)
    };
    info!(target: "runtime", keys = keys.remaining(), "session_start");
    interp.run(&mut keys);
    if let Some(register) = interp.recording() {
        warn!(target: "runtime", register = %register, "recording_unfinished");
    }
    let state = interp.into_state();
    info!(target: "runtime", beeps = state.beeps, dirty = state.dirty, "session_end");

    let mut wrote = false;
    if !args.print
        && state.dirty
        && let Some(path) = args.path.as_ref()
    {
        fs::write(path, ending.encode(state.buffer.contents())).with_context(|| format!("writing {}", path.display()))?;
        info!(target: "runtime", file = %path.display(), lines = state.line_count(), "file_written");
        wrote = true;
    }

    let mut history_saved = false;
    if let Some(path) = history.as_deref() {
        match save_history(&state.registers, path, config.file.registers.history_max_lines) {
            Ok(()) => history_saved = true,
            Err(e) => warn!(target: "runtime", file = %path.display(), error = %e, "history_write_failed"),
        }
    }

    Ok(SessionOutcome {
        state,
        wrote,
        history_saved,
    })
}

/// `:display` output: a title line and one row per register.
fn register_report(registers: &Registers, names: &str) -> Vec<String> {
    let filter = Some(names).filter(|n| !n.is_empty());
    std::iter::once("--- Registers ---".to_string())
        .chain(registers.listing(filter, 0).iter().map(ToString::to_string))
        .collect()
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = load_from(args.config.clone())?;
    let outcome = run_session(&args, &config)?;

    if args.print {
        print!("{}", outcome.state.buffer.contents());
    }
    if let Some(names) = args.display.as_deref() {
        for row in register_report(&outcome.state.registers, names) {
            println!("{row}");
        }
    }
    if let Some(msg) = outcome.state.message.as_deref() {
        eprintln!("{msg}");
    }
    debug!(
        target: "runtime",
        wrote = outcome.wrote,
        history_saved = outcome.history_saved,
        "shutdown"
    );
    Ok(())
}
