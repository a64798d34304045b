//! Purpose: `slicecfg` CLI entry point.
//! Role: Binary crate root; parses args, loads the registry, emits JSON on stdout.
//! Invariants: Commands emit JSON on stdout (pretty on a TTY, compact otherwise).
//! Invariants: Non-interactive errors and notices are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Skipped overrides never change the exit code; they surface as notices.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use slicecfg::api::{
    AliasTable, Diagnostic, EngineConfig, Error, ErrorKind, JobContext, OptionRegistry,
    Technology, describe_config, prepare_job, to_exit_code,
};
use slicecfg::notice::{Notice, notice_json};
use tracing_subscriber::EnvFilter;

mod color_json;
mod command_dispatch;

use color_json::colorize_json;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    let engine = EngineSources {
        registry: cli.registry,
        aliases: cli.aliases,
        config: EngineConfig::from_env().with_profile(cli.profile.into()),
    };

    command_dispatch::dispatch_command(cli.command, engine, color_mode)
        .map_err(add_registry_hint)
        .map_err(|err| (err, color_mode))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "slicecfg",
    version,
    about = "Typed option overrides and schema projection for slicing jobs",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Options are described by a registry file. Payloads are JSON objects.

Mental model:
  - `schema` shows every option, grouped by category
  - `apply` seeds defaults, applies a payload, prints the finished config
  - `get` reads individual options after the same preparation
"#,
    after_help = r#"EXAMPLES
  $ slicecfg --registry options.json schema
  $ slicecfg --registry options.json apply '{"config": {"layer_height": 0.1}, "wall_loops": 3}'
  $ slicecfg --registry options.json get layer_height sparse_infill_pattern

LEARN MORE
  $ slicecfg <command> --help"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        env = "SLICECFG_REGISTRY",
        help = "Option registry JSON file",
        value_hint = ValueHint::FilePath
    )]
    registry: Option<PathBuf>,
    #[arg(
        long,
        env = "SLICECFG_ALIASES",
        help = "Extra alias table JSON, layered over the built-in legacy aliases",
        value_hint = ValueHint::FilePath
    )]
    aliases: Option<PathBuf>,
    #[arg(
        long,
        default_value = "fff",
        value_enum,
        help = "Job profile used to filter options: fff|sla"
    )]
    profile: ProfileCli,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ProfileCli {
    Fff,
    Sla,
}

impl From<ProfileCli> for Technology {
    fn from(profile: ProfileCli) -> Self {
        match profile {
            ProfileCli::Fff => Technology::Fff,
            ProfileCli::Sla => Technology::Sla,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Print the category-grouped option schema",
        after_help = r#"EXAMPLES
  $ slicecfg --registry options.json schema
  $ slicecfg --registry options.json --profile sla schema

NOTES
  - Without a registry the schema is empty and a warning is logged."#
    )]
    Schema,
    #[command(
        about = "Prepare a job from a payload and print the finished config",
        after_help = r#"EXAMPLES
  $ slicecfg --registry options.json apply '{"wall_loops": 3}'
  $ slicecfg --registry options.json apply --file job.json --dump-config
  $ echo '{"supports_enabled": true}' | slicecfg --registry options.json apply

NOTES
  - Overrides that cannot be applied are reported as notices on stderr.
  - The payload keys `config`, `rotation_deg`, and `dumpConfig` are reserved."#
    )]
    Apply {
        #[arg(help = "Inline JSON payload (reads --file or stdin when omitted)")]
        payload: Option<String>,
        #[arg(
            long,
            short = 'f',
            conflicts_with = "payload",
            help = "Read the payload from a file",
            value_hint = ValueHint::FilePath
        )]
        file: Option<PathBuf>,
        #[arg(long, help = "Skip the baseline preset")]
        no_preset: bool,
        #[arg(long, help = "Include a key-sorted `key = value` dump in the output")]
        dump_config: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Print the serialized value of one or more options",
        after_help = r#"EXAMPLES
  $ slicecfg --registry options.json get layer_height
  $ slicecfg --registry options.json get wall_loops --payload '{"wall_loops": 4}'"#
    )]
    Get {
        #[arg(required = true, help = "Option keys")]
        keys: Vec<String>,
        #[arg(long, help = "Inline JSON payload applied before reading")]
        payload: Option<String>,
        #[arg(long, help = "Skip the baseline preset")]
        no_preset: bool,
    },
    #[command(
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ slicecfg completion bash > /usr/local/etc/bash_completion.d/slicecfg
  $ slicecfg completion zsh > ~/.zfunc/_slicecfg"#
    )]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Inputs resolved from global flags; loaded lazily per command.
struct EngineSources {
    registry: Option<PathBuf>,
    aliases: Option<PathBuf>,
    config: EngineConfig,
}

impl EngineSources {
    fn load_registry(&self) -> Result<Option<OptionRegistry>, Error> {
        match &self.registry {
            Some(path) => OptionRegistry::from_path(path).map(Some),
            None => {
                tracing::warn!("no option registry given (--registry or SLICECFG_REGISTRY)");
                Ok(None)
            }
        }
    }

    fn load_aliases(&self) -> Result<AliasTable, Error> {
        let mut table = AliasTable::legacy();
        if let Some(path) = &self.aliases {
            table.extend(AliasTable::from_path(path)?);
        }
        Ok(table)
    }
}

fn read_payload(inline: Option<&str>, file: Option<&Path>) -> Result<Option<Value>, Error> {
    let text = if let Some(inline) = inline {
        inline.to_string()
    } else if let Some(path) = file {
        std::fs::read_to_string(path).map_err(|err| {
            let kind = if err.kind() == io::ErrorKind::NotFound {
                ErrorKind::NotFound
            } else {
                ErrorKind::Io
            };
            Error::new(kind)
                .with_message("failed to read payload")
                .with_path(path)
                .with_source(err)
        })?
    } else if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read payload from stdin")
                .with_source(err)
        })?;
        buf
    } else {
        return Ok(None);
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_payload(&text).map(Some)
}

fn parse_payload(text: &str) -> Result<Value, Error> {
    slicecfg::api::parse_payload(text.as_bytes())
}

fn job_context(payload: Option<Value>) -> JobContext {
    payload.map(JobContext::from_payload).unwrap_or_default()
}

fn notice_time_now() -> String {
    slicecfg::core::schema::timestamp_now().unwrap_or_default()
}

fn emit_diagnostics(diagnostics: &[Diagnostic], cmd: &str, color_mode: ColorMode) {
    if diagnostics.is_empty() {
        return;
    }
    let time = notice_time_now();
    for diagnostic in diagnostics {
        emit_notice(&Notice::from_diagnostic(diagnostic, cmd, &time), color_mode);
    }
}

fn add_registry_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::InvalidRegistry => {
            err.with_hint("Check the registry entry named by `key`; defaults use override shapes.")
        }
        ErrorKind::NotFound if err.path().is_some() => {
            err.with_hint("Check the path, or set SLICECFG_REGISTRY.")
        }
        _ => err,
    }
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let use_color = color_mode.use_color(is_tty);
    let pretty = is_tty || use_color;
    let json = if pretty {
        if use_color {
            colorize_json(&value, true)
        } else {
            serde_json::to_string_pretty(&value)
                .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
        }
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", notice_text(notice, color_mode.use_color(is_tty)));
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_text(notice: &Notice, use_color: bool) -> String {
    let label = colorize_label("notice:", use_color, AnsiColor::Yellow);
    match &notice.key {
        Some(key) => format!("{label} {} (key: {key})", notice.message),
        None => format!("{label} {}", notice.message),
    }
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::InvalidRegistry => "invalid registry".to_string(),
        ErrorKind::InvalidPayload => "invalid payload".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(key) = err.key() {
        inner.insert("key".to_string(), json!(key));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(key) = err.key() {
        lines.push(format!(
            "{} {key}",
            colorize_label("key:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `slicecfg --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "slicecfg") else {
        return "Try `slicecfg --help`.".to_string();
    };

    let parts: Vec<&str> = tokens
        .iter()
        .skip(pos + 1)
        .take_while(|token| {
            !(token.starts_with('-') || token.starts_with('<') || token.starts_with('['))
        })
        .copied()
        .collect();

    if parts.is_empty() {
        return "Try `slicecfg --help`.".to_string();
    }
    format!("Try `slicecfg {} --help`.", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::{
        Error, ErrorKind, Notice, error_json, error_text, notice_text, parse_payload, read_payload,
    };
    use serde_json::{Map, json};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::Usage).with_message("bad input");
        let colored = error_text(&err, true);
        let plain = error_text(&err, false);
        assert!(colored.contains("\u{1b}[31merror:\u{1b}[0m"));
        assert!(plain.contains("error:"));
        assert!(!plain.contains("\u{1b}["));
    }

    #[test]
    fn error_json_carries_key_and_path() {
        let err = Error::new(ErrorKind::InvalidRegistry)
            .with_message("invalid default")
            .with_key("wall_loops")
            .with_path("/tmp/options.json");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], json!("InvalidRegistry"));
        assert_eq!(value["error"]["key"], json!("wall_loops"));
        assert_eq!(value["error"]["path"], json!("/tmp/options.json"));
    }

    #[test]
    fn payload_must_be_an_object() {
        assert!(parse_payload(r#"{"wall_loops": 3}"#).is_ok());
        let err = parse_payload("[1, 2]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
        let err = parse_payload("{oops").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    }

    #[test]
    fn payload_file_is_read() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(br#"{"layer_height": 0.1}"#).expect("write");
        let payload = read_payload(None, Some(file.path())).expect("payload");
        assert_eq!(payload, Some(json!({"layer_height": 0.1})));

        let err = read_payload(None, Some(std::path::Path::new("/nonexistent/job.json")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn notice_text_names_the_key() {
        let notice = Notice {
            kind: "unknown_key".to_string(),
            time: String::new(),
            cmd: "apply".to_string(),
            key: Some("mystery".to_string()),
            message: "override failed".to_string(),
            details: Map::new(),
        };
        assert_eq!(
            notice_text(&notice, false),
            "notice: override failed (key: mystery)"
        );
    }
}
