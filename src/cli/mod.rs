use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::{
    EditOutcome, InputField, InputForm, InputSnapshot, InputStore, RenderedField,
    UnknownFieldError,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "fire-input",
    about = "Investment input form (assets, monthly contribution, duration, rate)"
)]
pub struct Cli {
    #[arg(long, allow_hyphen_values = true, help = "Initial 보유 자산, e.g. 1,000,000")]
    assets: Option<String>,
    #[arg(long, allow_hyphen_values = true, help = "Initial 매월 투자금")]
    monthly: Option<String>,
    #[arg(long, allow_hyphen_values = true, help = "Initial 투자기간(년)")]
    duration: Option<String>,
    #[arg(long, allow_hyphen_values = true, help = "Initial 연이율(%)")]
    rate: Option<String>,
    #[arg(long, help = "Read session commands from this file instead of stdin")]
    script: Option<PathBuf>,
    #[arg(
        long,
        conflicts_with = "script",
        help = "Apply the initial values and print without reading commands"
    )]
    no_input: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
    #[arg(
        long,
        default_value = "warn",
        help = "Log filter used when RUST_LOG is not set"
    )]
    log_level: String,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    UnknownField(#[from] UnknownFieldError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("cannot encode form as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid log filter '{filter}': {message}")]
    LogFilter { filter: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Edit { field: InputField, raw: String },
    Show,
    Quit,
}

/// Parses one session line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>, CliError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let command = match head {
        "show" => SessionCommand::Show,
        "quit" | "exit" => SessionCommand::Quit,
        _ => SessionCommand::Edit {
            field: head.parse()?,
            raw: rest.to_string(),
        },
    };
    Ok(Some(command))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub edits: usize,
    pub rejected: usize,
    pub malformed: usize,
}

/// Feeds commands from `input` into `form`, re-rendering to `echo` whenever
/// the store reports a change. Malformed lines go to `errors` and the
/// session carries on.
pub fn run_session<R, W, E>(
    form: &InputForm,
    input: R,
    echo: &mut W,
    errors: &mut E,
) -> Result<SessionSummary, CliError>
where
    R: BufRead,
    W: Write + ?Sized,
    E: Write + ?Sized,
{
    let dirty = Rc::new(Cell::new(false));
    let _subscription = form.store().subscribe({
        let dirty = dirty.clone();
        move |_| dirty.set(true)
    });

    let mut summary = SessionSummary::default();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                warn!(line = index + 1, %err, "malformed session command");
                writeln!(errors, "line {}: {err}", index + 1)?;
                summary.malformed += 1;
                continue;
            }
        };

        match command {
            SessionCommand::Quit => break,
            SessionCommand::Show => render_text(form, echo)?,
            SessionCommand::Edit { field, raw } => {
                summary.edits += 1;
                if let EditOutcome::Rejected(_) = form.edit(field, &raw) {
                    summary.rejected += 1;
                }
            }
        }

        if dirty.replace(false) {
            render_text(form, echo)?;
        }
    }
    Ok(summary)
}

pub fn render_text<W: Write + ?Sized>(form: &InputForm, out: &mut W) -> io::Result<()> {
    for rendered in form.render() {
        writeln!(
            out,
            "{:<9}{}: {}",
            rendered.field.key(),
            rendered.label,
            rendered.display
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormReport {
    values: InputSnapshot,
    fields: Vec<RenderedField>,
    missing: Vec<InputField>,
    complete: bool,
}

pub fn write_report<W: Write>(
    form: &InputForm,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Text => {
            render_text(form, out)?;
            let missing = form.missing_fields();
            if !missing.is_empty() {
                let keys: Vec<_> = missing.iter().map(|field| field.key()).collect();
                writeln!(out, "missing: {}", keys.join(", "))?;
            }
        }
        OutputFormat::Json => {
            let report = FormReport {
                values: form.store().snapshot(),
                fields: form.render(),
                missing: form.missing_fields(),
                complete: form.is_complete(),
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn init_logging(default_filter: &str) -> Result<(), CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| CliError::LogFilter {
            filter: default_filter.to_string(),
            message: e.to_string(),
        })?,
    };
    // A subscriber may already be installed (tests, embedding hosts).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
    Ok(())
}

fn apply_initial_edits(form: &InputForm, cli: &Cli) {
    let initial = [
        (InputField::InitialAssets, &cli.assets),
        (InputField::MonthlyInvests, &cli.monthly),
        (InputField::InvestDuration, &cli.duration),
        (InputField::InterestRate, &cli.rate),
    ];
    for (field, raw) in initial {
        let Some(raw) = raw else { continue };
        if let EditOutcome::Rejected(reason) = form.edit(field, raw) {
            warn!(field = field.key(), raw = %raw, ?reason, "initial value ignored");
        }
    }
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    init_logging(&cli.log_level)?;

    let form = InputForm::new(InputStore::new());
    apply_initial_edits(&form, &cli);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut errors = io::stderr();
    // Live re-renders would corrupt a JSON document on stdout.
    let mut sink = io::sink();
    let echo: &mut dyn Write = match cli.output {
        OutputFormat::Text => &mut out,
        OutputFormat::Json => &mut sink,
    };

    let summary = if let Some(path) = &cli.script {
        info!(script = %path.display(), "running session script");
        let reader = BufReader::new(File::open(path)?);
        Some(run_session(&form, reader, echo, &mut errors)?)
    } else if cli.no_input {
        None
    } else {
        info!("reading session commands from stdin");
        render_text(&form, echo)?;
        Some(run_session(&form, io::stdin().lock(), echo, &mut errors)?)
    };
    if let Some(summary) = summary {
        info!(
            edits = summary.edits,
            rejected = summary.rejected,
            malformed = summary.malformed,
            "session finished"
        );
    }

    write_report(&form, cli.output, &mut out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn session(script: &str) -> (InputForm, SessionSummary, String, String) {
        let form = InputForm::new(InputStore::new());
        let mut echo = Vec::new();
        let mut errors = Vec::new();
        let summary = run_session(&form, Cursor::new(script), &mut echo, &mut errors)
            .expect("session runs");
        (
            form,
            summary,
            String::from_utf8(echo).expect("utf8 echo"),
            String::from_utf8(errors).expect("utf8 errors"),
        )
    }

    #[test]
    fn parse_command_reads_field_and_rest_of_line() {
        assert_eq!(
            parse_command("assets 1,000,000").expect("valid"),
            Some(SessionCommand::Edit {
                field: InputField::InitialAssets,
                raw: "1,000,000".to_string(),
            })
        );
        assert_eq!(
            parse_command("  rate  ").expect("valid"),
            Some(SessionCommand::Edit {
                field: InputField::InterestRate,
                raw: String::new(),
            })
        );
        assert_eq!(parse_command("show").expect("valid"), Some(SessionCommand::Show));
        assert_eq!(parse_command("exit").expect("valid"), Some(SessionCommand::Quit));
    }

    #[test]
    fn parse_command_skips_blank_and_comment_lines() {
        assert_eq!(parse_command("").expect("valid"), None);
        assert_eq!(parse_command("   # note").expect("valid"), None);
    }

    #[test]
    fn parse_command_rejects_unknown_field() {
        let err = parse_command("salary 10").expect_err("unknown field");
        assert!(matches!(err, CliError::UnknownField(_)));
        assert!(err.to_string().contains("salary"));
    }

    #[test]
    fn session_applies_edits_and_rerenders_on_change() {
        let (form, summary, echo, errors) =
            session("assets 1,500,000\nmonthly abc\nduration 50\nrate 4.5\n");

        assert_eq!(
            form.store().snapshot(),
            InputSnapshot {
                initial_assets: 1_500_000.0,
                monthly_invests: 0.0,
                invest_duration: 50.0,
                interest_rate: 4.5,
            }
        );
        assert_eq!(
            summary,
            SessionSummary {
                edits: 4,
                rejected: 1,
                malformed: 0,
            }
        );
        assert!(errors.is_empty());
        // Three committed edits, three renders of four lines each.
        assert_eq!(echo.lines().count(), 12);
        assert!(echo.contains("assets   보유 자산: 1,500,000"));
    }

    #[test]
    fn session_continues_after_malformed_line_and_stops_at_quit() {
        let (form, summary, _, errors) = session("salary 10\nduration 30\nquit\nrate 9\n");

        assert_eq!(form.store().invest_duration(), 30.0);
        assert_eq!(form.store().interest_rate(), 0.0);
        assert_eq!(summary.malformed, 1);
        assert!(errors.starts_with("line 1:"));
    }

    #[test]
    fn text_report_lists_missing_fields() {
        let form = InputForm::new(InputStore::new());
        form.edit(InputField::InitialAssets, "10000");
        form.edit(InputField::InvestDuration, "20");

        let mut out = Vec::new();
        write_report(&form, OutputFormat::Text, &mut out).expect("report");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("assets   보유 자산: 10,000\n"));
        assert!(text.contains("rate     연이율(%): \n"));
        assert!(text.ends_with("missing: monthly, rate\n"));
    }

    #[test]
    fn json_report_contains_values_and_display_text() {
        let form = InputForm::new(InputStore::new());
        form.edit(InputField::MonthlyInvests, "250,000");

        let mut out = Vec::new();
        write_report(&form, OutputFormat::Json, &mut out).expect("report");
        let json: serde_json::Value = serde_json::from_slice(&out).expect("valid json");

        assert_eq!(json["values"]["monthlyInvests"], 250_000.0);
        assert_eq!(json["fields"][1]["display"], "250,000");
        assert_eq!(json["fields"][1]["field"], "monthlyInvests");
        assert_eq!(json["complete"], false);
        assert_eq!(json["missing"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn cli_accepts_initial_values_with_hyphens() {
        let cli = Cli::try_parse_from(["fire-input", "--rate", "-5", "--no-input"])
            .expect("valid args");
        assert_eq!(cli.rate.as_deref(), Some("-5"));
        assert!(cli.no_input);
        assert_eq!(cli.output, OutputFormat::Text);

        let form = InputForm::new(InputStore::new());
        apply_initial_edits(&form, &cli);
        assert_eq!(form.store().interest_rate(), 0.0);
    }

    #[test]
    fn cli_rejects_script_with_no_input() {
        let result = Cli::try_parse_from(["fire-input", "--script", "a.txt", "--no-input"]);
        assert!(result.is_err());
    }
}
