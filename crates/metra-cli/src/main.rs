//! Metra command-line runner.
//!
//! Runs one script, prints its displayed lines on stdout and its
//! diagnostics on stderr.

use std::env;
use std::fs;
use std::process;
use std::sync::Once;

use metra_eval::{run_source, RunConfig, RunOutcome};
use metra_types::{Diagnostic, SourceFile};

static TRACING_INIT: Once = Once::new();

/// Install a subscriber for `tracing` output. Does nothing unless
/// `RUST_LOG` is set.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

#[derive(Debug, Clone, PartialEq)]
struct CliArgs {
    path: String,
    json: bool,
    config: RunConfig,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut path = None;
    let mut json = false;
    let mut config = RunConfig::default();
    let mut rest = args.iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--step-limit" => {
                let value = rest
                    .next()
                    .ok_or_else(|| "--step-limit needs a value".to_string())?;
                let limit = value
                    .parse::<u64>()
                    .map_err(|e| format!("invalid step limit '{value}': {e}"))?;
                config = config.with_step_limit(limit);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option '{flag}'")),
            file if path.is_none() => path = Some(file.to_string()),
            extra => return Err(format!("unexpected argument '{extra}'")),
        }
    }
    let path = path.ok_or_else(|| "no script given".to_string())?;
    Ok(CliArgs { path, json, config })
}

fn print_usage(program: &str) {
    eprintln!("Metra script runner");
    eprintln!("Usage: {program} <file> [--json] [--step-limit N]");
}

/// A diagnostic with its source line and a caret underline.
fn render_diagnostic(diagnostic: &Diagnostic, source: &SourceFile) -> String {
    let line_no = diagnostic.span.start_line.to_string();
    let gutter = " ".repeat(line_no.len());
    let mut out = format!(
        "{diagnostic}\n{gutter} |\n{line_no} | {}\n{gutter} | {}",
        diagnostic.source_line,
        source.underline(diagnostic.span)
    );
    if let Some(suggestion) = &diagnostic.suggestion {
        out.push_str(&format!("\n{gutter} = help: {suggestion}"));
    }
    out
}

fn report(outcome: &RunOutcome, source: &SourceFile) {
    for line in &outcome.output {
        println!("{line}");
    }
    for diagnostic in outcome.diagnostics.iter() {
        eprintln!("{}", render_diagnostic(diagnostic, source));
    }
    let hidden = outcome.diagnostics.total_errors - outcome.diagnostics.errors.len();
    if hidden > 0 {
        eprintln!("... and {hidden} more errors");
    }
}

fn main() {
    init_tracing();
    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("metra", String::as_str);

    let cli = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("Error: {message}");
            print_usage(program);
            process::exit(2);
        }
    };

    let text = match fs::read_to_string(&cli.path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: failed to read {}: {e}", cli.path);
            process::exit(1);
        }
    };

    let outcome = run_source(&cli.path, &text, &cli.config);
    tracing::debug!(
        executed = outcome.executed,
        steps = outcome.steps,
        errors = outcome.diagnostics.total_errors,
        "run finished"
    );

    if cli.json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: failed to encode report: {e}");
                process::exit(1);
            }
        }
    } else {
        report(&outcome, &SourceFile::new(cli.path.as_str(), text.as_str()));
    }

    if !outcome.succeeded() {
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metra_types::{ErrorCode, Span};
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_file_and_flags() {
        let cli = parse_args(&args(&["demo.metra", "--json", "--step-limit", "50"])).unwrap();
        assert_eq!(cli.path, "demo.metra");
        assert!(cli.json);
        assert_eq!(cli.config.step_limit, 50);
    }

    #[test]
    fn defaults() {
        let cli = parse_args(&args(&["demo.metra"])).unwrap();
        assert!(!cli.json);
        assert_eq!(cli.config, RunConfig::default());
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["a.metra", "b.metra"])).is_err());
        assert!(parse_args(&args(&["a.metra", "--verbose"])).is_err());
        assert!(parse_args(&args(&["a.metra", "--step-limit"])).is_err());
        assert!(parse_args(&args(&["a.metra", "--step-limit", "many"])).is_err());
    }

    #[test]
    fn diagnostic_rendering_underlines_the_span() {
        let source = SourceFile::new("demo.metra", "a = 1\nb = 2 furlong");
        let diagnostic = Diagnostic::new(
            "demo.metra",
            ErrorCode::UNKNOWN_UNIT,
            "unknown unit 'furlong'",
            Span::new(2, 7, 2, 13),
            "b = 2 furlong",
        )
        .with_suggestion("known units: mm, cm, m, km, in, ft, yd, mi");
        let rendered = render_diagnostic(&diagnostic, &source);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "demo.metra:2:7: error[E200]: unknown unit 'furlong'");
        assert_eq!(lines[2], "2 | b = 2 furlong");
        assert!(lines[3].ends_with("^^^^^^^"));
        assert_eq!(lines[4], "  = help: known units: mm, cm, m, km, in, ft, yd, mi");
    }
}
