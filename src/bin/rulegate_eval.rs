//!
//! rulegate_eval
//! -------------
//! Evaluate a permission filter against one JSON document, the same way a rule's filter
//! is checked against a single loaded object.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};

use rulegate::cli::run_eval;
use rulegate::logging::init_tracing;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --kind <kind> --object <object.json> --filter <filter.json> [--json]\n\nFlags:\n  --kind <kind>        Entity kind of the document's root object\n  --object <path>      JSON document; nested objects and arrays of objects become relations\n  --filter <path>      Filter tree, or a flat map of keyword conditions such as {{\"owner__name\": \"bob\"}}\n  --json               Print the report as JSON\n  -h, --help           Show this help\n\nExit status is 0 when the document matches, 1 when it does not, 2 on error."
    );
}

struct Args {
    kind: String,
    object: PathBuf,
    filter: PathBuf,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<Option<Args>> {
    let (mut kind, mut object, mut filter, mut json) = (None, None, None, false);
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(None),
            "--json" => json = true,
            flag @ ("--kind" | "--object" | "--filter") => {
                let v = args.get(i + 1).cloned().ok_or_else(|| anyhow!("{} needs a value", flag))?;
                match flag {
                    "--kind" => kind = Some(v),
                    "--object" => object = Some(PathBuf::from(v)),
                    _ => filter = Some(PathBuf::from(v)),
                }
                i += 1;
            }
            other => return Err(anyhow!("unknown argument '{}'", other)),
        }
        i += 1;
    }
    Ok(Some(Args {
        kind: kind.ok_or_else(|| anyhow!("--kind is required"))?,
        object: object.ok_or_else(|| anyhow!("--object is required"))?,
        filter: filter.ok_or_else(|| anyhow!("--filter is required"))?,
        json,
    }))
}

fn run(args: &Args) -> Result<bool> {
    let report = run_eval(&args.kind, &args.object, &args.filter)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} -> {}", report.filter, if report.matched { "match" } else { "no match" });
    }
    Ok(report.matched)
}

fn main() -> ExitCode {
    init_tracing("warn");
    let argv: Vec<String> = env::args().collect();
    let program = argv.first().map(|s| s.as_str()).unwrap_or("rulegate_eval");
    let args = match parse_args(&argv) {
        Ok(Some(a)) => a,
        Ok(None) => { print_usage(program); return ExitCode::SUCCESS; }
        Err(e) => { eprintln!("error: {e}"); print_usage(program); return ExitCode::from(2); }
    };
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => { eprintln!("error: {e:#}"); ExitCode::from(2) }
    }
}
