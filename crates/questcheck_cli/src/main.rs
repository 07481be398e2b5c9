use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use questcheck_cli::{run_check, CheckOptions};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();
    match run_cli() {
        Ok(code) => code,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(2)
        }
    }
}

fn run_cli() -> Result<ExitCode, String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        print_usage();
        return Ok(ExitCode::SUCCESS);
    }

    let mut options = CheckOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--root" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --root".to_string())?;
                options.root = Some(PathBuf::from(value));
                index += 2;
            }
            "--extension" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --extension".to_string())?;
                options.current_extension = Some(value.clone());
                index += 2;
            }
            "--enabled" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --enabled".to_string())?;
                options.enabled_extensions = value
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect();
                index += 2;
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option '{other}'"));
            }
            _ => break,
        }
    }

    let level = args
        .get(index)
        .ok_or_else(|| "missing level name".to_string())?;
    if args.len() > index + 1 {
        return Err("expected exactly one level name".to_string());
    }
    options.level = level.clone();

    let report = run_check(&options)?;
    println!("{}", report.render_human_readable());
    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "questcheck - level content validator",
        "",
        "Usage:",
        "  questcheck [--root <dir>] [--extension <id>] [--enabled <id,id>] <level>",
        "",
        "Exit codes:",
        "  0  level content is clean",
        "  1  content errors found",
        "  2  usage or startup failure",
        "",
        "Defaults:",
        "  --root      resolved from QUEST_ROOT or the executable location",
        "  --extension the first discovered extension",
    ]
    .join("\n")
}
