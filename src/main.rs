//! Tabula - a spreadsheet cell store driven from the command line

mod commands;
mod config;
mod error;
mod logger;

use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};

use config::Config;
use tabula_core::{FORMULA_SIGN, Position, Sheet};
use tabula_engine::engine::format_value;

fn print_usage() {
    eprintln!("Usage: tabula [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]                    Command script to run (default: stdin)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --command <FORMULA>   Evaluate a formula and print its value");
    eprintln!("  -f, --functions <FILE>    Load custom Rhai functions (can be repeated)");
    eprintln!("  --no-default-functions    Do not load default.rhai from the config dir");
    eprintln!("  --config <FILE>           Use this config file instead of config.toml");
    eprintln!("  -v, --verbose             Print debug logging to stderr");
    eprintln!("  -h, --help                Print help");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut file_path: Option<PathBuf> = None;
    let mut functions_files: Vec<PathBuf> = Vec::new();
    let mut command: Option<String> = None;
    let mut config_file: Option<PathBuf> = None;
    let mut no_default_functions = false;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "-c" | "--command" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --command requires a formula");
                    std::process::exit(1);
                }
                command = Some(args[i].to_string());
            }
            "-f" | "--functions" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --functions requires a file path");
                    std::process::exit(1);
                }
                functions_files.push(PathBuf::from(&args[i]));
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
                config_file = Some(PathBuf::from(&args[i]));
            }
            "--no-default-functions" => no_default_functions = true,
            "-v" | "--verbose" => verbose = true,
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if file_path.is_none() {
                    file_path = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }

    logger::init(verbose);

    let sheet = Config::load(config_file.as_deref()).and_then(|config| {
        let parser = config::build_parser(&config, &functions_files, no_default_functions)?;
        Ok(Sheet::with_parser(Box::new(parser)))
    });
    let mut sheet = match sheet {
        Ok(sheet) => sheet,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match command {
        Some(formula) => run_command(&mut sheet, &formula),
        None => run_script(&mut sheet, file_path),
    };
    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Evaluate one formula in an empty sheet. Returns false if it evaluates to
/// an error value.
fn run_command(sheet: &mut Sheet, formula: &str) -> Result<bool> {
    let input = if formula.starts_with(FORMULA_SIGN) {
        formula.to_string()
    } else {
        format!("{}{}", FORMULA_SIGN, formula)
    };
    let origin = Position::new(0, 0);
    sheet.set_cell(origin, &input)?;
    let value = sheet.value(origin)?;
    println!("{}", format_value(&value));
    Ok(!value.is_error())
}

/// Run a command script from `path`, or stdin. Returns false if any command
/// failed.
fn run_script(sheet: &mut Sheet, path: Option<PathBuf>) -> Result<bool> {
    let stdout = io::stdout();
    let stderr = io::stderr();
    let failures = match path {
        Some(path) => {
            let file =
                File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
            commands::run_script(
                sheet,
                BufReader::new(file),
                &mut stdout.lock(),
                &mut stderr.lock(),
            )?
        }
        None => commands::run_script(
            sheet,
            io::stdin().lock(),
            &mut stdout.lock(),
            &mut stderr.lock(),
        )?,
    };
    Ok(failures == 0)
}
