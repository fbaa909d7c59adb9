//! Command-line interface for extfmt
//! Formats a template file (or stdin) and prints the result.
//!
//! Usage:
//!   extfmt `<path>` [--var name=value]... [--vars vars.json]   - Format a template
//!   extfmt --list-conversions                                  - List the `!flag` conversions

use std::fs;
use std::io::Read;
use std::path::Path;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use extfmt::{ExtfmtConfig, Formatter, Loader, Value, Vars};

/// Picked up from the working directory when `--config` is not given
const PROJECT_CONFIG: &str = "extfmt.toml";

fn cli() -> Command {
    Command::new("extfmt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Format templates whose {...} fields are small programs")
        .arg(
            Arg::new("path")
                .help("Template file to format; reads stdin when absent or '-'")
                .index(1),
        )
        .arg(
            Arg::new("var")
                .long("var")
                .value_name("NAME=VALUE")
                .help("Bind a string variable (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("vars")
                .long("vars")
                .value_name("FILE")
                .help("Bind the variables of a JSON or YAML mapping"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file layered over the built-in defaults [default: ./extfmt.toml if present]"),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .short('w')
                .value_name("N")
                .help("Width used by the alignment conversions")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("list-conversions")
                .long("list-conversions")
                .help("List the available conversion flags")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Log debug output to stderr")
                .action(ArgAction::SetTrue),
        )
}

fn main() {
    let matches = cli().get_matches();

    let level = if matches.get_flag("verbose") {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(&matches).unwrap_or_else(|e| fail("Configuration error", e));

    if matches.get_flag("list-conversions") {
        handle_list_conversions_command(config);
        return;
    }

    handle_format_command(&matches, config);
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, error);
    std::process::exit(1);
}

fn load_config(matches: &ArgMatches) -> Result<ExtfmtConfig, config::ConfigError> {
    let mut loader = Loader::new();
    loader = match matches.get_one::<String>("config") {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file(PROJECT_CONFIG),
    };
    if let Some(width) = matches.get_one::<u64>("width") {
        loader = loader.set_override("conversions.width", *width)?;
    }
    loader.build()
}

/// Handle the format command
fn handle_format_command(matches: &ArgMatches, config: ExtfmtConfig) {
    let template = read_template(matches.get_one::<String>("path").map(String::as_str))
        .unwrap_or_else(|e| fail("Error reading template", e));

    let mut vars = Vars::new();
    if let Some(path) = matches.get_one::<String>("vars") {
        let file_vars = load_vars_file(Path::new(path))
            .unwrap_or_else(|e| fail("Error reading variables", e));
        vars = vars.into_iter().chain(file_vars).collect();
    }
    for assignment in matches.get_many::<String>("var").into_iter().flatten() {
        let (name, value) = assignment.split_once('=').unwrap_or_else(|| {
            fail(
                "Invalid --var",
                format!("expected NAME=VALUE, got '{}'", assignment),
            )
        });
        vars.insert(name.trim(), value);
    }

    let mut formatter = Formatter::with_config(config);
    match formatter.format(template, vars) {
        Ok(text) => print!("{}", text),
        Err(e) => fail("Error", e),
    }
}

/// Handle the list-conversions command
fn handle_list_conversions_command(config: ExtfmtConfig) {
    let formatter = Formatter::with_config(config);
    let table = formatter.conversions();
    println!("Available conversions (applied in this order):\n");
    for conversion in table.conversions() {
        println!(
            "  !{}  {:<14} {:?}",
            conversion.flag, conversion.name, conversion.class
        );
    }
    println!("\nAlignment width: {}", table.layout().width);
}

fn read_template(path: Option<&str>) -> std::io::Result<String> {
    match path {
        None | Some("-") => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
        Some(path) => fs::read_to_string(path),
    }
}

/// Variables from a JSON or YAML mapping, chosen by file extension
fn load_vars_file(path: &Path) -> Result<Vec<(String, Value)>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let document: serde_json::Value = if is_yaml {
        serde_yaml::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))?
    };
    match document {
        serde_json::Value::Object(entries) => Ok(entries
            .into_iter()
            .map(|(name, value)| (name, Value::from(value)))
            .collect()),
        _ => Err(format!("{}: expected a mapping of names to values", path.display())),
    }
}
