//! tabula - render spreadsheet templates against JSON data

mod config;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tabula_core::{Template, TemplateOptions, Workbook};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "tabula")]
#[command(version)]
#[command(about = "Expand spreadsheet templates ({{#each}}, {{#if}}, {{= expr}}) against JSON data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: <config dir>/tabula/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Columns scanned when capturing template rows
    #[arg(long, global = true)]
    max_columns: Option<usize>,

    /// Let {{/each}} and {{/each-obj}} close either kind of loop
    #[arg(long, global = true)]
    loose_close_markers: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template and save the result
    Render {
        /// Template workbook (.grid or .csv)
        template: PathBuf,

        /// JSON data document, `-` for stdin (repeatable; earlier documents win)
        #[arg(short, long = "data", required = true)]
        data: Vec<PathBuf>,

        /// Output file (.grid, .csv or .md)
        #[arg(short, long)]
        output: PathBuf,

        /// Sheet to write when the output is CSV (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Parse a template and report its structure without rendering
    Check {
        /// Template workbook (.grid or .csv)
        template: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    init_logging(cli.verbose, cli.quiet, config.log_level.as_deref());

    let mut options = config.template;
    if let Some(max_columns) = cli.max_columns {
        options.max_columns = max_columns;
    }
    if cli.loose_close_markers {
        options.strict_close_markers = false;
    }
    tracing::debug!(
        max_columns = options.max_columns,
        strict_close_markers = options.strict_close_markers,
        "template options"
    );

    match cli.command {
        Command::Render {
            template,
            data,
            output,
            sheet,
        } => render(&template, &data, &output, sheet.as_deref(), &options),
        Command::Check { template } => check(&template, &options),
    }
}

fn init_logging(verbose: u8, quiet: bool, configured: Option<&str>) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => configured.unwrap_or("info"),
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_data(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read data from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read data {}", path.display()))
}

fn render(
    template: &Path,
    data: &[PathBuf],
    output: &Path,
    sheet: Option<&str>,
    options: &TemplateOptions,
) -> Result<()> {
    let documents = data
        .iter()
        .map(|path| read_data(path))
        .collect::<Result<Vec<_>>>()?;
    tabula_core::write_results(template, output, &documents, options, sheet)
        .with_context(|| format!("Failed to render {}", template.display()))?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn check(path: &Path, options: &TemplateOptions) -> Result<()> {
    let workbook =
        Workbook::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let template = Template::parse(&workbook, options)?;
    template.validate_conditions()?;

    for sheet in template.sheets() {
        match sheet.span {
            Some((first, last)) => println!(
                "{}: {} blocks, {} template rows, rows {}-{}",
                sheet.name,
                sheet.block_count(),
                sheet.row_templates.len(),
                first,
                last
            ),
            None => println!("{}: no directives", sheet.name),
        }
    }
    Ok(())
}
