use clap::{Parser, ValueEnum};
use erdsketch::dialect::{Dialect, parse_with};
use erdsketch::diagram::{DiagramDocument, GridLayout};
use erdsketch::parser::parse_strict;
use erdsketch::report::Summary;
use std::fs;
use std::process;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Format {
    /// Table list as JSON
    #[default]
    Tables,
    /// Diagram document as JSON, with the source text embedded
    Diagram,
    /// Aligned plain-text summary
    Summary,
}

fn parse_dialect(s: &str) -> Result<Dialect, String> {
    Dialect::from_str(s).ok_or_else(|| format!("unknown dialect: {} (auto, sql, dbml, shorthand)", s))
}

#[derive(Parser, Debug)]
#[command(name = "erdsketch", version, about = "Parse schema text (SQL, DBML or shorthand) into ER diagram tables")]
struct Args {
    /// Schema source file
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Format::Tables)]
    format: Format,

    /// Force a dialect instead of detecting it
    #[arg(short, long, value_parser = parse_dialect, default_value = "auto")]
    dialect: Dialect,

    /// Use the strict grammar; malformed input is an error
    #[arg(long, default_value_t = false)]
    strict: bool,

    #[arg(long, default_value_t = 50.0)]
    margin: f64,

    #[arg(long, default_value_t = 300.0)]
    x_spacing: f64,

    #[arg(long, default_value_t = 250.0)]
    y_spacing: f64,

    /// Tables per grid row
    #[arg(long, default_value_t = 3)]
    per_row: usize,
}

fn main() {
    let args = Args::parse();

    let input = match fs::read_to_string(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", args.input, e);
            process::exit(1);
        }
    };

    let tables = if args.strict {
        match parse_strict(&input) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Parse error: {}", e);
                process::exit(1);
            }
        }
    } else {
        parse_with(&input, args.dialect)
    };

    let rendered = match args.format {
        Format::Tables => serde_json::to_string_pretty(&tables).map_err(|e| e.to_string()),
        Format::Diagram => {
            let layout = GridLayout {
                margin: args.margin,
                x_spacing: args.x_spacing,
                y_spacing: args.y_spacing,
                per_row: args.per_row,
            };
            DiagramDocument::from_tables(&tables, &layout)
                .with_source(input.as_str())
                .to_json()
                .map_err(|e| e.to_string())
        }
        Format::Summary => Ok(Summary::default().render(&tables)),
    };

    let rendered = match rendered {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to render output: {}", e);
            process::exit(1);
        }
    };

    match args.output {
        Some(path) => {
            if let Err(e) = fs::write(&path, &rendered) {
                eprintln!("Failed to write {}: {}", path, e);
                process::exit(1);
            }
        }
        None => println!("{}", rendered.trim_end()),
    }
}
