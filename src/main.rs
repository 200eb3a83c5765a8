use std::collections::{BTreeMap, HashMap};
use std::env;
use std::io::{self, Write};

use log::info;

use price_resolver::batch::{self, BatchOptions};
use price_resolver::config::Config;
use price_resolver::error::{AppError, Context, Result};
use price_resolver::provider::PriceQuote;
use price_resolver::resolver::Resolver;

const USAGE: &str = "\
Usage: price-resolver [OPTIONS] [CODES...]

Resolve current prices for security codes and print them as a JSON
object keyed by normalized code. With no codes, an interactive prompt
is started.

Options:
  --config <file>       JSON file overriding the builtin configuration
  --codes-file <file>   CSV file of codes to resolve (first column)
  --help                Show this message";

struct CliArgs {
    config: Option<String>,
    codes_file: Option<String>,
    codes: Vec<String>,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = CliArgs {
            config: None,
            codes_file: None,
            codes: Vec::new(),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    parsed.config = Some(args.next().ok_or_else(|| {
                        AppError::message("--config requires a file path")
                    })?);
                }
                "--codes-file" => {
                    parsed.codes_file = Some(args.next().ok_or_else(|| {
                        AppError::message("--codes-file requires a file path")
                    })?);
                }
                "--help" | "-h" => {
                    println!("{}", USAGE);
                    std::process::exit(0);
                }
                other if other.starts_with("--") => {
                    return Err(AppError::message(format!("Unknown option: {}", other)));
                }
                code => parsed.codes.push(code.to_string()),
            }
        }

        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = CliArgs::parse(env::args().skip(1))?;

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::builtin(),
    };

    let resolver = Resolver::new(&config)?;
    let options = config.batch_options();

    if args.codes.is_empty() && args.codes_file.is_none() {
        return run_interactive(&resolver, &options).await;
    }

    let mut codes = args.codes.clone();
    if let Some(path) = &args.codes_file {
        codes.extend(load_codes_from_csv(path)?);
    }

    let prices = batch::resolve_all(&resolver, &codes, &options).await;
    info!("resolved {} of {} requested codes", prices.len(), codes.len());
    print_prices(&prices)
}

async fn run_interactive(resolver: &Resolver, options: &BatchOptions) -> Result<()> {
    println!("Commands: resolve <code> [code ...], clear, status, exit");

    loop {
        print!("Waiting for command: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0].to_lowercase().as_str() {
            "exit" | "quit" => {
                println!("Exiting...");
                break;
            }
            "resolve" => {
                if parts.len() > 1 {
                    let codes: Vec<String> = parts[1..].iter().map(|s| s.to_string()).collect();
                    let prices = batch::resolve_all(resolver, &codes, options).await;
                    print_prices(&prices)?;
                } else {
                    println!("Usage: resolve <code> [code ...]");
                }
            }
            "clear" => {
                resolver.cache().clear();
                println!("Price cache cleared.");
            }
            "status" => {
                println!("Cached quotes: {}", resolver.cache().len());
            }
            _ => {
                println!("Unknown command. Available commands: resolve, clear, status, exit");
            }
        }
    }

    Ok(())
}

/// Print the resolved mapping as a JSON object of code to price. Codes
/// that resolved to nothing are absent from the object.
fn print_prices(prices: &HashMap<String, PriceQuote>) -> Result<()> {
    let mapping: BTreeMap<&str, f64> = prices
        .iter()
        .map(|(code, quote)| (code.as_str(), quote.price))
        .collect();

    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(())
}

fn load_codes_from_csv(path: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open codes file {}", path))?;

    let mut codes = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(code) = record.get(0) {
            codes.push(code.to_string());
        }
    }

    Ok(codes)
}
