use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use flatdb::tokenizer::Tokenizer;
use flatdb::{Config, Database, Outcome};

/// Interactive shell over a flatdb data directory.
#[derive(Parser, Debug)]
#[command(name = "flatdb", version, about)]
struct Args {
    /// Directory holding schema.json and the table files
    #[arg(long, env = "FLATDB_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Print the token stream of every statement before running it
    #[arg(long)]
    show_tokens: bool,
}

fn main() -> flatdb::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut db = Database::with_config(Config::new(args.data_dir))?;

    println!("flatdb shell, data in {}. Type 'exit' to quit.", db.data_dir().display());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nflatdb> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        if args.show_tokens {
            print_tokens(line);
        }

        match db.execute(line) {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => println!("Error: {e}"),
        }
    }

    Ok(())
}

fn print_tokens(line: &str) {
    // A lex error is reported again by execute.
    if let Ok(tokens) = Tokenizer::new(line).tokenize() {
        println!("--- Tokens ---");
        for token in tokens {
            println!("{} : {}", token.kind, token.lexeme);
        }
    }
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Created => println!("Table created."),
        Outcome::Inserted => println!("Inserted 1 row."),
        Outcome::Updated(n) => println!("Updated {n} row(s)."),
        Outcome::Deleted(n) => println!("Deleted {n} row(s)."),
        Outcome::Rows(result) => {
            if result.rows.is_empty() {
                println!("No rows found.");
            }
            for row in &result.rows {
                println!("{row}");
            }
        }
    }
}
