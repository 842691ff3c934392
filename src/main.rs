use std::fs;
use std::io::{BufRead, Write, stdin, stdout};
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use miette::{IntoDiagnostic, WrapErr};
use sqrtcalc::lex::normalize;
use sqrtcalc::{Lexer, Notice, Session};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Evaluate arithmetic expressions with + - * / ^ % and sqrt()")]
struct Args {
    /// Log more (-v info, -vv debug, -vvv trace). Overrides RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the tokens of an expression.
    Tokenize { expression: String },
    /// Evaluate one expression.
    Eval { expression: String },
    /// Divide the last number of an expression by 100.
    Percent { expression: String },
    /// Evaluate every non-empty line of a file.
    Batch { filename: PathBuf },
    /// Interactive calculator session on stdin.
    Repl,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("sqrtcalc=info"),
        2 => EnvFilter::new("sqrtcalc=debug"),
        _ => EnvFilter::new("sqrtcalc=trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Tokenize { expression } => {
            let normalized = normalize(&expression);
            for token in Lexer::new(&normalized) {
                println!("{}", token?);
            }
            println!("EOF");
        }
        Commands::Eval { expression } => {
            let value = sqrtcalc::evaluate(&expression)?;
            println!("{}", sqrtcalc::format_result(value));
        }
        Commands::Percent { expression } => {
            println!("{}", sqrtcalc::convert_last_number_to_percent(&expression));
        }
        Commands::Batch { filename } => {
            let file_contents = fs::read_to_string(&filename)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;

            let mut failed = false;
            for line in file_contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
                match sqrtcalc::evaluate(line) {
                    Ok(value) => println!("{line} = {}", sqrtcalc::format_result(value)),
                    Err(e) => {
                        failed = true;
                        println!("{line}: {}", Notice::from(&e));
                        eprintln!("{:?}", miette::Report::new(e));
                    }
                }
            }
            if failed {
                std::process::exit(65);
            }
        }
        Commands::Repl => repl()?,
    }
    Ok(())
}

fn repl() -> miette::Result<()> {
    let mut session = Session::new();
    let mut lines = stdin().lock().lines();

    loop {
        write!(stdout(), "{} > ", session.input.as_str()).into_diagnostic()?;
        stdout().flush().into_diagnostic()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line
            .into_diagnostic()
            .wrap_err("reading from stdin failed")?;

        match line.trim() {
            "" => continue,
            ":quit" | ":q" => break,
            ":clear" => session.input.clear(),
            ":percent" => session.input.apply_percent(),
            ":history" => {
                for entry in session.history.recent_first() {
                    println!("  {entry}");
                }
            }
            text => {
                if !session.input.set_text(text) {
                    println!("! characters outside [0-9.+-*/^%()sqrt] are not accepted");
                    continue;
                }
                match session.submit() {
                    Ok(_) => println!("= {}", session.input.as_str()),
                    Err(notice) => println!("! {notice}"),
                }
            }
        }
    }
    Ok(())
}
