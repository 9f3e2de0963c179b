use anyhow::Context as _;
use cfglab::{
    cyk::ParseForest,
    slr::{ParseOutcome, SlrParser},
    source::{read_grammar, read_pda},
};
use clap::{Parser, Subcommand, ValueEnum};
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a grammar.
    Grammar {
        /// The path of grammar definition file.
        input: PathBuf,

        /// Remove useless productions and unreachable symbols first.
        #[arg(long)]
        simplify: bool,
    },

    /// Print FIRST/FOLLOW sets and the LL(1) table as JSON.
    Ll1 {
        /// The path of grammar definition file.
        input: PathBuf,
    },

    /// Build the SLR(1) parser and run it over a sequence of terminals.
    Slr {
        /// The path of grammar definition file.
        input: PathBuf,

        /// Dump the LR(0) item sets.
        #[arg(long)]
        states: bool,

        /// Dump the ACTION/GOTO table.
        #[arg(long)]
        table: bool,

        /// Terminal names to parse.
        tokens: Vec<String>,
    },

    /// Run CYK over a string, one terminal per character.
    Cyk {
        /// The path of grammar definition file.
        input: PathBuf,

        /// The string to analyze.
        text: String,

        /// Convert the grammar into binary form before parsing.
        #[arg(long)]
        binarize: bool,
    },

    /// Convert a pushdown automaton into a grammar.
    Pda {
        /// The path of PDA definition file.
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    run(args.command)
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Grammar { input, simplify } => {
            let mut grammar = load_grammar(&input)?;
            if simplify {
                grammar.remove_useless_productions();
            }
            println!("{}", grammar);
        }

        Command::Ll1 { input } => {
            let grammar = load_grammar(&input)?;
            let report = grammar.ll1_report()?;
            for c in &report.conflicts {
                println!(
                    "[warning] LL(1) conflict at ({}, {}): `{}' vs `{}'",
                    c.variable,
                    c.lookahead,
                    grammar.production(c.kept),
                    grammar.production(c.rejected)
                );
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Slr {
            input,
            states,
            table,
            tokens,
        } => {
            let mut grammar = load_grammar(&input)?;

            let s = Instant::now();
            let parser = SlrParser::build(&mut grammar)?;
            tracing::info!("build SLR tables: {:?} elapsed", s.elapsed());

            for c in parser.conflicts() {
                println!(
                    "[warning] {:?} conflict in state {:?} on {}",
                    c.kind(),
                    c.state,
                    c.lookahead
                );
            }
            if states {
                println!("{}", parser.display_states());
            }
            if table {
                println!("{}", parser.display_table());
            }

            match parser.parse(&tokens) {
                ParseOutcome::Accepted { reductions } => {
                    println!("accepted");
                    for index in reductions {
                        println!("  {}", parser.productions()[index]);
                    }
                }
                ParseOutcome::Rejected(rejection) => {
                    println!("rejected: {}", rejection);
                }
            }
        }

        Command::Cyk {
            input,
            text,
            binarize,
        } => {
            let mut grammar = load_grammar(&input)?;
            if binarize {
                grammar = grammar.to_binary_form()?;
            }

            let forest = ParseForest::from_chars(&grammar, &text)?;
            println!("{}", forest.display_table());
            println!("{}", serde_json::to_string_pretty(&forest.analyze())?);
        }

        Command::Pda { input, format } => {
            let pda = read_pda(&input)
                .with_context(|| format!("errored during loading {}", input.display()))?;
            let grammar = pda.to_cfg();
            match format {
                Format::Text => println!("{}", grammar),
                Format::Json => {
                    println!("{}", serde_json::to_string_pretty(&grammar.to_source())?)
                }
            }
        }
    }

    Ok(())
}

fn load_grammar(input: &Path) -> anyhow::Result<cfglab::Grammar> {
    read_grammar(input).with_context(|| format!("errored during loading {}", input.display()))
}
