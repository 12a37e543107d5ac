use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use wire_circuit::{Circuit, Node, Signal};

const DEMO_CIRCUIT: &str = "123 -> x
456 -> y
x AND y -> d
x OR y -> e
x LSHIFT 2 -> f
y RSHIFT 2 -> g
NOT x -> h
NOT y -> i
";

#[derive(Parser)]
#[command(name = "circuit", version, about = "Lazy 16-bit wire circuit evaluator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the built-in sample circuit
    Demo,
    /// Print the signal on one wire
    Eval {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "a")]
        wire: String,
    },
    /// Feed one wire's signal into another wire, then re-evaluate
    Override {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "a")]
        source: String,
        #[arg(long, default_value = "b")]
        target: String,
        #[arg(long, default_value = "a")]
        wire: String,
    },
    /// Canonical listing with resolved signals and the circuit hash
    Dump {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Serialize)]
struct DumpRow<'a> {
    wire: &'a str,
    node: &'a Node,
    signal: Signal,
}

#[derive(Serialize)]
struct DumpReport<'a> {
    hash: String,
    wires: Vec<DumpRow<'a>>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Demo => {
            let mut circuit = Circuit::from_instructions(DEMO_CIRCUIT.lines())?;
            for (wire, signal) in circuit.resolve_all()? {
                println!("{}: {}", wire, signal);
            }
        }
        Commands::Eval { input, wire } => {
            let mut circuit = Circuit::from_file(&input)?;
            let signal = circuit
                .resolve(&wire)
                .with_context(|| format!("resolving wire {wire}"))?;
            println!("{}", signal);
        }
        Commands::Override {
            input,
            source,
            target,
            wire,
        } => {
            let mut circuit = Circuit::from_file(&input)?;
            let signal = circuit
                .override_and_resolve(&source, &target, &wire)
                .with_context(|| format!("overriding {target} with {source}, then resolving {wire}"))?;
            println!("{}", signal);
        }
        Commands::Dump { input, json } => {
            let mut circuit = Circuit::from_file(&input)?;
            let signals = circuit.resolve_all()?;
            let mut rows = Vec::with_capacity(signals.len());
            for (wire, signal) in &signals {
                rows.push(DumpRow {
                    wire,
                    node: circuit.get(wire)?,
                    signal: *signal,
                });
            }
            let report = DumpReport {
                hash: circuit.hash(),
                wires: rows,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for row in &report.wires {
                    println!("{} -> {}  = {}", row.node, row.wire, row.signal);
                }
                println!("hash blake3:{}", report.hash);
            }
        }
    }
    Ok(())
}
