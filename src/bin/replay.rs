// Standalone replay tool for recorded agent sessions
//
// Usage:
//   cargo run --bin replay -- <log_file>... [options]
//
// Options:
//   --all                  Replay every step of every file
//   --steps <s1,s2>        Replay specific steps (comma-separated)
//   --validate <s:m,...>   Check recorded moves against expectations
//   --verbose              Show detailed output for each step
//   --config <path>        Path to Agent.toml (default: Agent.toml)
//
// Several log files are replayed in parallel, one agent per file.

use rayon::prelude::*;
use std::env;
use std::process;

use sight_snake::config::Config;
use sight_snake::replay::{ReplayEngine, ReplayResult};
use sight_snake::types::Direction;

enum Mode {
    All,
    Steps(Vec<u64>),
    Validate(Vec<(u64, Vec<Direction>)>),
}

fn print_usage() {
    eprintln!("Sight Snake Replay Tool");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  replay <log_file>... [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --all                   Replay all steps in the log");
    eprintln!("  --steps <S1,S2,...>     Replay specific steps (comma-separated)");
    eprintln!("  --validate <S:M,...>    Validate recorded moves (format: step:move,...)");
    eprintln!("  --verbose               Show detailed output for each step");
    eprintln!("  --config <path>         Path to Agent.toml (default: Agent.toml)");
    eprintln!("  --help                  Show this help message");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("  replay agent_debug.jsonl --all");
    eprintln!("  replay run1.jsonl run2.jsonl run3.jsonl --all");
    eprintln!("  replay agent_debug.jsonl --steps 5,10,15 --verbose");
    eprintln!("  replay agent_debug.jsonl --validate 5:north,10:east|south");
}

fn parse_steps(s: &str) -> Result<Vec<u64>, String> {
    s.split(',')
        .map(|t| {
            t.trim()
                .parse::<u64>()
                .map_err(|e| format!("Invalid step number '{}': {}", t, e))
        })
        .collect()
}

fn parse_expected_moves(s: &str) -> Result<Vec<(u64, Vec<Direction>)>, String> {
    s.split(',')
        .map(|pair| {
            let parts: Vec<&str> = pair.trim().split(':').collect();
            if parts.len() != 2 {
                return Err(format!("Invalid format '{}'. Expected 'step:move'", pair));
            }

            let step = parts[0]
                .parse::<u64>()
                .map_err(|e| format!("Invalid step number '{}': {}", parts[0], e))?;

            // Support multiple acceptable moves separated by '|'
            let moves: Result<Vec<Direction>, String> = parts[1]
                .split('|')
                .map(|m| ReplayEngine::parse_direction(m.trim()))
                .collect();

            Ok((step, moves?))
        })
        .collect()
}

fn fail(message: String) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn next_value(args: &[String], i: usize, flag: &str) -> String {
    args.get(i + 1)
        .cloned()
        .unwrap_or_else(|| fail(format!("{} requires an argument", flag)))
}

fn run_file(engine: &ReplayEngine, path: &str, mode: &Mode) -> Result<Vec<ReplayResult>, String> {
    let entries = engine.load_log_file(path)?;
    if entries.is_empty() {
        return Err("Log file is empty".to_string());
    }

    match mode {
        Mode::All => engine.replay_all(&entries),
        Mode::Steps(steps) => engine.replay_steps(&entries, steps),
        Mode::Validate(expected) => engine
            .validate_expected_moves(&entries, expected)
            .map(|_| Vec::new()),
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.contains(&"--help".to_string()) {
        print_usage();
        process::exit(if args.contains(&"--help".to_string()) { 0 } else { 1 });
    }

    let mut files = Vec::new();
    let mut config_path = "Agent.toml".to_string();
    let mut verbose = false;
    let mut mode = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--all" => mode = Some(Mode::All),
            "--steps" => {
                let value = next_value(&args, i, "--steps");
                mode = Some(Mode::Steps(parse_steps(&value).unwrap_or_else(|e| fail(e))));
                i += 1;
            }
            "--validate" => {
                let value = next_value(&args, i, "--validate");
                mode = Some(Mode::Validate(
                    parse_expected_moves(&value).unwrap_or_else(|e| fail(e)),
                ));
                i += 1;
            }
            "--config" => {
                config_path = next_value(&args, i, "--config");
                i += 1;
            }
            "--verbose" => verbose = true,
            flag if flag.starts_with("--") => {
                eprintln!("Error: Unknown option '{}'", flag);
                print_usage();
                process::exit(1);
            }
            file => files.push(file.to_string()),
        }
        i += 1;
    }

    let mode = mode.unwrap_or_else(|| {
        eprintln!("Error: Must specify --all, --steps, or --validate");
        print_usage();
        process::exit(1);
    });
    if files.is_empty() {
        fail("No log files given".to_string());
    }

    let config = Config::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from '{}': {}", config_path, e);
        eprintln!("Using default configuration");
        Config::default_hardcoded()
    });
    println!("Loaded configuration from: {}", config_path);

    let engine = ReplayEngine::new(config, verbose);

    let outcomes: Vec<(String, Result<Vec<ReplayResult>, String>)> = files
        .par_iter()
        .map(|path| (path.clone(), run_file(&engine, path, &mode)))
        .collect();

    let mut failed = false;
    for (path, outcome) in outcomes {
        println!("\n── {} ──", path);
        match (outcome, &mode) {
            (Ok(_), Mode::Validate(_)) => println!("✓ All expected moves validated successfully!"),
            (Ok(results), _) => engine.print_report(&results),
            (Err(e), _) => {
                eprintln!("✗ {}", e);
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
