// Replay module for analyzing recorded sessions and debugging decision-making
//
// This module provides functionality to:
// 1. Parse JSONL session recordings
// 2. Drive a fresh agent through the recorded observations
// 3. Compare recorded vs replayed moves
// 4. Generate summary reports
//
// The agent is stateful, so a recording is always replayed from its start
// event in order; replaying single steps in isolation would see a different
// world model.

use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use crate::bot::Bot;
use crate::config::Config;
use crate::debug_logger::LogEntry;
use crate::mode::Mode;
use crate::types::Direction;

/// Result of replaying a single step
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub step: u64,
    pub original_move: Direction,
    pub replayed_move: Direction,
    pub matches: bool,
    pub mode: Mode,
    pub planner: Option<Mode>,
    pub computation_time_us: u128,
}

/// Statistics for a complete replay session
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub total_steps: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
    pub fallback_moves: usize,
}

/// Replay engine for analyzing recordings
pub struct ReplayEngine {
    config: Config,
    verbose: bool,
}

impl ReplayEngine {
    /// Creates a new replay engine with the given configuration
    pub fn new(config: Config, verbose: bool) -> Self {
        ReplayEngine { config, verbose }
    }

    /// Loads all log entries from a JSONL file
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<LogEntry>, String> {
        let file =
            File::open(log_path.as_ref()).map_err(|e| format!("Failed to open log file: {}", e))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: LogEntry = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to parse JSON on line {}: {}", line_num + 1, e))?;

            entries.push(entry);
        }

        info!("Loaded {} log entries", entries.len());
        Ok(entries)
    }

    /// Replays every step of a recording with a fresh agent
    pub fn replay_all(&self, entries: &[LogEntry]) -> Result<Vec<ReplayResult>, String> {
        let mut bot = Bot::new(self.config.clone());
        let mut started = false;
        let mut results = Vec::new();

        for entry in entries {
            match entry {
                LogEntry::Start { game, .. } => {
                    bot.start(game)
                        .map_err(|e| format!("Failed to start replay: {}", e))?;
                    started = true;
                }
                LogEntry::Step {
                    state, chosen_move, ..
                } => {
                    if !started {
                        return Err(format!("Step {} recorded before any start event", state.step));
                    }

                    let start_time = Instant::now();
                    let decision = match bot.decide(state, start_time) {
                        Ok(decision) => decision,
                        Err(e) => {
                            warn!("Failed to replay step {}: {}", state.step, e);
                            continue;
                        }
                    };

                    let result = ReplayResult {
                        step: state.step,
                        original_move: *chosen_move,
                        replayed_move: decision.direction,
                        matches: *chosen_move == decision.direction,
                        mode: decision.mode,
                        planner: decision.planner,
                        computation_time_us: decision.elapsed_us,
                    };
                    self.report_step(&result);
                    results.push(result);
                }
            }
        }

        Ok(results)
    }

    /// Replays the recording up to the last requested step and keeps only the requested ones
    pub fn replay_steps(
        &self,
        entries: &[LogEntry],
        step_numbers: &[u64],
    ) -> Result<Vec<ReplayResult>, String> {
        for step in step_numbers {
            let recorded = entries
                .iter()
                .any(|e| matches!(e, LogEntry::Step { state, .. } if state.step == *step));
            if !recorded {
                return Err(format!("Step {} not found in log file", step));
            }
        }

        let last = step_numbers.iter().copied().max().unwrap_or(0);
        let prefix: Vec<LogEntry> = entries
            .iter()
            .filter(|e| match e {
                LogEntry::Start { .. } => true,
                LogEntry::Step { state, .. } => state.step <= last,
            })
            .cloned()
            .collect();

        Ok(self
            .replay_all(&prefix)?
            .into_iter()
            .filter(|r| step_numbers.contains(&r.step))
            .collect())
    }

    fn report_step(&self, result: &ReplayResult) {
        if !self.verbose {
            return;
        }
        let planner = result.planner.map_or("fallback", |m| m.as_str());
        if result.matches {
            info!(
                "Step {}: ✓ MATCH - {} (mode: {}, planner: {}, time: {}us)",
                result.step,
                result.replayed_move.as_str(),
                result.mode.as_str(),
                planner,
                result.computation_time_us
            );
        } else {
            warn!(
                "Step {}: ✗ MISMATCH - Original: {}, Replayed: {} (mode: {}, planner: {}, time: {}us)",
                result.step,
                result.original_move.as_str(),
                result.replayed_move.as_str(),
                result.mode.as_str(),
                planner,
                result.computation_time_us
            );
        }
    }

    /// Generates statistics from replay results
    pub fn generate_stats(&self, results: &[ReplayResult]) -> ReplayStats {
        let total_steps = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let mismatches = total_steps - matches;
        let match_rate = if total_steps > 0 {
            (matches as f64 / total_steps as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats {
            total_steps,
            matches,
            mismatches,
            match_rate,
            fallback_moves: results.iter().filter(|r| r.planner.is_none()).count(),
        }
    }

    /// Prints a detailed report of replay results
    pub fn print_report(&self, results: &[ReplayResult]) {
        let stats = self.generate_stats(results);

        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    REPLAY REPORT");
        println!("═══════════════════════════════════════════════════════════");
        println!("Total Steps:    {}", stats.total_steps);
        println!("Matches:        {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:     {}", stats.mismatches);
        println!("Fallback moves: {}", stats.fallback_moves);
        println!("═══════════════════════════════════════════════════════════\n");

        if !results.is_empty() {
            let avg_time: f64 = results
                .iter()
                .map(|r| r.computation_time_us as f64)
                .sum::<f64>()
                / results.len() as f64;
            println!("Average Computation Time:   {:.1}us\n", avg_time);
        }

        let mismatches: Vec<_> = results.iter().filter(|r| !r.matches).collect();
        if !mismatches.is_empty() {
            println!("═══════════════════════════════════════════════════════════");
            println!("                  DETAILED MISMATCHES");
            println!("═══════════════════════════════════════════════════════════");

            for result in mismatches {
                println!(
                    "Step {}: {} → {} (mode: {}, time: {}us)",
                    result.step,
                    result.original_move.as_str(),
                    result.replayed_move.as_str(),
                    result.mode.as_str(),
                    result.computation_time_us
                );
            }
            println!();
        }
    }

    /// Validates that specific expected moves were recorded
    pub fn validate_expected_moves(
        &self,
        entries: &[LogEntry],
        expected_moves: &[(u64, Vec<Direction>)], // (step, acceptable_moves)
    ) -> Result<(), String> {
        for (step, acceptable) in expected_moves {
            let actual_move = entries
                .iter()
                .find_map(|e| match e {
                    LogEntry::Step {
                        state, chosen_move, ..
                    } if state.step == *step => Some(*chosen_move),
                    _ => None,
                })
                .ok_or_else(|| format!("Step {} not found in log", step))?;

            if !acceptable.contains(&actual_move) {
                return Err(format!(
                    "Step {}: Expected one of {:?}, but got {}",
                    step,
                    acceptable.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
                    actual_move.as_str()
                ));
            }
        }

        Ok(())
    }

    /// Accepts direction names as well as key tokens
    pub fn parse_direction(s: &str) -> Result<Direction, String> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "north" => Ok(Direction::North),
            "east" => Ok(Direction::East),
            "south" => Ok(Direction::South),
            "west" => Ok(Direction::West),
            key => Direction::from_key(key).ok_or_else(|| format!("Invalid direction: {}", s)),
        }
    }
}
