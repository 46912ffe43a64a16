use std::io::{self, Write};

use clap::Parser;
use dropmatch::board::Pos;
use dropmatch::engine::{BoardConfig, BoardEvent, Engine, SwapOutcome};
use dropmatch::tui;

#[derive(Parser, Debug)]
#[command(name = "dropmatch", about = "Match-3 drop puzzle (CLI/TUI)", version)]
struct Args {
    /// Launch TUI mode
    #[arg(long)]
    tui: bool,
    /// Board rows
    #[arg(long, default_value_t = 5)]
    rows: usize,
    /// Board columns
    #[arg(long, default_value_t = 6)]
    cols: usize,
    /// Number of drop kinds (3-8)
    #[arg(long, default_value_t = 6)]
    palette: u8,
    /// Minimum run length that counts as a match
    #[arg(long, default_value_t = 3)]
    min_match: usize,
    /// Seed (0 = random)
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl Args {
    fn config(&self) -> BoardConfig {
        BoardConfig {
            rows: self.rows,
            cols: self.cols,
            palette: self.palette,
            min_match: self.min_match,
            seed: self.seed,
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  s r1 c1 r2 c2 - swap the drop at row r1, col c1 with the one at r2, c2 (1-based)");
    println!("  b             - print the board");
    println!("  q             - quit");
    println!("  h/help        - show this help");
}

fn main() {
    let args = Args::parse();
    if args.tui {
        if let Err(e) = tui::run_tui(args.config()) {
            eprintln!("TUI error: {}", e);
        }
        return;
    }
    let mut engine = match Engine::new(args.config()) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    println!(
        "dropmatch {}x{} with {} kinds{}",
        args.rows,
        args.cols,
        args.palette,
        if args.seed != 0 { format!(" (seed {})", args.seed) } else { String::new() }
    );
    println!("Coordinates are 1-based, row first. Type 'h' for help.");
    print_help();

    let mut input = String::new();
    loop {
        println!("\n{}", engine.grid());
        print!("> ");
        let _ = io::stdout().flush();
        input.clear();
        if io::stdin().read_line(&mut input).is_err() {
            break;
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0].to_lowercase().as_str() {
            "q" | "quit" | "exit" => break,
            "h" | "help" => {
                print_help();
            }
            "b" | "board" => { /* printed at loop top */ }
            "s" | "swap" => {
                let Some((a, b)) = parse_swap(&parts[1..]) else {
                    println!("Usage: s r1 c1 r2 c2 (1-based)");
                    continue;
                };
                match engine.request_swap(a, b) {
                    Ok(SwapOutcome::Rejected) => println!("No match - swap snapped back."),
                    Ok(SwapOutcome::Accepted { .. }) => drain_cascade(&mut engine),
                    Err(e) => println!("{}", e),
                }
            }
            other => {
                println!("Unknown command '{}'. Type 'h' for help.", other);
            }
        }
    }
}

fn parse_swap(args: &[&str]) -> Option<(Pos, Pos)> {
    if args.len() < 4 {
        return None;
    }
    let mut vals = [0usize; 4];
    for (v, s) in vals.iter_mut().zip(args) {
        let n = s.parse::<usize>().ok()?;
        if n == 0 {
            return None;
        }
        *v = n - 1;
    }
    Some((Pos::new(vals[0], vals[1]), Pos::new(vals[2], vals[3])))
}

fn drain_cascade(engine: &mut Engine) {
    loop {
        let batch = engine.step();
        if batch.is_empty() {
            break;
        }
        let mut done = false;
        for ev in batch {
            match ev {
                BoardEvent::GroupMatched { kind, cells, combo } => {
                    println!("Combo {}: cleared {} {} drops", combo, cells.len(), kind.glyph());
                }
                BoardEvent::CascadeSettled { combos } => {
                    println!("Cascade settled: {} combo(s).", combos);
                    done = true;
                }
                BoardEvent::TokenMoved { .. } | BoardEvent::TokenSpawned { .. } => {}
            }
        }
        if done {
            break;
        }
    }
}
