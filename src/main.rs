// src/main.rs

// lazy_chain demo driver.
// Exercises the trampoline on chain shapes that would overflow a host call
// stack if evaluated recursively.

use clap::{Parser as ClapParser, Subcommand};
use std::time::Instant;

use lazy_chain::{memoize, Lazy, Memo};

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Force a deep map chain built over a single eager cell.
    Chain {
        /// Number of chained map steps.
        #[arg(default_value_t = 1_000_000)]
        depth: u64,
    },
    /// Force a deferred recursive sum of 1..=n.
    Sum {
        #[arg(default_value_t = 500_000)]
        n: u64,
    },
    /// Resolve Fibonacci through the memo-table builder.
    Fib {
        #[arg(default_value_t = 30)]
        n: u64,
    },
}

/// Sum of 1..=n as a deferred recursion: each level is built inside the
/// evaluator when the previous one is spliced in, so neither construction
/// nor forcing grows the host stack.
fn deferred_sum(n: u64) -> Lazy<u64> {
    if n == 0 {
        Lazy::now(0)
    } else {
        Lazy::defer(move || deferred_sum(n - 1)).map(move |acc| acc + n)
    }
}

fn main() {
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Command::Chain { depth } => {
            let mut cell = Lazy::now(0u64);
            for _ in 0..depth {
                cell = cell.map(|n| n + 1);
            }
            println!(
                "Result: {} ({} map steps, {}ms)",
                cell.force(),
                depth,
                start.elapsed().as_millis()
            );
        }
        Command::Sum { n } => {
            println!(
                "Result: {} (deferred sum to {}, {}ms)",
                deferred_sum(n).force(),
                n,
                start.elapsed().as_millis()
            );
        }
        Command::Fib { n } => {
            let fib = memoize(|g: Memo<u64, u64>, k| match k {
                0 => Lazy::now(Some(0)),
                1 => Lazy::now(Some(1)),
                _ => g.call(k - 1).flat_map(move |a| {
                    g.call(k - 2).map(move |b| match (a, b) {
                        (Some(a), Some(b)) => Some(a + b),
                        _ => None,
                    })
                }),
            });
            match fib.call(n).force() {
                Some(value) => println!(
                    "Result: {} (fib({}), {}ms)",
                    value,
                    n,
                    start.elapsed().as_millis()
                ),
                None => println!("Result: fib({}) did not resolve", n),
            }
        }
    }
}
