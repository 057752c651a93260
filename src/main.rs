//! Warikan Engine CLI
//!
//! Replays a ledger operation log and prints the settlement of every group.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > transfers.csv
//! cargo run -- --strategy sync operations.csv > transfers.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 operations.csv
//! cargo run -- --format json operations.csv > settlements.json
//! RUST_LOG=debug cargo run -- --log-format json operations.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use std::process;
use tracing::error;
use warikan_engine::cli;
use warikan_engine::logging;
use warikan_engine::strategy;

fn main() {
    let args = cli::parse_args();
    logging::init(args.log_format);

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config, args.format)
    };

    // Settlements go to stdout, logs to stderr
    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        error!(error = %e, "replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
