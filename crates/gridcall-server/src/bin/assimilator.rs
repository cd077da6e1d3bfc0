//! # gridcall Assimilator
//!
//! One-shot binary the VCH invokes once a work unit has a canonical
//! result, or has failed terminally. Exit 0 means the outcome is durably
//! recorded; any non-zero exit lets the VCH reschedule the invocation.

use clap::Parser;
use tracing::error;

use gridcall_server::assimilator::{self, AssimilateArgs};
use gridcall_server::store::TaskStore;
use gridcall_shared::config::DatabaseConfig;
use gridcall_shared::logging;

#[derive(Parser, Debug)]
#[command(
    name = "gridcall-assimilator",
    about = "VCH assimilator: records a work unit's terminal outcome in the task store"
)]
struct Cli {
    /// VCH work-unit error code; selects the failure argument shape.
    #[arg(long, allow_negative_numbers = true)]
    error: Option<i64>,

    /// `<wu_id> <result_file>`, or with --error `<wu_name> <wu_id> <runtime>`.
    operands: Vec<String>,
}

#[tokio::main]
async fn main() {
    logging::init_tracing();
    let cli = Cli::parse();

    let args = match AssimilateArgs::interpret(cli.error, &cli.operands) {
        Ok(args) => args,
        Err(e) => {
            error!(error = %e, "Invalid assimilator arguments");
            std::process::exit(1);
        }
    };

    let db_config = match DatabaseConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Assimilator startup failed");
            std::process::exit(1);
        }
    };
    let store = match TaskStore::connect(&db_config, 1).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Assimilator could not reach the store");
            std::process::exit(1);
        }
    };

    if let Err(e) = assimilator::run(&store, args).await {
        error!(error = %e, "Assimilation failed");
        std::process::exit(1);
    }
}
