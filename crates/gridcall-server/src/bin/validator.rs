//! # gridcall Validator
//!
//! One-shot binary the VCH invokes for scripted validation. The process
//! exit code is the contract: 0 accepted, 1 rejected, 2 internal error,
//! 3 transient error, 4 predicate fault. Argument-parse failures exit
//! with clap's status 2, which coincides with the internal-error code.

use clap::Parser;
use tracing::error;

use gridcall_server::store::TaskStore;
use gridcall_server::validator::{self, predicate::PredicateRuntime, ExitCode, ValidatorArgs};
use gridcall_shared::config::{project_dir_from_env, DatabaseConfig};
use gridcall_shared::logging;

#[derive(Parser, Debug)]
#[command(
    name = "gridcall-validator",
    about = "VCH validator: initial or comparative validation of result files"
)]
#[command(group = clap::ArgGroup::new("mode").required(true).args(["init", "compare"]))]
struct Cli {
    /// Initial validation: a result id and its output file.
    #[arg(long, num_args = 2, value_names = ["RESULT_ID", "FILE"])]
    init: Option<Vec<String>>,

    /// Comparative validation: two result ids with their output files.
    #[arg(long, num_args = 4, value_names = ["RESULT_ID_1", "FILE_1", "RESULT_ID_2", "FILE_2"])]
    compare: Option<Vec<String>>,
}

fn to_validator_args(cli: &Cli) -> Result<ValidatorArgs, String> {
    let parse_id = |raw: &str| {
        raw.parse::<i64>()
            .map_err(|_| format!("invalid result id '{raw}'"))
    };

    if let Some(values) = &cli.init {
        Ok(ValidatorArgs::Init {
            result_id: parse_id(&values[0])?,
            file: values[1].clone().into(),
        })
    } else if let Some(values) = &cli.compare {
        Ok(ValidatorArgs::Compare {
            result_id_1: parse_id(&values[0])?,
            file_1: values[1].clone().into(),
            result_id_2: parse_id(&values[2])?,
            file_2: values[3].clone().into(),
        })
    } else {
        // clap's arg group guarantees one of the two is present.
        Err("one of --init or --compare is required".to_string())
    }
}

async fn run(cli: Cli) -> ExitCode {
    let args = match to_validator_args(&cli) {
        Ok(args) => args,
        Err(e) => {
            error!(error = %e, "Invalid validator arguments");
            return ExitCode::OtherError;
        }
    };

    let db_config = match DatabaseConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Validator startup failed");
            return ExitCode::OtherError;
        }
    };
    let project_dir = match project_dir_from_env() {
        Ok(dir) => dir,
        Err(e) => {
            error!(error = %e, "Validator startup failed");
            return ExitCode::OtherError;
        }
    };

    let store = match TaskStore::connect(&db_config, 1).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Validator could not reach the store");
            return ExitCode::OtherError;
        }
    };
    let runtime = PredicateRuntime::new(&project_dir);

    match validator::run(&store, &runtime, args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Validator internal error");
            ExitCode::OtherError
        }
    }
}

#[tokio::main]
async fn main() {
    logging::init_tracing();
    let cli = Cli::parse();
    let code = run(cli).await;
    std::process::exit(code as i32);
}
