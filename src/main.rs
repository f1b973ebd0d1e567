use std::{panic, process::ExitCode};

use anyhow::{Context, Error};
use clap::Parser;
use log::{error, info};

use partplan::{
    cli::{Cli, Commands},
    io, planner, PARTPLAN_VERSION,
};
use partplan_api::error::{InternalError, PlanError, PlanResultExt};

fn run_partplan(args: &Cli) -> Result<(), PlanError> {
    // Log version ASAP
    info!("partplan version: {PARTPLAN_VERSION}");

    let res = panic::catch_unwind(|| match &args.command {
        Commands::Validate { data, .. } => {
            let data = io::load_provisioning_data(data)?;
            planner::validate(&data)?;
            info!("Desired layout of '{}' is valid", data.hostname);
            Ok(())
        }

        Commands::Plan {
            data,
            devices,
            image_catalog,
            config,
            output,
            format,
            ..
        } => {
            let mut data = io::load_provisioning_data(data)?;
            if let Some(path) = image_catalog {
                data.ks_meta.image_data = io::load_image_catalog(path)
                    .message("Failed to load image catalog")?;
            }
            let devices = io::load_devices(devices)?;
            let config = io::load_planner_config(config.as_deref())
                .message("Failed to load planner configuration")?;

            let plan = planner::plan(&data, &devices, &config)
                .message(format!("Failed to plan node '{}'", data.hostname))?;
            io::write_output(&io::render(&plan, *format)?, output.as_deref())
        }

        Commands::ConfigDrive {
            data,
            config,
            output,
            format,
            ..
        } => {
            let data = io::load_provisioning_data(data)?;
            let config = io::load_planner_config(config.as_deref())
                .message("Failed to load planner configuration")?;

            let scheme = planner::configdrive::build_configdrive_scheme(&data, &config)
                .message("Failed to build config-drive scheme")?;
            io::write_output(&io::render(&scheme, *format)?, output.as_deref())
        }
    });

    let res = match res {
        Err(e) => Err(PlanError::new(InternalError::Panic(format!("{e:?}")))),
        Ok(r) => r,
    };

    // return error if requested
    if let (Err(e), Some(error_path)) = (&res, args.command.error_path()) {
        io::write_error(error_path, e);
    }

    res.message(format!("Failed to execute '{}' command", args.command))
}

fn setup_logging(args: &Cli) -> Result<(), Error> {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(args.verbosity)
        .try_init()
        .context("Logger already registered")
}

fn setup_tracing(args: &Cli) -> Result<(), Error> {
    use tracing_subscriber::{filter, layer::SubscriberExt, Layer};

    if args.trace_json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter::LevelFilter::INFO);

        tracing::subscriber::set_global_default(
            tracing_subscriber::Registry::default().with(json_layer),
        )
        .context("Failed to set global default subscriber")?;
    }

    Ok(())
}

fn main() -> ExitCode {
    // Parse args
    let args = Cli::parse();

    // Initialize the logger
    if let Err(e) = setup_logging(&args) {
        eprintln!("Failed to initialize logging: {e:?}");
        return ExitCode::from(1);
    }

    if let Err(e) = setup_tracing(&args) {
        error!("Failed to initialize tracing: {e:?}");
        return ExitCode::from(1);
    }

    if let Err(e) = run_partplan(&args) {
        error!("partplan failed: {e:?}");
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}
