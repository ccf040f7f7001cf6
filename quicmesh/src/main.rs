//! Entry point: parse the CLI, load configuration, stand up the DB pool
//! and executor pool, install the process-wide logic system, and run the
//! server until shutdown (§2, §6 "Exit codes").

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use quicmesh::cli::{config_check, Cli, Commands};
use quicmesh::db::DbPool;
use quicmesh::logic::{self, Logic};
use quicmesh::shard::executor::{self, ExecutorPool};
use quicmesh::{config, healthcheck, logging, server, stats, util};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Configcheck => match config_check(&cli.config) {
            Ok(()) => {
                println!("\"{}\" is valid", cli.config.display());
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("{err}");
                ExitCode::from(1)
            }
        },
        Commands::Run => run(&cli),
    }
}

fn run(cli: &Cli) -> ExitCode {
    let config = match config::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load \"{}\": {err}", cli.config.display());
            return ExitCode::from(1);
        }
    };

    if let Err(err) = logging::init(&config.logging) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::from(1);
    }

    info!(instance = util::instance_id(), "quicmesh starting up");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            error!(%err, "failed to build the main Tokio runtime");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run_async(config)) {
        Ok(()) => {
            info!("quicmesh shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "quicmesh failed to start");
            ExitCode::from(1)
        }
    }
}

async fn run_async(config: Arc<config::Config>) -> Result<(), Box<dyn std::error::Error>> {
    quicmesh::db::migrate(&config.mysql.url()).await?;

    let db = DbPool::connect(
        &config.mysql.url(),
        config.mysql.pool_size,
        config.mysql.tx_pool_size(),
    )
    .await?;
    tokio::spawn(db.clone().run_heartbeat(config.mysql.heartbeat_interval()));

    let n_shards = if config.general.shards == 0 {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
    } else {
        config.general.shards
    };
    let executors = Arc::new(ExecutorPool::start(n_shards, config.general.route_cache_capacity));
    executor::install(executors.clone());
    info!(shards = n_shards, "executor pool started");

    logic::install(Arc::new(Logic::new(db.clone())));

    tokio::spawn(stats::http_server::server(config.general.metrics_port));
    tokio::spawn(healthcheck::server(config.general.healthcheck_port, db.clone()));

    let server = server::Server::new();
    server.run(config).await?;

    // The executor pool is shared (via the process-wide `OnceCell` every
    // shard job posts through) for the entire process lifetime; there's no
    // single owner left to call `ExecutorPool::shutdown` on once the
    // server's accept loops have stopped. Shard threads are daemon threads
    // from the OS's perspective and exit with the process.
    let _ = executors;
    Ok(())
}
