//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod config;

use std::time::Instant;

use clap::{App, Arg};
use config::{Config, LoggingFileRotation, LoggingFmtStyle};
use holo_olsr::config::{InstanceCfg, LqAlgorithm};
use holo_olsr::instance::Instance;
use holo_olsr::lq::{EtxEwma, EtxFf, HopCount, LinkQuality};
use holo_olsr::rib::RibChange;
use holo_olsr::southbound::RouteSink;
use holo_olsr::tasks;
use tokio::signal::unix::{SignalKind, signal};
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::prelude::*;

// Route sink that only logs the routing table changes.
#[derive(Debug)]
struct RouteLogger;

fn init_tracing(config: &config::Logging) {
    // Enable logging to journald.
    let journald = config.journald.enabled.then(|| {
        tracing_journald::layer().expect("couldn't connect to journald")
    });

    // Enable logging to a file.
    let file = config.file.enabled.then(|| {
        let file_appender = match config.file.rotation {
            LoggingFileRotation::Never => {
                rolling::never(&config.file.dir, &config.file.name)
            }
            LoggingFileRotation::Hourly => {
                rolling::hourly(&config.file.dir, &config.file.name)
            }
            LoggingFileRotation::Daily => {
                rolling::daily(&config.file.dir, &config.file.name)
            }
        };

        let log_level_filter = LevelFilter::from_level(tracing::Level::TRACE);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(false)
            .with_thread_ids(config.file.fmt.show_thread_id)
            .with_file(config.file.fmt.show_source)
            .with_line_number(config.file.fmt.show_source)
            .with_ansi(config.file.fmt.colors);
        let layer = match config.file.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(log_level_filter)
    });

    // Enable logging to stdout.
    let stdout = config.stdout.enabled.then(|| {
        let log_level_filter = LevelFilter::from_level(tracing::Level::TRACE);
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(config.stdout.fmt.show_thread_id)
            .with_file(config.stdout.fmt.show_source)
            .with_line_number(config.stdout.fmt.show_source)
            .with_ansi(config.stdout.fmt.colors);
        let layer = match config.stdout.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(log_level_filter)
    });

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("holo=debug".parse().unwrap())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(journald)
        .with(file)
        .with(stdout)
        .init();
}

// Completes when SIGINT or SIGTERM is received.
async fn signal_listener() {
    let mut sigint = signal(SignalKind::interrupt()).unwrap();
    let mut sigterm = signal(SignalKind::terminate()).unwrap();

    tokio::select! {
        _ = sigint.recv() => {
            info!("received SIGINT");
        },
        _ = sigterm.recv() => {
            info!("received SIGTERM");
        }
    }
}

async fn run<L>(config: InstanceCfg, lq_model: L)
where
    L: LinkQuality,
{
    let mut instance = match Instance::new(config, lq_model, Instant::now()) {
        Ok(instance) => instance,
        Err(error) => {
            error!(%error, "invalid configuration");
            return;
        }
    };
    instance.set_route_sink(RouteLogger);

    info!(lq = L::NAME, "starting OLSR instance");
    if let Err(error) = tasks::run(instance, signal_listener()).await {
        error.log();
    }
}

fn build_version() -> String {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    match rustc_tools_util::get_version_info!().commit_hash {
        Some(hash) => format!("{VERSION} ({hash})"),
        None => VERSION.to_owned(),
    }
}

// ===== impl RouteLogger =====

impl RouteSink for RouteLogger {
    fn apply(&mut self, change: &RibChange) {
        match change {
            RibChange::Add(route) => {
                info!(
                    prefix = %route.prefix,
                    nexthop = %route.nexthop,
                    interface = %route.ifname,
                    cost = %route.cost,
                    "route added"
                );
            }
            RibChange::Change { new, .. } => {
                info!(
                    prefix = %new.prefix,
                    nexthop = %new.nexthop,
                    interface = %new.ifname,
                    cost = %new.cost,
                    "route changed"
                );
            }
            RibChange::Delete(route) => {
                info!(prefix = %route.prefix, "route deleted");
            }
        }
    }
}

// ===== main =====

fn main() {
    // Parse command-line parameters.
    let matches = App::new("Holo OLSR daemon")
        .version(build_version().as_str())
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .get_matches();

    // Read configuration file.
    let config_file = matches.value_of("config");
    let config = Config::load(config_file);

    // Initialize tracing.
    init_tracing(&config.logging);

    // We're ready to go!
    info!("starting up");

    // Main loop.
    let instance_cfg = config.instance;
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(async move {
            match instance_cfg.lq_algorithm {
                LqAlgorithm::HopCount => run(instance_cfg, HopCount).await,
                LqAlgorithm::EtxFf => {
                    let lq_model = EtxFf::new(instance_cfg.lq_window);
                    run(instance_cfg, lq_model).await
                }
                LqAlgorithm::EtxEwma => {
                    let lq_model = EtxEwma::new(instance_cfg.lq_ewma_alpha);
                    run(instance_cfg, lq_model).await
                }
            }
        });

    info!("exiting");
}

// ===== unit tests =====
