//! Binary entry point: arguments, logging, configuration, then the runner

use crate::app::cli::api::{Args, BufferConfig};
use crate::app::runner::{print_report, run, RunSettings};
use crate::core::error_handling::{error_chain, log_error_with_context};
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version::version_banner;
use crate::notifications::api::{get_notification_service, Event, SystemEvent, SystemEventType};
use clap::Parser;
use std::process::ExitCode;

/// Run the application and map the outcome to a process exit code
pub async fn startup() -> ExitCode {
    let args = Args::parse();
    let use_color = args.use_color();

    if let Err(e) = init_logging(
        args.log_level.as_deref(),
        args.log_format.as_deref(),
        args.log_file(),
        use_color,
    ) {
        eprintln!("Error initialising logging: {}", e);
        return ExitCode::FAILURE;
    }
    log::info!("bufferqueue {} starting", version_banner());

    let (config, source) = match BufferConfig::load(args.config_file.as_deref()).await {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("{}", error_chain(&e));
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "Using {} topics and {} consumer groups from {}",
        config.topics.len(),
        config.consumers.len(),
        source
    );

    publish_system(SystemEvent::new(SystemEventType::Startup)).await;

    let settings = RunSettings {
        items: args.items,
        timeout: args.timeout(),
    };
    let result = ShutdownCoordinator::guard(|coordinator| async move {
        run(&config, &settings, &coordinator).await
    })
    .await;

    let exit_code = match result {
        Ok(report) => {
            print_report(&report, use_color);
            if report.drained {
                ExitCode::SUCCESS
            } else {
                log::warn!("Run ended before every consumer group drained its topic");
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            log_error_with_context(&e, "Running buffer queue");
            ExitCode::FAILURE
        }
    };

    publish_system(SystemEvent::new(SystemEventType::Shutdown)).await;
    log::info!("bufferqueue finished");
    exit_code
}

async fn publish_system(event: SystemEvent) {
    let mut notifications = get_notification_service().await;
    if let Err(e) = notifications.publish(Event::System(event)).await {
        log::debug!("System event not delivered to every subscriber: {}", e);
    }
}
