//! Serves two channels at once: one evaluates the objective, the other proposes local
//! refinements of the evaluated points.
//!
//! Requires `TQ42_ACCESS_TOKEN` to be set. Point algorithms on the platform at the printed
//! channel IDs.

use std::time::Duration;

use tq42::channel::Channel;
use tq42::client::Client;
use tq42::protocol::{Ask, Parameter, Tell};

const MAX_DURATION: Duration = Duration::from_secs(2 * 60 * 60);
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

fn rosenbrock(point: &[f64]) -> f64 {
    point
        .windows(2)
        .map(|pair| 100.0 * (pair[1] - pair[0].powi(2)).powi(2) + (1.0 - pair[0]).powi(2))
        .sum()
}

async fn objective(ask: Ask) -> Result<Tell, std::io::Error> {
    log::info!("[objective] evaluating {} points", ask.parameters.len());
    let results = ask
        .parameters
        .iter()
        .map(|parameter| rosenbrock(&parameter.values))
        .collect();

    Ok(Tell::for_ask(ask, results))
}

async fn local_optimizer(ask: Ask) -> Result<Tell, std::io::Error> {
    log::info!("[optimizer] refining {} points", ask.parameters.len());
    let candidates: Vec<Parameter> = ask
        .parameters
        .iter()
        .map(|parameter| {
            parameter
                .values
                .iter()
                .map(|value| value + 0.5 * (1.0 - value))
                .collect::<Vec<f64>>()
                .into()
        })
        .collect();
    let results = candidates
        .iter()
        .map(|candidate| rosenbrock(&candidate.values))
        .collect();

    Ok(Tell::for_ask(ask, results).with_candidates(candidates))
}

async fn run() -> tq42::errors::Result<()> {
    let client = Client::from_env()?;

    let objective_channel = Channel::create(&client).await?;
    let optimizer_channel = Channel::create(&client).await?;
    log::info!("[objective] channel: {objective_channel}");
    log::info!("[optimizer] channel: {optimizer_channel}");

    let (objective_end, optimizer_end) = tokio::join!(
        objective_channel.connect(
            objective,
            || log::info!("[objective] finished"),
            Some(MAX_DURATION),
            Some(MESSAGE_TIMEOUT),
        ),
        optimizer_channel.connect(
            local_optimizer,
            || log::info!("[optimizer] finished"),
            Some(MAX_DURATION),
            Some(MESSAGE_TIMEOUT),
        ),
    );

    log::info!("[objective] session ended: {:?}", objective_end?);
    log::info!("[optimizer] session ended: {:?}", optimizer_end?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Setup logger
    env_logger::builder()
        .filter_level(log::LevelFilter::Info) // Suppress everything below `info` for third-party modules.
        .filter_module(env!("CARGO_PKG_NAME"), log::LevelFilter::Trace) // Allow everything from current package
        .init();

    if let Err(err) = run().await {
        log::error!("{err}");
    }
}
