use crate::output;
use anyhow::{Context, Result};
use bridge_core::{Quality, Sample};
use chrono::Utc;
use clap::Args;
use config::ServiceSettings;
use pusher::{DataPusher, FilterMode, PushOutcome, PusherConfig};
use tracing::warn;

/// Item name carried by a manually pushed sample.
pub const FORCED_ITEM_NAME: &str = "Forced";

#[derive(Args)]
pub struct PushArgs {
    /// Sink variable id
    #[arg(long, allow_negative_numbers = true)]
    pub variable_id: i32,

    /// Value to push, timestamped now
    #[arg(long, allow_negative_numbers = true)]
    pub value: f64,
}

pub fn forced_sample(variable_id: i32, value: f64) -> Sample {
    Sample {
        item_name: FORCED_ITEM_NAME.to_string(),
        variable_id,
        timestamp: Utc::now(),
        value,
        quality: Quality::Good,
    }
}

pub async fn run(settings: ServiceSettings, args: PushArgs) -> Result<PushOutcome> {
    warn!("**************************************************");
    warn!("Single value push mode, acquisition is DISABLED");
    warn!("**************************************************");

    let pusher = DataPusher::new(PusherConfig::from(&settings.pusher))
        .context("Cannot create the data pusher")?;
    let sample = forced_sample(args.variable_id, args.value);

    let outcome = pusher
        .push(std::slice::from_ref(&sample), FilterMode::KeepAll, None)
        .await
        .context("Push failed")?;

    output::success(&format!(
        "Pushed {} to variable {}",
        sample.value, sample.variable_id
    ));
    Ok(outcome)
}
