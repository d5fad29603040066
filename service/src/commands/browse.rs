use crate::output;
use crate::signal::shutdown_signal;
use acquisition::create_connector;
use anyhow::{Context, Result};
use bridge_core::{NamespaceNode, SourceConnector};
use clap::Args;
use config::ServiceSettings;
use colored::Colorize;
use errors::SourceError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Args)]
pub struct BrowseArgs {
    /// Source address (defaults to the configured default source)
    #[arg(value_name = "URL")]
    pub url: Option<String>,
}

/// Browse the namespace of `source_url`.
///
/// Returns `None` when cancelled; a partial tree is never returned.
pub async fn browse_namespace(
    connector: &dyn SourceConnector,
    source_url: &str,
    cancel: &CancellationToken,
) -> Result<Option<Vec<NamespaceNode>>, SourceError> {
    let browse = async {
        let mut session = connector.connect(source_url).await?;
        let result = session.browse().await;
        if let Err(e) = session.close().await {
            debug!(source = %source_url, error = %e, "Failed to close source session");
        }
        result
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(None),
        result = browse => result.map(Some),
    }
}

pub async fn run(settings: &ServiceSettings, args: BrowseArgs) -> Result<Vec<NamespaceNode>> {
    let url = args.url.unwrap_or_else(|| settings.source.default_url.clone());
    let connector = create_connector(settings.source.kind, settings.source.request_timeout())
        .context("Cannot create the source connector")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let signal = tokio::spawn(async move {
        shutdown_signal().await;
        interrupt.cancel();
    });

    let result = browse_namespace(connector.as_ref(), &url, &cancel).await;
    signal.abort();

    let Some(nodes) = result? else {
        output::warn("Browse cancelled");
        return Ok(Vec::new());
    };

    output::header(&format!("Items of source <{}>", url));
    for node in &nodes {
        for leaf in node.leaves() {
            println!("{}", leaf.item_name.cyan());
            for property in &leaf.properties {
                let value = property.value.as_deref().unwrap_or("");
                match &property.description {
                    Some(description) => println!(
                        "    {} = {} {}",
                        property.name,
                        value,
                        format!("({})", description).dimmed()
                    ),
                    None => println!("    {} = {}", property.name, value),
                }
            }
        }
    }
    Ok(nodes)
}
