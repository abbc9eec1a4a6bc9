//! Change feed server
//!
//! Follows the live recent-changes stream and serves it to browsers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use changefeed::logging::{self, Profile};
use changefeed::{
    server, ChangeHub, FeedConfig, FeedFilter, MediaWikiFetcher, RecentChangeSource, Result,
};

#[derive(Debug, Parser)]
#[command(name = "changefeed")]
#[command(about = "Live feed of recent wiki changes with inline diffs", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "CHANGEFEED_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Raw recent-changes event stream
    #[arg(long, env = "CHANGEFEED_STREAM_URL", default_value = changefeed::source::DEFAULT_STREAM_URL)]
    stream_url: String,

    /// Revision comparison API
    #[arg(long, env = "CHANGEFEED_COMPARE_API", default_value = changefeed::enrich::DEFAULT_COMPARE_API)]
    compare_api: String,

    /// Site identifier to keep
    #[arg(long, env = "CHANGEFEED_SITE", default_value = "enwiki")]
    site: String,

    /// Namespace to keep
    #[arg(long, env = "CHANGEFEED_NAMESPACE", default_value_t = 0)]
    namespace: i64,

    /// Skip titles containing this text
    #[arg(long, env = "CHANGEFEED_EXCLUDE_TITLE", default_value = "Page log")]
    exclude_title: String,

    /// Records kept for new viewers
    #[arg(long, env = "CHANGEFEED_HISTORY", default_value_t = changefeed::DEFAULT_HISTORY_CAPACITY)]
    history: usize,

    /// Queued batches per viewer before it is dropped
    #[arg(long, env = "CHANGEFEED_SUBSCRIBER_BUFFER", default_value_t = 256)]
    subscriber_buffer: usize,

    /// Diff lookups in flight at once
    #[arg(long, env = "CHANGEFEED_MAX_IN_FLIGHT", default_value_t = 16)]
    max_in_flight: usize,

    /// Seconds to wait before reconnecting to the stream
    #[arg(long, env = "CHANGEFEED_RECONNECT_SECS", default_value_t = 3)]
    reconnect_secs: u64,

    /// Seconds of stream silence before reconnecting
    #[arg(long, env = "CHANGEFEED_IDLE_TIMEOUT_SECS", default_value_t = 60)]
    idle_timeout_secs: u64,

    /// User-Agent for outbound requests
    #[arg(long, env = "CHANGEFEED_USER_AGENT", default_value = changefeed::config::DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Emit JSON logs
    #[arg(long, env = "CHANGEFEED_JSON_LOGS")]
    json_logs: bool,
}

impl Cli {
    fn into_config(self) -> FeedConfig {
        FeedConfig {
            bind_addr: self.bind,
            stream_url: self.stream_url,
            compare_api_url: self.compare_api,
            filter: FeedFilter {
                site: self.site,
                namespace: self.namespace,
                excluded_title: self.exclude_title,
            },
            history_capacity: self.history,
            subscriber_buffer: self.subscriber_buffer,
            max_in_flight_enrichments: self.max_in_flight,
            reconnect_delay: Duration::from_secs(self.reconnect_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            user_agent: self.user_agent,
        }
    }
}

async fn serve(config: FeedConfig) -> Result<()> {
    config.validate()?;

    let client = config.http_client()?;
    let fetcher = MediaWikiFetcher::with_client(client.clone(), config.compare_api_url.as_str());
    let hub = Arc::new(ChangeHub::new(config.hub_config(), Arc::new(fetcher)));

    let source = RecentChangeSource::new(client, config.stream_url.as_str(), config.reconnect_delay)
        .with_idle_timeout(config.idle_timeout);
    let attached = Arc::new(hub.attach(source.into_stream()));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "serving change feed");

    // End every live feed before the server drains connections.
    let shutdown = {
        let hub = Arc::clone(&hub);
        let attached = Arc::clone(&attached);
        async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            attached.detach();
            let viewers = hub.close_subscribers();
            info!(viewers, "viewers disconnected");
        }
    };

    axum::serve(listener, server::router(hub))
        .with_graceful_shutdown(shutdown)
        .await?;

    attached.join().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(if cli.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    if let Err(e) = serve(cli.into_config()).await {
        error!(error = %e, "change feed failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
