//! Keep-alive self-ping.
//!
//! Free-tier hosts idle the process out without inbound traffic; a
//! periodic GET against our own liveness URL keeps it warm. Failures
//! are logged and ignored.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

const PING_INTERVAL: Duration = Duration::from_secs(300);
const PING_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(url: String, mut shutdown: watch::Receiver<bool>) {
    let client = match reqwest::Client::builder().timeout(PING_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "keep-alive client unavailable");
            return;
        }
    };

    loop {
        match client.get(&url).send().await {
            Ok(response) => debug!(status = %response.status(), "keep-alive ping"),
            Err(e) => warn!(error = %e, "keep-alive ping failed"),
        }

        tokio::select! {
            _ = tokio::time::sleep(PING_INTERVAL) => {}
            _ = shutdown.changed() => return,
        }
    }
}
