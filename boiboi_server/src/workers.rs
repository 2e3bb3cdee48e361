//! Background jobs: the withdrawal processor, the rating aggregator and the keep-alive pinger.
//!
//! Each job runs in its own task on a fixed interval. The first run happens as soon as the worker starts. All of the
//! workers stop when [`Workers::shutdown`] is called, after finishing the run they are in, if any.
use std::{future::Future, sync::Arc, time::Duration};

use boiboi_engine::{
    events::EventProducers,
    traits::PaymentGateway,
    MarketplaceDatabase,
    RatingApi,
    SqliteDatabase,
    WithdrawalApi,
};
use chrono::{DateTime, Utc};
use log::*;
use reqwest::Client;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{config::WorkerConfig, errors::ServerError, integrations::paystack::PaystackGateway};

const PING_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Workers {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    pub fn start(
        db: SqliteDatabase,
        gateway: PaystackGateway,
        producers: EventProducers,
        config: &WorkerConfig,
    ) -> Result<Self, ServerError> {
        let token = CancellationToken::new();
        let mut handles = Vec::with_capacity(3);

        let withdrawals = Arc::new(WithdrawalApi::new(db.clone(), gateway, producers));
        handles.push(spawn_periodic("Withdrawal", config.withdrawal_interval, token.clone(), move || {
            let api = Arc::clone(&withdrawals);
            async move { run_withdrawals_once(&api, Utc::now()).await }
        }));

        let ratings = Arc::new(RatingApi::new(db));
        handles.push(spawn_periodic("Rating", config.rating_interval, token.clone(), move || {
            let api = Arc::clone(&ratings);
            async move { run_ratings_once(&api, Utc::now()).await }
        }));

        match &config.ping_url {
            Some(url) => {
                let client = Client::builder()
                    .timeout(PING_TIMEOUT)
                    .build()
                    .map_err(|e| ServerError::InitializeError(format!("Could not create the ping client. {e}")))?;
                let url = url.clone();
                handles.push(spawn_periodic("Keep-alive", config.ping_interval, token.clone(), move || {
                    let client = client.clone();
                    let url = url.clone();
                    async move {
                        ping_once(&client, &url).await;
                    }
                }));
            },
            None => info!("🕰️ BB_PING_URL is not set. The keep-alive pinger will not run"),
        }
        Ok(Self { token, handles })
    }

    /// Signals every worker to stop and waits for them to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("🕰️ A worker did not shut down cleanly. {e}");
            }
        }
        info!("🕰️ All workers stopped");
    }
}

fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, token: CancellationToken, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ {name} worker started. Runs every {}s", period.as_secs());
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = timer.tick() => job().await,
            }
        }
        info!("🕰️ {name} worker stopped");
    })
}

/// Pays out every withdrawal request that is due. Failures are logged; the next run picks up whatever is still due.
pub async fn run_withdrawals_once<B, G>(api: &WithdrawalApi<B, G>, now: DateTime<Utc>)
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    debug!("🕰️ Running withdrawal job");
    match api.process_due_withdrawals(now).await {
        Ok(summary) => info!(
            "🕰️ Withdrawal job done. {} processed, {} retried later, {} dead-lettered",
            summary.processed, summary.retried, summary.dead_lettered
        ),
        Err(e) => error!("🕰️ Error running the withdrawal job: {e}"),
    }
}

pub async fn run_ratings_once<B: MarketplaceDatabase>(api: &RatingApi<B>, now: DateTime<Utc>) {
    debug!("🕰️ Running rating job");
    if let Err(e) = api.recompute_all(now).await {
        error!("🕰️ Error running the rating job: {e}");
    }
}

/// Sends one keep-alive request. Returns true if the target answered with a success status.
pub async fn ping_once(client: &Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(res) if res.status().is_success() => {
            trace!("🕰️ Keep-alive ping to {url} OK");
            true
        },
        Ok(res) => {
            warn!("🕰️ Keep-alive ping to {url} answered with {}", res.status());
            false
        },
        Err(e) => {
            warn!("🕰️ Keep-alive ping to {url} failed. {e}");
            false
        },
    }
}
