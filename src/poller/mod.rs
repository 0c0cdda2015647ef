//! Background refresh of the router snapshot.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use futures::future::join_all;
use pingora_core::{server::ShutdownWatch, services::background::BackgroundService};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{
    config::TRAEFIK_API_ENV,
    core::{DashboardError, DashboardResult, RouterStore},
    icons::IconResolver,
    metrics,
    traefik::{
        normalize_routers, DisplayRouter, HostRuleExtractor, RuleExtractor, TraefikClient,
    },
};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Polls Traefik on a fixed interval and publishes each successful result.
///
/// A failed poll is logged and leaves the previous snapshot in place.
/// Icons are looked up in a separate task after publishing and filled in
/// once found, so a slow icon repository never holds back the router list.
pub struct RouterPoller {
    client: Option<TraefikClient>,
    store: Arc<RouterStore>,
    extractor: Box<dyn RuleExtractor>,
    icons: Option<Arc<IconResolver>>,
    interval: Duration,
    icon_lookup: Mutex<Option<JoinHandle<()>>>,
}

impl RouterPoller {
    pub fn new(client: Option<TraefikClient>, store: Arc<RouterStore>) -> Self {
        Self {
            client,
            store,
            extractor: Box::new(HostRuleExtractor),
            icons: None,
            interval: DEFAULT_INTERVAL,
            icon_lookup: Mutex::new(None),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_icons(mut self, icons: Arc<IconResolver>) -> Self {
        self.icons = Some(icons);
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn RuleExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Fetches, normalizes and publishes. Returns the published router count.
    pub async fn refresh(&self) -> DashboardResult<usize> {
        let client = self.client.as_ref().ok_or_else(|| {
            DashboardError::ConfigurationMissing(format!(
                "{TRAEFIK_API_ENV} environment variable not set"
            ))
        })?;

        let raw = client.fetch_routers().await?;
        let mut routers = normalize_routers(&raw, self.extractor.as_ref());

        if let Some(icons) = &self.icons {
            // keep last poll's icons until the lookup below catches up
            let previous = self.store.routers();
            let known: HashMap<&str, &str> = previous
                .iter()
                .filter_map(|r| Some((r.name.as_str(), r.icon.as_deref()?)))
                .collect();
            for router in routers.iter_mut() {
                router.icon = known.get(router.name.as_str()).map(|icon| icon.to_string());
            }
        }

        let count = routers.len();
        self.store.replace(routers);

        if let Some(icons) = &self.icons {
            self.spawn_icon_lookup(icons.clone(), self.store.routers());
        }
        Ok(count)
    }

    fn spawn_icon_lookup(&self, icons: Arc<IconResolver>, routers: Arc<[DisplayRouter]>) {
        let mut lookup = self
            .icon_lookup
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if lookup.as_ref().is_some_and(|task| !task.is_finished()) {
            log::debug!("Icon lookup still running, skipping this round");
            return;
        }

        let store = self.store.clone();
        *lookup = Some(tokio::spawn(async move {
            let found = resolve_icons(&icons, &routers).await;
            let changed = store.apply_icons(&found);
            if changed > 0 {
                log::debug!("Updated icons of {changed} routers");
            }
        }));
    }

    /// Waits for the icon lookup started by the last poll, if any.
    pub async fn wait_for_icons(&self) {
        let task = self
            .icon_lookup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::warn!("Icon lookup task failed: {e}");
            }
        }
    }

    fn stop_icon_lookup(&self) {
        let task = self
            .icon_lookup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }

    /// One poll cycle with errors absorbed into the log.
    pub async fn poll_once(&self) -> bool {
        let previous = self.store.len();
        match self.refresh().await {
            Ok(count) => {
                metrics::record_poll_success(count);
                if count != previous {
                    log::info!("Discovered {count} routers (was {previous})");
                } else {
                    log::debug!("Refreshed {count} routers");
                }
                true
            }
            Err(e) => {
                metrics::record_poll_failure();
                log::error!("Error getting routers: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl BackgroundService for RouterPoller {
    async fn start(&self, mut shutdown: ShutdownWatch) {
        let mut ticker = interval(self.interval);
        // a slow fetch pushes the next one back instead of bursting
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!("Polling Traefik routers every {:?}", self.interval);
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        log::info!("Shutdown signal received, stopping router poller");
                        self.stop_icon_lookup();
                        return;
                    }
                },
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }
}

// Router name -> icon path. Routers are looked up concurrently.
async fn resolve_icons(
    icons: &IconResolver,
    routers: &[DisplayRouter],
) -> HashMap<String, String> {
    let lookups = routers.iter().map(|router| async move {
        let icon = icons.icon_path(router).await?;
        Some((router.name.clone(), icon))
    });
    join_all(lookups).await.into_iter().flatten().collect()
}
