use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use tracing::{info, warn};

use crate::{
    config::{AppConfig, ProviderSettings},
    server::{
        services::{
            catalog_services::CatalogAssembler,
            notification_services::{
                DynNotificationSink, FanoutNotificationSink, TracingNotificationSink,
                WebhookNotificationSink,
            },
            route_services::{RequestRouter, RouterSettings},
            schedule_services::EventScheduler,
            session_services::SessionStore,
            token_services::TokenCache,
        },
        utils::fetch_utils::{DynRemoteFetcher, HttpFetcher},
    },
};

/// what the feed falls back to when the configured offset doesn't parse (US eastern, summer)
const DEFAULT_FEED_OFFSET_SECS: i32 = -4 * 3600;

/// everything a request handler needs, cheap to clone into the axum extension
#[derive(Clone)]
pub struct RelayServices {
    pub router: Arc<RequestRouter>,
    pub tokens: Arc<TokenCache>,
    pub sessions: Arc<SessionStore>,
    pub fetcher: DynRemoteFetcher,
}

impl RelayServices {
    pub fn new(config: Arc<AppConfig>) -> Self {
        info!("starting relay services...");

        let fetcher = Arc::new(HttpFetcher::new()) as DynRemoteFetcher;

        let mut sinks = vec![Arc::new(TracingNotificationSink) as DynNotificationSink];
        if let Some(url) = &config.notify_url {
            info!("forwarding notifications to {}", url);
            sinks.push(Arc::new(WebhookNotificationSink::new(
                reqwest::Client::new(),
                url.clone(),
            )));
        }
        let notifier = Arc::new(FanoutNotificationSink::new(sinks)) as DynNotificationSink;

        Self::with_collaborators(config, fetcher, notifier)
    }

    /// wires the services around the given fetcher and sink, tests come in through here
    pub fn with_collaborators(
        config: Arc<AppConfig>,
        fetcher: DynRemoteFetcher,
        notifier: DynNotificationSink,
    ) -> Self {
        let playback_base = format!("http://{}:{}", config.host, config.port);

        let tokens = Arc::new(TokenCache::new(
            fetcher.clone(),
            config.auth_url.clone(),
            config.mma_auth_url.clone(),
            config.provider_settings(),
        ));

        let catalog = Arc::new(CatalogAssembler::new(
            fetcher.clone(),
            config.channels_url.clone(),
            config.feed_url.clone(),
            config.logo_url_template.clone(),
            playback_base.clone(),
        ));

        let scheduler = Arc::new(EventScheduler::new(
            fetcher.clone(),
            config.feed_url.clone(),
            config.logo_url_template.clone(),
            playback_base,
            Self::feed_offset(&config.feed_utc_offset),
        ));

        let sessions = Arc::new(SessionStore::new());

        let router = Arc::new(RequestRouter::new(
            tokens.clone(),
            catalog,
            scheduler,
            sessions.clone(),
            notifier,
            RouterSettings {
                stream_url_template: config.stream_url_template.clone(),
                epg_url: config.epg_url.clone(),
                sports_epg_url: config.sports_epg_url.clone(),
                time_format: config.time_format.clone(),
                redirect_channels: config.redirect_channels,
                signature_suffix: config.signature_suffix.clone(),
            },
        ));

        info!("relay services ok");

        Self {
            router,
            tokens,
            sessions,
            fetcher,
        }
    }

    /// new account or server, the old signature and every remembered stream go with it
    pub async fn reconfigure(&self, settings: ProviderSettings) {
        let generation = self.tokens.reconfigure(settings).await;
        self.sessions.reset(generation);
        info!(
            "relay reconfigured, {} sessions kept under generation {}",
            self.sessions.len(),
            generation
        );
    }

    fn feed_offset(raw: &str) -> FixedOffset {
        raw.parse::<FixedOffset>().unwrap_or_else(|e| {
            warn!("invalid feed offset {:?} ({}), using -04:00", raw, e);
            FixedOffset::east_opt(DEFAULT_FEED_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
        })
    }
}
