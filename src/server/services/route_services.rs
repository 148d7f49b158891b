use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info};

use crate::{
    models::pad_channel,
    server::{
        error::{AppResult, Error},
        services::{
            catalog_services::CatalogAssembler, notification_services::DynNotificationSink,
            schedule_services::EventScheduler, session_services::SessionStore,
            token_services::TokenCache,
        },
        utils::m3u_utils::fill_template,
    },
};

/// what the transport should do with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    StaticRedirect(String),
    GeneratedPlaylist { filename: &'static str, body: String },
    GeneratedGuideProxy(String),
    AuthorizedSegmentProxy(String),
    NotFound,
}

/// the bits of an inbound request routing cares about
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub client_id: String,
    pub path: String,
    /// raw query string, forwarded as is on segment requests
    pub query: Option<String>,
    pub params: HashMap<String, String>,
}

/// the parts of the config the router reads on every request
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub stream_url_template: String,
    pub epg_url: String,
    pub sports_epg_url: String,
    pub time_format: String,
    pub redirect_channels: bool,
    /// appended to the hash in `wmsAuthSign`
    pub signature_suffix: String,
}

pub struct RequestRouter {
    tokens: Arc<TokenCache>,
    catalog: Arc<CatalogAssembler>,
    scheduler: Arc<EventScheduler>,
    sessions: Arc<SessionStore>,
    notifier: DynNotificationSink,
    settings: RouterSettings,
}

impl RequestRouter {
    pub fn new(
        tokens: Arc<TokenCache>,
        catalog: Arc<CatalogAssembler>,
        scheduler: Arc<EventScheduler>,
        sessions: Arc<SessionStore>,
        notifier: DynNotificationSink,
        settings: RouterSettings,
    ) -> Self {
        Self {
            tokens,
            catalog,
            scheduler,
            sessions,
            notifier,
            settings,
        }
    }

    /// tells the notification sink what was asked for, then decides what to serve
    ///
    /// the announcement goes out before any upstream work so a selection that ends up failing
    /// still shows as the thing being served
    pub async fn route(
        &self,
        request: &InboundRequest,
        now: DateTime<FixedOffset>,
    ) -> AppResult<RouteDecision> {
        if let Some(announcement) = Self::announcement(request) {
            self.notifier.notify(&announcement);
        }

        self.decide(request, now).await
    }

    /// the "now serving" text for a request, None for segments and unknown paths
    pub fn announcement(request: &InboundRequest) -> Option<String> {
        match request.path.as_str() {
            "/playlist.m3u8" => Some(match request.params.get("ch") {
                Some(channel) => format!("Channel {}", channel),
                None => "Playlist".to_string(),
            }),
            "/sports.m3u8" => Some("Playlist".to_string()),
            "/epg.xml" | "/sports.xml" => Some("EPG".to_string()),
            _ => None,
        }
    }

    pub async fn decide(
        &self,
        request: &InboundRequest,
        now: DateTime<FixedOffset>,
    ) -> AppResult<RouteDecision> {
        let path = request.path.as_str();

        if path.ends_with(".ts") || path == "/chunks.m3u8" {
            return self.segment(request);
        }

        match path {
            "/playlist.m3u8" => match request.params.get("ch") {
                Some(channel) => {
                    self.select_channel(&request.client_id, channel, now.with_timezone(&Utc))
                        .await
                }
                None => Ok(RouteDecision::GeneratedPlaylist {
                    filename: "playlist.m3u8",
                    body: self.catalog.build_playlist().await,
                }),
            },
            "/sports.m3u8" => {
                let pattern = request
                    .params
                    .get("format")
                    .unwrap_or(&self.settings.time_format);
                Ok(RouteDecision::GeneratedPlaylist {
                    filename: "sports.m3u8",
                    body: self.scheduler.build_sports_playlist(pattern, now).await,
                })
            }
            "/epg.xml" => Ok(RouteDecision::GeneratedGuideProxy(
                self.settings.epg_url.clone(),
            )),
            "/sports.xml" => Ok(RouteDecision::GeneratedGuideProxy(
                self.settings.sports_epg_url.clone(),
            )),
            _ => {
                debug!("no route for {}", path);
                Ok(RouteDecision::NotFound)
            }
        }
    }

    /// builds the stream base for the current account, same channel always gives the same url
    pub fn stream_base(
        &self,
        server: &str,
        service: &str,
        channel: &str,
        quality: &str,
    ) -> String {
        fill_template(
            &self.settings.stream_url_template,
            &[
                ("server", server),
                ("service", service),
                ("channel", pad_channel(channel).as_str()),
                ("quality", quality),
            ],
        )
    }

    async fn select_channel(
        &self,
        client_id: &str,
        channel: &str,
        now: DateTime<Utc>,
    ) -> AppResult<RouteDecision> {
        // it ends up in the upstream path, so digits only
        let channel = channel.trim();
        if channel.is_empty() || !channel.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::NotFound(format!("no such channel {:?}", channel)));
        }

        // base and signature have to come from the same account
        let auth = self.tokens.authorize(now).await?;
        let base = self.stream_base(
            &auth.settings.server,
            &auth.settings.service,
            channel,
            &auth.settings.quality,
        );
        let target = format!(
            "{}/playlist.m3u8?wmsAuthSign={}{}",
            base, auth.token, self.settings.signature_suffix
        );

        info!("session {} switching to channel {}", client_id, channel);
        if !self.sessions.select_stream(client_id, base, auth.generation) {
            return Err(Error::NotFound(format!(
                "provider settings changed while selecting channel {}",
                channel
            )));
        }

        Ok(if self.settings.redirect_channels {
            RouteDecision::StaticRedirect(target)
        } else {
            RouteDecision::AuthorizedSegmentProxy(target)
        })
    }

    fn segment(&self, request: &InboundRequest) -> AppResult<RouteDecision> {
        let base = self.sessions.stream_base(&request.client_id).ok_or_else(|| {
            Error::NotFound(format!(
                "{} requested before any channel was selected",
                request.path
            ))
        })?;

        let target = match request.query.as_deref() {
            Some(query) if !query.is_empty() => format!("{}{}?{}", base, request.path, query),
            _ => format!("{}{}", base, request.path),
        };

        Ok(RouteDecision::AuthorizedSegmentProxy(target))
    }
}
