// one fallback handler does all the routing, the player asks for a handful of fixed paths plus
// whatever relative segment names the upstream playlist hands it, which axum routes can't express
use std::collections::HashMap;
use std::io::Write;

use axum::{
    Router,
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use chrono::Local;
use flate2::{Compression, write::GzEncoder};
use tracing::{debug, error};

use crate::server::{
    error::{AppResult, Error},
    extractors::PlayerSession,
    services::{
        RelayServices,
        route_services::{InboundRequest, RouteDecision},
    },
};

/// how a generated playlist goes over the wire
#[derive(Debug, Clone, Copy, PartialEq)]
enum PlaylistEncoding {
    Zstd,
    Gzip,
    Identity,
}

impl PlaylistEncoding {
    /// strongest encoding the player lists without `q=0`, playlists are small text so the
    /// weights beyond zero don't matter
    fn negotiate(accept_encoding: Option<&str>) -> Self {
        let accepted: Vec<&str> = accept_encoding
            .unwrap_or_default()
            .split(',')
            .filter_map(|item| {
                let mut parts = item.split(';').map(str::trim);
                let coding = parts.next().filter(|c| !c.is_empty())?;
                let refused = parts.any(|param| {
                    param
                        .strip_prefix("q=")
                        .and_then(|q| q.parse::<f32>().ok())
                        .is_some_and(|q| q <= 0.0)
                });
                (!refused).then_some(coding)
            })
            .collect();

        let accepts = |coding: &str| accepted.iter().any(|c| c.eq_ignore_ascii_case(coding));

        if accepts("zstd") {
            Self::Zstd
        } else if accepts("gzip") {
            Self::Gzip
        } else {
            Self::Identity
        }
    }

    fn content_encoding(self) -> Option<&'static str> {
        match self {
            Self::Zstd => Some("zstd"),
            Self::Gzip => Some("gzip"),
            Self::Identity => None,
        }
    }

    fn encode(self, body: &str) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Zstd => zstd::encode_all(body.as_bytes(), 3),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(body.as_bytes())?;
                encoder.finish()
            }
            Self::Identity => Ok(body.as_bytes().to_vec()),
        }
    }
}

/// parses "bytes=start-end" against a body of `total_len`, None means serve everything
fn requested_range(range: Option<&str>, total_len: usize) -> Option<(usize, usize)> {
    let range_part = range?.strip_prefix("bytes=")?;
    let (start, end) = range_part.split_once('-')?;

    let last = total_len.checked_sub(1)?;
    let start: usize = start.trim().parse().ok()?;
    let end: usize = if end.trim().is_empty() {
        last
    } else {
        end.trim().parse().unwrap_or(last)
    };
    let end = end.min(last);

    (start <= end).then_some((start, end))
}

pub struct RelayController;

impl RelayController {
    pub fn app() -> Router {
        Router::new().fallback(Self::relay)
    }

    async fn relay(
        PlayerSession(client_id, services): PlayerSession,
        uri: Uri,
        headers: HeaderMap,
    ) -> AppResult<Response> {
        let request = InboundRequest {
            client_id,
            path: uri.path().to_string(),
            query: uri.query().map(|q| q.to_string()),
            params: Self::query_params(uri.query()),
        };
        debug!("{} {:?}", request.path, request.query);

        let now = Local::now().fixed_offset();

        match services.router.route(&request, now).await? {
            RouteDecision::StaticRedirect(target) => Self::build_redirect_response(&target),
            RouteDecision::GeneratedPlaylist { filename, body } => {
                Self::build_m3u8_response(&body, filename, &headers)
            }
            RouteDecision::GeneratedGuideProxy(target)
            | RouteDecision::AuthorizedSegmentProxy(target) => {
                Self::proxy(&services, &target, &headers).await
            }
            RouteDecision::NotFound => Err(Error::NotFound(request.path)),
        }
    }

    // first value wins if the player repeats a parameter
    fn query_params(query: Option<&str>) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(query) = query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params
                    .entry(key.into_owned())
                    .or_insert_with(|| value.into_owned());
            }
        }
        params
    }

    /// headers every response to the player carries
    fn player_headers() -> HeaderMap {
        let mut response_headers = HeaderMap::new();
        response_headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        response_headers
    }

    fn build_redirect_response(target: &str) -> AppResult<Response> {
        let mut response_headers = Self::player_headers();
        response_headers.insert(
            header::LOCATION,
            HeaderValue::from_str(target).map_err(|e| {
                error!("redirect target is not a valid header: {}", e);
                Error::InternalServerErrorWithContext("Invalid redirect target".to_string())
            })?,
        );

        Ok((StatusCode::FOUND, response_headers).into_response())
    }

    /// build m3u8 response with proper headers and optional compression
    fn build_m3u8_response(
        body: &str,
        filename: &str,
        headers: &HeaderMap,
    ) -> AppResult<Response> {
        let encoding = PlaylistEncoding::negotiate(
            headers
                .get(header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok()),
        );

        let mut response_headers = Self::player_headers();
        response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-mpegURL"),
        );
        response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        response_headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)).map_err(
                |_| Error::InternalServerErrorWithContext("Invalid playlist filename".to_string()),
            )?,
        );

        let response_body = encoding.encode(body).map_err(|e| {
            error!("failed to encode {} with {:?}: {}", filename, encoding, e);
            Error::InternalServerErrorWithContext("Failed to compress playlist".to_string())
        })?;

        if let Some(coding) = encoding.content_encoding() {
            debug!(
                "{} {} -> {} bytes ({})",
                filename,
                body.len(),
                response_body.len(),
                coding
            );
            response_headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(coding));
        }

        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(response_body.len()));

        Ok((StatusCode::OK, response_headers, response_body).into_response())
    }

    /// passes upstream bytes through, slicing out a range when the player asks for one
    async fn proxy(
        services: &RelayServices,
        target: &str,
        headers: &HeaderMap,
    ) -> AppResult<Response> {
        let content = services
            .fetcher
            .fetch_content(target)
            .await
            .ok_or_else(|| Error::NotFound(format!("upstream unavailable for {}", target)))?;

        let total_len = content.bytes.len();
        let mut response_headers = Self::player_headers();

        response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&content.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
        );
        response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let range = requested_range(
            headers.get(header::RANGE).and_then(|v| v.to_str().ok()),
            total_len,
        );

        let (status_code, body) = match range {
            Some((start, end)) => {
                debug!("Serving range {}-{} of {} bytes", start, end, total_len);
                response_headers.insert(
                    header::CONTENT_RANGE,
                    HeaderValue::from_str(&format!("bytes {}-{}/{}", start, end, total_len))
                        .map_err(|_| {
                            Error::InternalServerErrorWithContext("Invalid range".to_string())
                        })?,
                );
                (
                    StatusCode::PARTIAL_CONTENT,
                    content.bytes[start..=end].to_vec(),
                )
            }
            None => (StatusCode::OK, content.bytes),
        };

        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));

        Ok((status_code, response_headers, body).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_zstd_then_gzip() {
        assert_eq!(
            PlaylistEncoding::negotiate(Some("gzip, deflate, br, zstd")),
            PlaylistEncoding::Zstd
        );
        assert_eq!(
            PlaylistEncoding::negotiate(Some("gzip, deflate")),
            PlaylistEncoding::Gzip
        );
        assert_eq!(PlaylistEncoding::negotiate(Some("GZIP")), PlaylistEncoding::Gzip);
    }

    #[test]
    fn falls_back_to_identity() {
        assert_eq!(PlaylistEncoding::negotiate(None), PlaylistEncoding::Identity);
        assert_eq!(PlaylistEncoding::negotiate(Some("")), PlaylistEncoding::Identity);
        assert_eq!(
            PlaylistEncoding::negotiate(Some("identity")),
            PlaylistEncoding::Identity
        );
        assert_eq!(PlaylistEncoding::negotiate(Some("br")), PlaylistEncoding::Identity);
    }

    #[test]
    fn honours_refused_codings() {
        assert_eq!(
            PlaylistEncoding::negotiate(Some("zstd;q=0, gzip;q=0.5")),
            PlaylistEncoding::Gzip
        );
        assert_eq!(
            PlaylistEncoding::negotiate(Some("gzip; q=0.0")),
            PlaylistEncoding::Identity
        );
    }

    #[test]
    fn identity_leaves_the_body_alone() {
        assert_eq!(
            PlaylistEncoding::Identity.encode("#EXTM3U\n").unwrap(),
            b"#EXTM3U\n".to_vec()
        );
        assert_eq!(PlaylistEncoding::Identity.content_encoding(), None);
    }

    #[test]
    fn parses_ranges() {
        assert_eq!(requested_range(Some("bytes=0-9"), 100), Some((0, 9)));
        assert_eq!(requested_range(Some("bytes=90-"), 100), Some((90, 99)));
        assert_eq!(requested_range(Some("bytes=90-500"), 100), Some((90, 99)));
        assert_eq!(requested_range(Some("bytes=100-"), 100), None);
        assert_eq!(requested_range(Some("bytes=0-9"), 0), None);
        assert_eq!(requested_range(Some("items=0-9"), 100), None);
        assert_eq!(requested_range(None, 100), None);
    }

    #[test]
    fn first_query_value_wins() {
        let params = RelayController::query_params(Some("ch=07&ch=09&format=%25H%3A%25M"));
        assert_eq!(params.get("ch").map(String::as_str), Some("07"));
        assert_eq!(params.get("format").map(String::as_str), Some("%H:%M"));
        assert!(RelayController::query_params(None).is_empty());
    }
}
