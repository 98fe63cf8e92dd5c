use std::fmt::Write as _;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use odyssey_shared::api::{ApiErrorBody, TileResponse};
use odyssey_shared::minimap::{self, MINIMAP_SIZE};
use odyssey_shared::{MinimapGrid, Position, SegmentKey, World};

use crate::services::segment_loader::{self, SegmentLoadError};
use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const SEGMENT_CACHE_CONTROL: &str = "public, max-age=300";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("position {0} is outside the world")]
    OutOfBounds(Position),

    #[error(transparent)]
    Segment(#[from] SegmentLoadError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::OutOfBounds(_) => StatusCode::NOT_FOUND,
            Self::Segment(SegmentLoadError::Decode { .. }) => StatusCode::BAD_GATEWAY,
            Self::Segment(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "segments_cached": state.segments.len(),
        "colored_items": state.colors.len(),
        "bounds": state.bounds,
        "observability": {
            "segment_loads_total": observability.segment_loads_total,
            "segment_cache_hits_total": observability.segment_cache_hits_total,
            "segment_failures_total": observability.segment_failures_total,
            "segments_evicted_total": observability.segments_evicted_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus_metrics(state.segments.len(), state.observability.snapshot());

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(segments_cached: usize, observability: ObservabilitySnapshot) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP odyssey_segments_cached Current number of decoded map segments in cache."
    );
    let _ = writeln!(body, "# TYPE odyssey_segments_cached gauge");
    let _ = writeln!(body, "odyssey_segments_cached {segments_cached}");

    let counters = [
        (
            "odyssey_segment_loads_total",
            "Total map segments read and decoded from disk.",
            observability.segment_loads_total,
        ),
        (
            "odyssey_segment_cache_hits_total",
            "Total segment requests served from cache.",
            observability.segment_cache_hits_total,
        ),
        (
            "odyssey_segment_failures_total",
            "Total segment loads that failed to read or decode.",
            observability.segment_failures_total,
        ),
        (
            "odyssey_segments_evicted_total",
            "Total segments dropped from cache.",
            observability.segments_evicted_total,
        ),
    ];
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }

    body
}

pub async fn get_tile(
    State(state): State<AppState>,
    Path((x, y, z)): Path<(i32, i32, u8)>,
) -> Result<Json<TileResponse>, ApiError> {
    let position = checked_position(&state, x, y, z)?;
    let segment = segment_loader::get_or_load(&state, SegmentKey::containing(position)).await?;
    let mut world = World::new();
    segment.add_to(&mut world);

    Ok(Json(TileResponse {
        position,
        items: world.get_tile(position).cloned(),
    }))
}

pub async fn get_segment(
    State(state): State<AppState>,
    Path((x, y, z)): Path<(i32, i32, u8)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let position = checked_position(&state, x, y, z)?;
    let segment = segment_loader::get_or_load(&state, SegmentKey::containing(position)).await?;

    if if_none_match_matches(&headers, &segment.etag) {
        return Ok(not_modified_response(
            SEGMENT_CACHE_CONTROL,
            Some(segment.etag.as_str()),
        ));
    }

    Ok(json_bytes_response(
        segment.json.clone(),
        SEGMENT_CACHE_CONTROL,
        Some(segment.etag.as_str()),
    ))
}

/// Minimap colours around a position. Neighbouring segments that fail to
/// load are drawn as unknown instead of failing the whole minimap.
pub async fn get_minimap(
    State(state): State<AppState>,
    Path((x, y, z)): Path<(i32, i32, u8)>,
) -> Result<Json<MinimapGrid>, ApiError> {
    let center = checked_position(&state, x, y, z)?;
    let radius = minimap::MINIMAP_RADIUS;
    let far = MINIMAP_SIZE as i32 - 1 - radius;

    let mut world = World::new();
    for corner in [
        center.offset(-radius, -radius),
        center.offset(far, -radius),
        center.offset(-radius, far),
        center.offset(far, far),
    ] {
        let key = SegmentKey::containing(corner);
        if world.is_loaded(key) {
            continue;
        }
        if let Ok(segment) = segment_loader::get_or_load(&state, key).await {
            segment.add_to(&mut world);
        }
    }

    Ok(Json(minimap::sample_world(&world, &state.colors, center)))
}

fn checked_position(state: &AppState, x: i32, y: i32, z: u8) -> Result<Position, ApiError> {
    let position = Position::new(x, y, z);
    if !state.bounds.contains(position) {
        return Err(ApiError::OutOfBounds(position));
    }
    Ok(position)
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate)
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
