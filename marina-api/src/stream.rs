use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use futures_util::stream::Stream;
use marina_core::{ChangeEvent, ChangeTable, Section};
use marina_store::ChangeHub;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/content/{section}/stream", get(content_stream))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/v1/admin/bookings/stream", get(bookings_stream))
}

/// GET /v1/admin/bookings/stream
async fn bookings_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = change_stream(&state.hub, |event| {
        event.touches(ChangeTable::Bookings, None) || event.touches(ChangeTable::Availability, None)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /v1/content/{section}/stream
async fn content_stream(
    State(state): State<AppState>,
    WithRejection(Path(section), _): WithRejection<Path<String>, AppError>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let section: Section = section.parse().map_err(marina_core::CoreError::from)?;
    let stream = change_stream(&state.hub, move |event| {
        event.touches(ChangeTable::SiteContent, Some(section.as_str()))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// What a subscriber is sent next.
#[derive(Debug)]
enum Outgoing {
    Change(ChangeEvent),
    /// Events were dropped; the client should refetch everything it shows.
    Resync(u64),
}

impl Outgoing {
    fn into_event(self) -> Option<Event> {
        match self {
            Outgoing::Change(event) => to_sse(&event),
            Outgoing::Resync(skipped) => {
                Some(Event::default().event("resync").data(skipped.to_string()))
            }
        }
    }
}

fn outgoing<F>(hub: &ChangeHub, filter: F) -> impl Stream<Item = Outgoing>
where
    F: Fn(&ChangeEvent) -> bool + Send + 'static,
{
    BroadcastStream::new(hub.subscribe()).filter_map(move |result| match result {
        Ok(event) if filter(&event) => Some(Outgoing::Change(event)),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            debug!(skipped, "SSE subscriber lagged");
            Some(Outgoing::Resync(skipped))
        }
    })
}

/// Hub events matching `filter` as SSE `change` events with `seq` as the id,
/// plus a `resync` event whenever the subscriber fell behind.
fn change_stream<F>(hub: &ChangeHub, filter: F) -> impl Stream<Item = Result<Event, Infallible>>
where
    F: Fn(&ChangeEvent) -> bool + Send + 'static,
{
    outgoing(hub, filter).filter_map(|next| next.into_event().map(Ok))
}

fn to_sse(event: &ChangeEvent) -> Option<Event> {
    Event::default()
        .event("change")
        .id(event.seq.to_string())
        .json_data(event)
        .ok()
}
