//! Server-sent change events for the authenticated user.

use crate::api::ExtractUser;
use crate::core::traits::ChangeNotifier;
use async_stream::stream;
use axum::Router;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::get;
use di_axum::Inject;
use futures_util::{Stream, StreamExt};
use log::{debug, warn};
use std::convert::Infallible;

pub fn router() -> Router {
    Router::new().route("/", get(subscribe))
}

async fn subscribe(
    Inject(notifier): Inject<dyn ChangeNotifier>,
    ExtractUser(current_user): ExtractUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("User {current_user} subscribed to changes");
    let mut changes = notifier.subscribe(current_user);

    let stream = stream! {
        while let Some(event) = changes.next().await {
            match Event::default().event(event.change.name()).json_data(&event) {
                Ok(sse_event) => yield Ok(sse_event),
                Err(e) => warn!("Dropping {} event: {e}", event.change.name()),
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
