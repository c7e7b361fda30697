use std::{convert::Infallible, sync::Arc};

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};
use warp::Filter;

mod handlers;
mod rejection;
mod routes;

pub use rejection::{error_response, handle_rejection};
pub use routes::routes;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiContext {
    pub pool: Pool<Postgres>,
    pub cache: Option<MultiplexedConnection>,
    pub secret: Arc<str>,
    pub session_hours: i64,
}

fn with_context(
    context: ApiContext,
) -> impl Filter<Extract = (ApiContext,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

/// Decoded query string; a missing query yields no pairs.
fn with_query() -> impl Filter<Extract = (Vec<(String, String)>,), Error = Infallible> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
        .map(|raw: String| {
            url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect::<Vec<(String, String)>>()
        })
}

fn query_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
