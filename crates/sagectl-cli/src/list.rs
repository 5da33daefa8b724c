use std::future::Future;

use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::{debug, info};

use sagectl_api::ControlPlane;
use sagectl_common::{Collected, EndpointSummary, Error, ListQuery, ModelSummary, Page, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub models: bool,
    pub endpoints: bool,
    pub name_contains: Option<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            models: true,
            endpoints: true,
            name_contains: None,
        }
    }
}

/// Kinds that were not requested stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Listing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Collected<ModelSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Collected<EndpointSummary>>,
}

/// A kind's enumeration failed; `partial` holds the kinds completed before it.
#[derive(Debug, ThisError)]
#[error("{source}")]
pub struct ListError {
    pub partial: Listing,
    #[source]
    pub source: Error,
}

/// Fetch the first page, then keep following continuation tokens until a
/// page comes back without one.
pub async fn collect_all<T, F, Fut>(query: &ListQuery, mut fetch: F) -> Result<Collected<T>>
where
    F: FnMut(ListQuery) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut all = Collected::default();
    let mut page = fetch(query.with_token(None)).await?;
    loop {
        debug!(page = all.pages + 1, items = page.items.len(), more = page.next_token.is_some(), "list page");
        match all.absorb(page) {
            Some(token) => page = fetch(query.with_token(Some(token))).await?,
            None => return Ok(all),
        }
    }
}

pub async fn list_models(cp: &dyn ControlPlane, query: &ListQuery) -> Result<Collected<ModelSummary>> {
    collect_all(query, |q| async move { cp.list_models(&q).await }).await
}

pub async fn list_endpoints(
    cp: &dyn ControlPlane,
    query: &ListQuery,
) -> Result<Collected<EndpointSummary>> {
    collect_all(query, |q| async move { cp.list_endpoints(&q).await }).await
}

/// Enumerate models, then endpoints.
pub async fn list(cp: &dyn ControlPlane, opts: &ListOptions) -> Result<Listing, ListError> {
    let query = ListQuery {
        name_contains: opts.name_contains.clone(),
        ..Default::default()
    };
    let mut listing = Listing::default();

    if opts.models {
        info!("retrieving models");
        match list_models(cp, &query).await {
            Ok(models) => listing.models = Some(models),
            Err(source) => {
                return Err(ListError {
                    partial: listing,
                    source,
                })
            }
        }
    }

    if opts.endpoints {
        info!("retrieving endpoints");
        match list_endpoints(cp, &query).await {
            Ok(endpoints) => listing.endpoints = Some(endpoints),
            Err(source) => {
                return Err(ListError {
                    partial: listing,
                    source,
                })
            }
        }
    }

    Ok(listing)
}
