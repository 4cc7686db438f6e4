//! Network-first and cache-first answer strategies.
//!
//! Both strategies read the store through a handle re-opened by name. Store
//! read errors count as a miss; store writes are handed to the gateway's
//! background writer and never affect the response.

use super::{Gateway, Network, ResponseSource};
use crate::Error;
use crate::cache::Store;
use crate::message::{Request, Response};

impl<N: Network> Gateway<N> {
    /// Live response when the network answers; otherwise the cached entry for
    /// this request, otherwise the offline document.
    pub(crate) async fn network_first(
        &self, store: &Store, request: &Request,
    ) -> Result<(Response, ResponseSource), Error> {
        match self.network.fetch(request).await {
            Ok(response) => {
                self.cache_copy(store, request, &response).await;
                Ok((response, ResponseSource::Network))
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "navigation fetch failed, trying cache");
                if let Some(cached) = self.lookup(store, request).await {
                    return Ok((cached, ResponseSource::Cache));
                }
                self.offline_fallback(store, err).await
            }
        }
    }

    /// Cached entry when present, without touching the network; otherwise
    /// the live response, otherwise the offline document.
    pub(crate) async fn cache_first(
        &self, store: &Store, request: &Request,
    ) -> Result<(Response, ResponseSource), Error> {
        if let Some(cached) = self.lookup(store, request).await {
            return Ok((cached, ResponseSource::Cache));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.cache_copy(store, request, &response).await;
                Ok((response, ResponseSource::Network))
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "asset fetch failed");
                self.offline_fallback(store, err).await
            }
        }
    }

    async fn lookup(&self, store: &Store, request: &Request) -> Option<Response> {
        match store.match_request(request).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn offline_fallback(&self, store: &Store, cause: Error) -> Result<(Response, ResponseSource), Error> {
        let offline = Request::get(&self.config.offline_url);
        match self.lookup(store, &offline).await {
            Some(document) => Ok((document, ResponseSource::Offline)),
            None => Err(match cause {
                Error::FetchFailure(msg) => Error::FetchFailure(msg),
                other => Error::FetchFailure(other.to_string()),
            }),
        }
    }
}
