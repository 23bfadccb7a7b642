//! HTTP client for `/api/vote`.

use std::future::Future;
use std::sync::Arc;

use lovevote_core::{AnonymousId, ErrorBody, ItemId, ToggleOutcome, VoteRegistry, VoteTally};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Path of the vote endpoint relative to the server base URL.
pub const VOTE_PATH: &str = "api/vote";

/// Operations the registry synchronizer and vote controls need from the server.
pub trait VoteApi: Send + Sync {
    /// `GET /api/vote?userId=…`: every voted item, with this voter's loves.
    fn fetch_registry(
        &self,
        voter: &AnonymousId,
    ) -> impl Future<Output = Result<VoteRegistry, ClientError>> + Send;

    /// `GET /api/vote?itemId=…&userId=…`
    fn fetch_tally(
        &self,
        item_id: &ItemId,
        voter: &AnonymousId,
    ) -> impl Future<Output = Result<VoteTally, ClientError>> + Send;

    /// `POST /api/vote?itemId=…&userId=…`
    fn toggle(
        &self,
        item_id: &ItemId,
        voter: &AnonymousId,
    ) -> impl Future<Output = Result<ToggleOutcome, ClientError>> + Send;
}

impl<T: VoteApi> VoteApi for Arc<T> {
    fn fetch_registry(
        &self,
        voter: &AnonymousId,
    ) -> impl Future<Output = Result<VoteRegistry, ClientError>> + Send {
        (**self).fetch_registry(voter)
    }

    fn fetch_tally(
        &self,
        item_id: &ItemId,
        voter: &AnonymousId,
    ) -> impl Future<Output = Result<VoteTally, ClientError>> + Send {
        (**self).fetch_tally(item_id, voter)
    }

    fn toggle(
        &self,
        item_id: &ItemId,
        voter: &AnonymousId,
    ) -> impl Future<Output = Result<ToggleOutcome, ClientError>> + Send {
        (**self).toggle(item_id, voter)
    }
}

/// [`VoteApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpVoteApi {
    client: Client,
    endpoint: Url,
}

impl HttpVoteApi {
    /// Build a client for the server at `config.base_url`.
    ///
    /// The endpoint is resolved relative to the base URL, so a base with a
    /// path prefix must end in `/` (`https://host/app/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built or the HTTP
    /// client fails to initialize.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.base_url.join(VOTE_PATH)?,
        })
    }

    /// Absolute URL of the vote endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, params: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().extend_pairs(params);
        url
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let (error, details) = match serde_json::from_slice::<ErrorBody>(&bytes) {
                Ok(body) => (body.error, body.details),
                Err(_) => (String::from_utf8_lossy(&bytes).into_owned(), None),
            };
            return Err(ClientError::Status {
                status: status.as_u16(),
                error,
                details,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl VoteApi for HttpVoteApi {
    #[tracing::instrument(skip_all)]
    async fn fetch_registry(&self, voter: &AnonymousId) -> Result<VoteRegistry, ClientError> {
        let url = self.url(&[("userId", voter.as_str())]);
        Self::send(self.client.get(url)).await
    }

    #[tracing::instrument(skip_all, fields(item_id = %item_id))]
    async fn fetch_tally(
        &self,
        item_id: &ItemId,
        voter: &AnonymousId,
    ) -> Result<VoteTally, ClientError> {
        let url = self.url(&[("itemId", item_id.as_str()), ("userId", voter.as_str())]);
        Self::send(self.client.get(url)).await
    }

    #[tracing::instrument(skip_all, fields(item_id = %item_id))]
    async fn toggle(
        &self,
        item_id: &ItemId,
        voter: &AnonymousId,
    ) -> Result<ToggleOutcome, ClientError> {
        let url = self.url(&[("itemId", item_id.as_str()), ("userId", voter.as_str())]);
        Self::send(self.client.post(url)).await
    }
}
