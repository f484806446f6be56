//! Request plumbing shared by the OAuth and REST clients

use cla_gate::{PlatformError, PlatformResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Thin wrapper over a shared `reqwest::Client` bound to one instance.
#[derive(Clone)]
pub(crate) struct Transport {
    client: Client,
    instance_url: String,
    page_size: u32,
}

impl Transport {
    pub(crate) fn new(client: Client, instance_url: &str, page_size: u32) -> Self {
        Self {
            client,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            page_size: page_size.max(1),
        }
    }

    pub(crate) fn instance_url(&self) -> &str {
        &self.instance_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v4{}", self.instance_url, path)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, token: &str, path: &str) -> PlatformResult<T> {
        let request = self.client.get(self.api_url(path)).bearer_auth(token);
        handle_response(send(request).await?).await
    }

    /// Follow `x-next-page` until the last page.
    pub(crate) async fn get_all<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
    ) -> PlatformResult<Vec<T>> {
        let url = self.api_url(path);
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let request = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&[("per_page", self.page_size), ("page", page)]);
            let response = send(request).await?;
            let next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok());

            let batch: Vec<T> = handle_response(response).await?;
            debug!(path, page, count = batch.len(), "page fetched");
            items.extend(batch);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(items)
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        token: &str,
        path: &str,
        body: &B,
    ) -> PlatformResult<()> {
        let request = self.client.post(self.api_url(path)).bearer_auth(token).json(body);
        check_status(send(request).await?).await
    }

    /// Form POST to an instance-root path such as `/oauth/token`.
    pub(crate) async fn post_form<F: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        form: &F,
    ) -> PlatformResult<T> {
        let request = self
            .client
            .post(format!("{}{}", self.instance_url, path))
            .form(form);
        handle_response(send(request).await?).await
    }
}

async fn send(request: RequestBuilder) -> PlatformResult<Response> {
    request
        .send()
        .await
        .map_err(|e| PlatformError::Transport(e.to_string()))
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> PlatformResult<T> {
    let response = error_for_status(response).await?;
    response
        .json()
        .await
        .map_err(|e| PlatformError::Decode(e.to_string()))
}

async fn check_status(response: Response) -> PlatformResult<()> {
    error_for_status(response).await.map(|_| ())
}

async fn error_for_status(response: Response) -> PlatformResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(PlatformError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
