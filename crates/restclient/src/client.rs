//! Request dispatch.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use reqwest::Client;
use restclient_log::spans::{self, Timer};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::{build_client, ClientConfig};
use crate::error::{RestError, Result};
use crate::request::{OnComplete, PreparedRequest, RequestOptions, ResponseType, Verb};
use crate::response::{collect_body, Body, Completion};

/// Sends requests built from [`RequestOptions`].
///
/// Holds no per-request state; every call builds its own headers.
#[derive(Debug, Clone)]
pub struct RestClient {
    inner: Client,
    config: ClientConfig,
}

impl RestClient {
    /// Create a client with default config.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with custom config.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let inner = build_client(&config)?;
        Ok(Self { inner, config })
    }

    /// The client's config.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve a request without sending it.
    pub fn prepare(&self, verb: Verb, url: &str, options: &RequestOptions) -> Result<PreparedRequest> {
        PreparedRequest::build(verb, url, options, &self.config.defaults)
    }

    /// Send a request on the current tokio runtime.
    ///
    /// URL and header errors are returned here, before anything is sent.
    /// The returned handle resolves once the body has been fully read; the
    /// request runs to completion even if the handle is dropped.
    pub fn dispatch(&self, verb: Verb, url: &str, options: RequestOptions) -> Result<InFlight> {
        let prepared = self.prepare(verb, url, &options)?;
        let runtime = Handle::try_current().map_err(|_| RestError::NoRuntime)?;

        let span = spans::request_span(verb.as_str(), prepared.url().as_str());
        tracing::debug!(parent: &span, path = %prepared.path(), port = prepared.port(), "dispatching request");

        let (verb, url, headers, body) = prepared.into_parts();
        let mut request = self.inner.request(verb.into(), url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let RequestOptions {
            on_complete,
            response_type,
            ..
        } = options;

        let task = runtime.spawn(spans::instrument_future(
            execute(request, response_type, on_complete),
            span,
        ));

        Ok(InFlight { task })
    }

    /// Send a GET request.
    pub fn get(&self, url: &str, options: RequestOptions) -> Result<InFlight> {
        self.dispatch(Verb::Get, url, options)
    }

    /// Send a POST request.
    pub fn post(&self, url: &str, options: RequestOptions) -> Result<InFlight> {
        self.dispatch(Verb::Post, url, options)
    }

    /// Send a HEAD request.
    pub fn head(&self, url: &str, options: RequestOptions) -> Result<InFlight> {
        self.dispatch(Verb::Head, url, options)
    }

    /// Send a PUT request.
    pub fn put(&self, url: &str, options: RequestOptions) -> Result<InFlight> {
        self.dispatch(Verb::Put, url, options)
    }

    /// Send a DELETE request.
    pub fn del(&self, url: &str, options: RequestOptions) -> Result<InFlight> {
        self.dispatch(Verb::Delete, url, options)
    }
}

async fn execute(
    request: reqwest::RequestBuilder,
    response_type: ResponseType,
    on_complete: Option<OnComplete>,
) -> Result<Completion> {
    let result = send_and_collect(request, response_type).await;

    match &result {
        Ok(completion) => {
            if let Some(callback) = on_complete {
                callback(completion.body.clone(), completion.status);
            }
        }
        Err(e) => spans::record_error(e),
    }

    result
}

async fn send_and_collect(
    request: reqwest::RequestBuilder,
    response_type: ResponseType,
) -> Result<Completion> {
    let timer = Timer::start("request");

    let response = request.send().await.map_err(RestError::Request)?;
    let status = response.status().as_u16();
    spans::record_status(&tracing::Span::current(), status);
    tracing::debug!(status, "response received");

    let buffer = collect_body(response).await?;
    let body = Body::decode(response_type, status, &buffer)?;
    timer.finish();

    Ok(Completion { body, status })
}

/// A dispatched request.
///
/// Resolves to the buffered, decoded response. There is no way to cancel it;
/// dropping the handle only stops waiting for the result.
#[derive(Debug)]
pub struct InFlight {
    task: JoinHandle<Result<Completion>>,
}

impl Future for InFlight {
    type Output = Result<Completion>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => Poll::Ready(Err(RestError::Task(e.to_string()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn env_client() -> Result<RestClient> {
    RestClient::with_config(ClientConfig::from_env())
}

/// Send a GET request with a client configured from the environment.
pub fn get(url: &str, options: RequestOptions) -> Result<InFlight> {
    env_client()?.get(url, options)
}

/// Send a POST request with a client configured from the environment.
pub fn post(url: &str, options: RequestOptions) -> Result<InFlight> {
    env_client()?.post(url, options)
}

/// Send a HEAD request with a client configured from the environment.
pub fn head(url: &str, options: RequestOptions) -> Result<InFlight> {
    env_client()?.head(url, options)
}

/// Send a PUT request with a client configured from the environment.
pub fn put(url: &str, options: RequestOptions) -> Result<InFlight> {
    env_client()?.put(url, options)
}

/// Send a DELETE request with a client configured from the environment.
pub fn del(url: &str, options: RequestOptions) -> Result<InFlight> {
    env_client()?.del(url, options)
}
