//! Test utilities: a scripted in-memory prober.
//!
//! Routes are keyed by the exact URL string. Every probe is recorded so
//! tests can assert on which URLs were hit with which method.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;

use crate::error::AppError;
use crate::traits::{ProbeMethod, ProbeResponse, Prober};

// ---------------------------------------------------------------------------
// MockRoute
// ---------------------------------------------------------------------------

/// Scripted behaviour for one URL.
#[derive(Debug, Clone)]
pub enum MockRoute {
    /// 3xx response; `location: None` omits the header.
    Redirect { status: u16, location: Option<String> },
    /// Non-redirect response. `html: None` simulates an unreadable body.
    Page { status: u16, html: Option<String> },
    Fail(AppError),
    /// Never completes.
    Hang,
    /// Wait, then behave like the inner route.
    Slow(Duration, Box<MockRoute>),
    /// Different behaviour for HEAD and GET.
    Split {
        head: Box<MockRoute>,
        get: Box<MockRoute>,
    },
}

impl MockRoute {
    pub fn redirect(status: u16, location: &str) -> Self {
        Self::Redirect {
            status,
            location: Some(location.to_string()),
        }
    }

    pub fn missing_location(status: u16) -> Self {
        Self::Redirect {
            status,
            location: None,
        }
    }

    pub fn page(status: u16, html: &str) -> Self {
        Self::Page {
            status,
            html: Some(html.to_string()),
        }
    }

    pub fn unreadable_body(status: u16) -> Self {
        Self::Page { status, html: None }
    }

    pub fn split(head: MockRoute, get: MockRoute) -> Self {
        Self::Split {
            head: Box::new(head),
            get: Box::new(get),
        }
    }
}

// ---------------------------------------------------------------------------
// MockProber
// ---------------------------------------------------------------------------

/// Prober answering from a fixed route table.
///
/// Unknown URLs fail with a network error.
#[derive(Clone, Default)]
pub struct MockProber {
    routes: Arc<Mutex<HashMap<String, MockRoute>>>,
    calls: Arc<Mutex<Vec<(ProbeMethod, String)>>>,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, route: MockRoute) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), route);
        self
    }

    pub fn redirect(self, url: &str, status: u16, location: &str) -> Self {
        self.route(url, MockRoute::redirect(status, location))
    }

    pub fn page(self, url: &str, status: u16, html: &str) -> Self {
        self.route(url, MockRoute::page(status, html))
    }

    pub fn slow(self, url: &str, delay: Duration, route: MockRoute) -> Self {
        self.route(url, MockRoute::Slow(delay, Box::new(route)))
    }

    /// Every probe issued so far, in order.
    pub fn calls(&self) -> Vec<(ProbeMethod, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Prober for MockProber {
    async fn probe(&self, method: ProbeMethod, url: &Url) -> Result<ProbeResponse, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((method, url.as_str().to_string()));

        let route = self.routes.lock().unwrap().get(url.as_str()).cloned();
        match route {
            Some(route) => answer(route, method).await,
            None => Err(AppError::NetworkError(format!(
                "connection refused: {url}"
            ))),
        }
    }
}

async fn answer(mut route: MockRoute, method: ProbeMethod) -> Result<ProbeResponse, AppError> {
    loop {
        route = match route {
            MockRoute::Redirect { status, location } => {
                let headers = location
                    .map(|loc| BTreeMap::from([("location".to_string(), loc)]))
                    .unwrap_or_default();
                return Ok(response(status, headers, None));
            }
            MockRoute::Page { status, html } => {
                let headers =
                    BTreeMap::from([("content-type".to_string(), "text/html".to_string())]);
                let body = match method {
                    ProbeMethod::Head => None,
                    ProbeMethod::Get => html,
                };
                return Ok(response(status, headers, body));
            }
            MockRoute::Fail(error) => return Err(error),
            MockRoute::Hang => std::future::pending().await,
            MockRoute::Slow(delay, inner) => {
                tokio::time::sleep(delay).await;
                *inner
            }
            MockRoute::Split { head, get } => match method {
                ProbeMethod::Head => *head,
                ProbeMethod::Get => *get,
            },
        };
    }
}

fn response(status: u16, headers: BTreeMap<String, String>, body: Option<String>) -> ProbeResponse {
    ProbeResponse {
        status,
        status_text: reason(status).to_string(),
        headers,
        body,
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "",
    }
}
