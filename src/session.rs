use std::sync::Mutex;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, trace};

use crate::logger::{redacted_form, MessageLogger};
use crate::protocol::{cookie_string, login_form, login_succeeded, LOGIN_PATH};
use crate::Result;

const REQUESTED_WITH: &str = "XMLHttpRequest";

/// Body of a portal request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Form(Vec<(String, String)>),
    Json(Value),
}

impl RequestBody {
    fn log_view(&self) -> Option<Value> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Form(form) => Some(redacted_form(form)),
            RequestBody::Json(v) => Some(v.clone()),
        }
    }
}

/// An authenticated (or failed) login against the portal.
///
/// The cookie string and the authenticated flag are fixed when the session is
/// created by [`Session::login`]; logging in again produces a new session.
pub struct Session {
    http: reqwest::Client,
    base_url: String,
    cookies: String,
    authenticated: bool,
    logger: Option<Mutex<MessageLogger>>,
}

impl Session {
    pub(crate) async fn login(
        http: reqwest::Client,
        base_url: String,
        logger: Option<MessageLogger>,
        username: &str,
        password: &str,
    ) -> Result<Session> {
        let mut session = Session {
            http,
            base_url,
            cookies: String::new(),
            authenticated: false,
            logger: logger.map(Mutex::new),
        };

        let form = login_form(username, password);
        let resp = session
            .send(LOGIN_PATH, Method::POST, RequestBody::Form(form))
            .await?;
        let status = resp.status().as_u16();
        let cookies = cookie_string(
            resp.headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        let body = resp.text().await?;

        session.authenticated = login_succeeded(&body);
        session.cookies = cookies;
        debug!(
            status,
            body_len = body.len(),
            authenticated = session.authenticated,
            "login finished"
        );
        session.log(|l| l.log_login(status, session.authenticated));
        Ok(session)
    }

    /// Result of the login that created this session. Never re-validated.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn cookies(&self) -> &str {
        &self.cookies
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request relative to the portal base URL and hand back the raw response.
    pub async fn send(
        &self,
        path: &str,
        method: Method,
        body: RequestBody,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        trace!(%method, url = %url, "portal request");
        self.log(|l| l.log_request(method.as_str(), path, body.log_view().as_ref()));

        let mut req = self
            .http
            .request(method, &url)
            .header("X-Requested-With", REQUESTED_WITH);
        if !self.cookies.is_empty() {
            req = req.header(COOKIE, &self.cookies);
        }
        req = match body {
            RequestBody::Empty => req,
            RequestBody::Form(form) => req.form(&form),
            RequestBody::Json(value) => req.json(&value),
        };
        Ok(req.send().await?)
    }

    /// [`send`](Self::send), then decode the body as JSON. Error statuses are transport faults.
    pub async fn send_json(&self, path: &str, method: Method, body: RequestBody) -> Result<Value> {
        let resp = self.send(path, method, body).await?.error_for_status()?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    #[cfg(test)]
    pub(crate) fn offline(base_url: &str, authenticated: bool) -> Session {
        Session {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
            cookies: String::new(),
            authenticated,
            logger: None,
        }
    }

    pub(crate) fn log(&self, f: impl FnOnce(&mut MessageLogger)) {
        if let Some(logger) = &self.logger
            && let Ok(mut guard) = logger.lock()
        {
            f(&mut guard);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.authenticated)
            .field("has_cookies", &!self.cookies.is_empty())
            .finish()
    }
}
