use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use crate::dispatch::Completion;

/// Parsed post-login landing URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthLanding {
    /// The URL with the handshake parameters removed.
    pub clean_url: Url,
    pub email: Option<String>,
}

/// Recognize `?auth=success` on a landing URL and strip it (and `email`).
///
/// Returns `None` for URLs that are not an auth landing.
pub fn strip_auth_params(url: &Url) -> Option<AuthLanding> {
    let succeeded = url
        .query_pairs()
        .any(|(key, value)| key == "auth" && value == "success");
    if !succeeded {
        return None;
    }

    let email = url
        .query_pairs()
        .find(|(key, _)| key == "email")
        .map(|(_, value)| value.into_owned())
        .filter(|e| !e.is_empty());

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "auth" && key != "email")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut clean_url = url.clone();
    if kept.is_empty() {
        clean_url.set_query(None);
    } else {
        clean_url.query_pairs_mut().clear().extend_pairs(kept);
    }

    Some(AuthLanding { clean_url, email })
}

/// Parse a launch URL handed to the client on startup.
pub fn landing_from_launch_url(raw: &str) -> Result<Option<AuthLanding>> {
    let url = Url::parse(raw).with_context(|| format!("Invalid launch URL: {}", raw))?;
    Ok(strip_auth_params(&url))
}

/// Catches the backend's post-login redirect on the frontend address.
pub struct CallbackListener {
    listener: TcpListener,
    base: Url,
}

impl CallbackListener {
    pub fn bind(frontend: &Url) -> Result<Self> {
        let host = frontend.host_str().unwrap_or("localhost");
        let port = frontend.port_or_known_default().unwrap_or(80);
        let listener = TcpListener::bind((host, port))
            .with_context(|| format!("Could not listen on {}:{}", host, port))?;
        Ok(Self {
            listener,
            base: frontend.clone(),
        })
    }

    pub fn local_port(&self) -> Option<u16> {
        self.listener.local_addr().ok().map(|a| a.port())
    }

    /// Serve redirects on a background thread until the receiver goes away.
    pub fn spawn(self, tx: UnboundedSender<Completion>) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || {
            for stream in self.listener.incoming() {
                let mut stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::warn!(error = %e, "callback listener accept failed");
                        continue;
                    }
                };

                let mut request_line = String::new();
                if BufReader::new(&stream).read_line(&mut request_line).is_err() {
                    continue;
                }

                // Format: GET /?auth=success&email=... HTTP/1.1
                let landing = request_line
                    .split_whitespace()
                    .nth(1)
                    .and_then(|path| self.base.join(path).ok())
                    .and_then(|url| strip_auth_params(&url));

                let (status, body) = if landing.is_some() {
                    ("200 OK", "Gmail connected. You can close this window and return to jobtrack.")
                } else {
                    ("404 Not Found", "Nothing to see here.")
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
                    status, body
                );
                stream.write_all(response.as_bytes()).ok();

                if let Some(landing) = landing {
                    tracing::info!(url = %landing.clean_url, "auth callback received");
                    if tx.send(Completion::AuthCallback { email: landing.email }).is_err() {
                        break;
                    }
                }
            }
        })
    }
}
