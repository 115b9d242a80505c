use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ApiOutcome, PechaApi, classify_response};
use crate::config::ApiConfig;
use crate::links::LinkRecord;
use crate::model::{CategoryPayload, IndexPayload, TermPayload, TextVersion};

const USER_AGENT: &str = concat!("pecha-uploader/", env!("CARGO_PKG_VERSION"));

/// `PechaApi` over the site's form-encoded HTTP endpoints.
pub struct HttpPechaApi {
    client: Client,
    config: ApiConfig,
}

impl HttpPechaApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .with_context(|| format!("invalid base url: {}", self.config.base_url))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| anyhow!("base url cannot carry a path: {}", self.config.base_url))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn post_json<T: Serialize + ?Sized>(
        &self,
        what: &str,
        url: Url,
        payload: &T,
        extra: &[(&str, &str)],
    ) -> Result<ApiOutcome> {
        let json = serde_json::to_string(payload)
            .with_context(|| format!("{what}: failed to serialize payload"))?;
        let mut form = vec![("json", json.as_str()), ("apikey", self.config.api_key.as_str())];
        form.extend_from_slice(extra);

        let body = self.send(what, || self.client.post(url.clone()).form(&form))?;
        classify_response(&body).with_context(|| format!("{what} rejected"))
    }

    fn delete(&self, what: &str, url: Url) -> Result<()> {
        let form = [("apikey", self.config.api_key.as_str())];
        self.send(what, || {
            self.client
                .delete(url.clone())
                .header("apiKey", self.config.api_key.as_str())
                .form(&form)
        })?;
        Ok(())
    }

    fn get_json(&self, what: &str, url: Url) -> Result<Value> {
        let body = self.send(what, || self.client.get(url.clone()))?;
        serde_json::from_str(&body).with_context(|| format!("{what}: reply is not JSON"))
    }

    // Connection failures, timeouts and 5xx replies are retried; everything
    // else is returned to the caller on the first attempt.
    fn send(&self, what: &str, build: impl Fn() -> RequestBuilder) -> Result<String> {
        let mut attempt = 1;
        loop {
            let retry = match build().send() {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .with_context(|| format!("{what}: failed to read response body"))?;
                    debug!(what, status = status.as_u16(), "api response");

                    if status.is_success() {
                        return Ok(body);
                    }
                    if !status.is_server_error() || attempt >= self.config.max_attempts {
                        return match classify_response(&body) {
                            Ok(ApiOutcome::AlreadyExists) => Ok(body),
                            Ok(ApiOutcome::Created) => {
                                bail!("{what}: HTTP {status}: {}", body.trim())
                            }
                            Err(err) => Err(err.context(format!("{what}: HTTP {status}"))),
                        };
                    }
                    format!("HTTP {status}")
                }
                Err(err) if (err.is_timeout() || err.is_connect())
                    && attempt < self.config.max_attempts =>
                {
                    err.to_string()
                }
                Err(err) => return Err(err).with_context(|| format!("{what}: request failed")),
            };

            warn!(what, attempt, reason = %retry, "retrying api request");
            thread::sleep(self.config.retry_backoff * attempt);
            attempt += 1;
        }
    }
}

impl PechaApi for HttpPechaApi {
    fn post_term(&self, term: &TermPayload) -> Result<ApiOutcome> {
        let url = self.endpoint(&["api", "terms", &term.name])?;
        self.post_json("term", url, term, &[("update", "True")])
    }

    fn post_category(&self, category: &CategoryPayload) -> Result<ApiOutcome> {
        let url = self.endpoint(&["api", "category"])?;
        self.post_json("category", url, category, &[])
    }

    fn post_index(&self, index: &IndexPayload) -> Result<ApiOutcome> {
        let url = self.endpoint(&["api", "v2", "raw", "index", &index.title.replace(' ', "_")])?;
        self.post_json("index", url, index, &[])
    }

    fn post_text(&self, text_ref: &str, version: &TextVersion) -> Result<ApiOutcome> {
        let mut url = self.endpoint(&["api", "texts", text_ref])?;
        url.set_query(Some("count_after=1"));
        self.post_json("text", url, version, &[])
    }

    fn post_links(&self, links: &[LinkRecord]) -> Result<ApiOutcome> {
        let url = self.endpoint(&["api", "links", ""])?;
        self.post_json("links", url, links, &[])
    }

    fn remove_term(&self, name: &str) -> Result<()> {
        let url = self.endpoint(&["api", "terms", name])?;
        self.delete("term delete", url)
    }

    fn remove_category(&self, path: &[String]) -> Result<()> {
        let mut segments = vec!["api", "category"];
        segments.extend(path.iter().map(String::as_str));
        let url = self.endpoint(&segments)?;
        self.delete("category delete", url)
    }

    fn remove_index(&self, title: &str) -> Result<()> {
        let url = self.endpoint(&["api", "index", title])?;
        self.delete("index delete", url)
    }

    fn remove_text(&self, title: &str) -> Result<()> {
        let url = self.endpoint(&["api", "texts", title])?;
        self.delete("text delete", url)
    }

    fn remove_links(&self, title: &str) -> Result<()> {
        let url = self.endpoint(&["api", "links", &title.replace(' ', "_")])?;
        self.delete("links delete", url)
    }

    fn get_text(&self, text_ref: &str) -> Result<Value> {
        let mut url = self.endpoint(&["api", "texts", text_ref])?;
        url.set_query(Some("pad=0"));
        self.get_json("text fetch", url)
    }

    fn get_index(&self, title: &str) -> Result<Value> {
        let mut url = self.endpoint(&["api", "v2", "raw", "index", &title.replace(' ', "_")])?;
        url.set_query(Some("with_content_counts=1"));
        self.get_json("index fetch", url)
    }

    fn get_links(&self, reference: &str, with_text: bool) -> Result<Value> {
        let mut url = self.endpoint(&["api", "links", &reference.replace(' ', "_")])?;
        url.query_pairs_mut()
            .append_pair("with_text", if with_text { "1" } else { "0" });
        self.get_json("links fetch", url)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::JoinHandle;
    use std::time::Duration;

    use super::*;
    use crate::config::Destination;
    use crate::tree::bilingual_titles;

    fn api(base_url: &str) -> HttpPechaApi {
        api_with_attempts(base_url, 1)
    }

    fn api_with_attempts(base_url: &str, max_attempts: u32) -> HttpPechaApi {
        let mut config = ApiConfig::new(
            Destination::Local,
            Some(base_url.to_string()),
            Some("secret".to_string()),
            max_attempts,
        )
        .expect("config should build");
        config.retry_backoff = Duration::ZERO;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .no_proxy()
            .build()
            .expect("client should build");
        HttpPechaApi { client, config }
    }

    fn term() -> TermPayload {
        TermPayload {
            name: "Madhyamaka".to_string(),
            titles: bilingual_titles("Madhyamaka", "དབུ་མ།"),
        }
    }

    /// Answers one connection per canned reply, in order, and counts requests.
    fn serve(replies: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let base_url = format!("http://{}/", listener.local_addr().expect("local addr"));
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            for (status, body) in replies {
                let (mut stream, _) = listener.accept().expect("connection should arrive");
                read_request(&mut stream);
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = format!(
                    "HTTP/1.1 {status} Reply\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream
                    .write_all(reply.as_bytes())
                    .expect("reply should be written");
            }
        });
        (base_url, requests, handle)
    }

    fn read_request(stream: &mut std::net::TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header line");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().expect("numeric length");
                }
            }
        }
        let mut body = vec![0_u8; content_length];
        reader.read_exact(&mut body).expect("request body");
    }

    #[test]
    fn endpoint_percent_encodes_titles() {
        let api = api("https://staging.pecha.org");
        let url = api
            .endpoint(&["api", "texts", "Book, Ch1"])
            .expect("url should build");
        assert_eq!(url.as_str(), "https://staging.pecha.org/api/texts/Book,%20Ch1");

        let url = api
            .endpoint(&["api", "terms", "དབུ་མ།"])
            .expect("url should build");
        assert!(url.as_str().starts_with("https://staging.pecha.org/api/terms/%E0%BD"));
    }

    #[test]
    fn endpoint_keeps_base_path_and_trailing_slash() {
        let api = api("http://127.0.0.1:8000/site/");
        let url = api.endpoint(&["api", "links", ""]).expect("url should build");
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/site/api/links/");
    }

    #[test]
    fn send_retries_server_errors_until_success() {
        let (base_url, requests, server) =
            serve(vec![(503, r#"{"error": "busy"}"#), (200, r#"{"status": "ok"}"#)]);
        let api = api_with_attempts(&base_url, 3);

        let outcome = api.post_term(&term()).expect("second attempt succeeds");
        server.join().expect("server thread");
        assert_eq!(outcome, ApiOutcome::Created);
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn send_gives_up_after_max_attempts() {
        let (base_url, requests, server) =
            serve(vec![(502, "bad gateway"), (502, "bad gateway")]);
        let api = api_with_attempts(&base_url, 2);

        let err = api.post_term(&term()).expect_err("every attempt fails");
        server.join().expect("server thread");
        assert!(format!("{err:#}").contains("502"));
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn already_exists_reply_is_not_retried_or_fatal() {
        let (base_url, requests, server) =
            serve(vec![(400, r#"{"error": "Term Madhyamaka already exists"}"#)]);
        let api = api_with_attempts(&base_url, 3);

        let outcome = api.post_term(&term()).expect("duplicate is accepted");
        server.join().expect("server thread");
        assert_eq!(outcome, ApiOutcome::AlreadyExists);
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_text_parses_the_json_reply() {
        let (base_url, _, server) = serve(vec![(200, r#"{"versions": [{"language": "en"}]}"#)]);
        let api = api(&base_url);

        let text = api.get_text("Book, Ch1").expect("fetch succeeds");
        server.join().expect("server thread");
        assert_eq!(crate::api::version_count(&text), 1);
    }
}
