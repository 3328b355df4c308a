//! RSS feed fetcher.
//!
//! One HTTP GET per call, decoded into a [`FeedDocument`]. Requests are
//! bounded by the client's connect and total timeouts and carry an identifying
//! User-Agent. Retry policy belongs to the caller.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;
use tracing::debug;

use crate::config::AggregatorConfig;
use crate::error::FetchError;
use crate::rss::types::{FeedDocument, FeedItem};
use crate::{GatorError, Result};

/// Anything that can turn a feed URL into a [`FeedDocument`].
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and decode the feed at `url`.
    async fn fetch(&self, url: &str) -> std::result::Result<FeedDocument, FetchError>;
}

/// HTTP feed fetcher.
pub struct RssFetcher {
    client: Client,
    max_feed_size: u64,
    allow_private_hosts: bool,
}

impl RssFetcher {
    /// Create a fetcher from the aggregator configuration.
    pub fn new(config: &AggregatorConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            allow_private_hosts: config.allow_private_hosts,
        })
    }
}

#[async_trait]
impl FeedSource for RssFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FeedDocument, FetchError> {
        let url = validate_url(url, self.allow_private_hosts)?;
        debug!("Fetching feed {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FetchError::TooLarge {
                    size: content_length,
                    max: self.max_feed_size,
                });
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() as u64 > self.max_feed_size {
            return Err(FetchError::TooLarge {
                size: bytes.len() as u64,
                max: self.max_feed_size,
            });
        }

        parse_document(&bytes)
    }
}

/// Validate a feed URL before fetching.
///
/// Only http and https are accepted. Unless `allow_private_hosts` is set,
/// loopback, private and link-local addresses and reserved hostnames are
/// rejected as well.
pub fn validate_url(
    url: &str,
    allow_private_hosts: bool,
) -> std::result::Result<url::Url, FetchError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| FetchError::InvalidUrl(format!("{url}: URL has no host")))?;

    if allow_private_hosts {
        return Ok(parsed);
    }

    match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(FetchError::InvalidUrl(format!("forbidden host: {domain}")));
            }
        }
        url::Host::Ipv4(ipv4) => {
            let ip = IpAddr::V4(ipv4);
            if is_private_ip(&ip) {
                return Err(FetchError::InvalidUrl(format!(
                    "private IP address not allowed: {ip}"
                )));
            }
        }
        url::Host::Ipv6(ipv6) => {
            let ip = IpAddr::V6(ipv6);
            if is_private_ip(&ip) {
                return Err(FetchError::InvalidUrl(format!(
                    "private IP address not allowed: {ip}"
                )));
            }
        }
    }

    Ok(parsed)
}

fn is_forbidden_hostname(host: &str) -> bool {
    const FORBIDDEN_SUFFIXES: [&str; 7] = [
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    let host = host.to_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                || ipv4.is_documentation()
                // Carrier-grade NAT: 100.64.0.0/10
                || (octets[0] == 100 && (64..=127).contains(&octets[1]))
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local: fc00::/7
                || (first & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (first & 0xffc0) == 0xfe80
        }
    }
}

/// Decode an RSS 2.0 document.
///
/// Reads `channel/{title,description,link}` and every `channel/item` with its
/// `title`, `description`, `link` and raw `pubDate`. Other elements are
/// ignored. Titles and descriptions are HTML-entity-unescaped after XML
/// unescaping, so double-encoded text such as `&amp;amp;` comes out as `&`.
pub fn parse_document(xml: &[u8]) -> std::result::Result<FeedDocument, FetchError> {
    let mut reader = Reader::from_reader(xml);

    let mut document = FeedDocument::default();
    let mut path: Vec<String> = Vec::new();
    let mut current_item: Option<FeedItem> = None;
    // Depth of the channel or item field being read. Only its own character
    // data is kept; text inside nested elements is skipped.
    let mut field_depth: Option<usize> = None;
    let mut text = String::new();
    let mut saw_channel = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let parent = path.last().map(String::as_str);
                let is_item = name == "item" && parent == Some("channel");
                let opens_field = !is_item
                    && field_depth.is_none()
                    && matches!(parent, Some("channel") | Some("item"));
                if is_item {
                    current_item = Some(FeedItem::default());
                }
                path.push(name);
                if opens_field {
                    field_depth = Some(path.len());
                    text.clear();
                }
            }
            Ok(Event::End(_)) => {
                let depth = path.len();
                let name = path.pop().unwrap_or_default();
                let parent = path.last().map(String::as_str);
                if field_depth == Some(depth) {
                    field_depth = None;
                    let value = text.trim();
                    match parent {
                        Some("channel") => set_channel_field(&mut document, &name, value),
                        Some("item") => {
                            if let Some(item) = current_item.as_mut() {
                                set_item_field(item, &name, value);
                            }
                        }
                        _ => {}
                    }
                    text.clear();
                } else {
                    match (parent, name.as_str()) {
                        (Some("channel"), "item") => {
                            if let Some(item) = current_item.take() {
                                document.items.push(item);
                            }
                        }
                        (_, "channel") => saw_channel = true,
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(e)) if field_depth == Some(path.len()) => match e.unescape() {
                Ok(chunk) => text.push_str(&chunk),
                // HTML entities such as &nbsp; are not XML; keep them for the HTML pass
                Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
            },
            Ok(Event::CData(e)) if field_depth == Some(path.len()) => {
                text.push_str(&String::from_utf8_lossy(&e))
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FetchError::Parse(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !path.is_empty() {
        return Err(FetchError::Parse(format!(
            "unexpected end of document inside <{}>",
            path.join("/")
        )));
    }
    if !saw_channel {
        return Err(FetchError::Parse("missing <channel> element".to_string()));
    }

    unescape_entities(&mut document);
    Ok(document)
}

fn set_channel_field(document: &mut FeedDocument, field: &str, value: &str) {
    match field {
        "title" => document.title = value.to_string(),
        "description" => document.description = value.to_string(),
        "link" => document.link = value.to_string(),
        _ => {}
    }
}

fn set_item_field(item: &mut FeedItem, field: &str, value: &str) {
    match field {
        "title" => item.title = value.to_string(),
        "description" => item.description = value.to_string(),
        "link" => item.link = value.to_string(),
        "pubDate" => item.pub_date = value.to_string(),
        _ => {}
    }
}

fn decode_html(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

fn unescape_entities(document: &mut FeedDocument) {
    document.title = decode_html(&document.title);
    document.description = decode_html(&document.description);
    for item in &mut document.items {
        item.title = decode_html(&item.title);
        item.description = decode_html(&item.description);
    }
}
