//! Public channel preview reader.
//!
//! Fetches `<base_url><id>` and turns each post container on the page into a
//! [`Message`]. Posts that lack their text container or time element are
//! skipped (logged and counted), the rest of the page is still used.

use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{FetchError, MalformedPost};
use crate::ingest::SourceReader;
use crate::message::{Message, Source};

pub const DEFAULT_BASE_URL: &str = "https://t.me/s/";

pub struct ChannelReader {
    source: Source,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl ChannelReader {
    /// Reader that polls `base_url` followed by the source id.
    pub fn from_url(source: Source, base_url: &str, client: reqwest::Client) -> Self {
        let url = format!("{base_url}{}", source.id);
        Self {
            source,
            mode: Mode::Http { url, client },
        }
    }

    /// Reader that always "fetches" the given page.
    pub fn from_fixture_str(source: Source, html: &str) -> Self {
        Self {
            source,
            mode: Mode::Fixture(html.to_string()),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match &self.mode {
            Mode::Fixture(_) => None,
            Mode::Http { url, .. } => Some(url),
        }
    }
}

#[async_trait::async_trait]
impl SourceReader for ChannelReader {
    async fn fetch(&self) -> Result<Vec<Message>, FetchError> {
        match &self.mode {
            Mode::Fixture(html) => Ok(parse_page(html, &self.source)),
            Mode::Http { url, client } => {
                let resp = client.get(url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }
                let body = resp.text().await?;
                Ok(parse_page(&body, &self.source))
            }
        }
    }

    fn source(&self) -> &Source {
        &self.source
    }
}

struct Selectors {
    post: Selector,
    text: Selector,
    photo: Selector,
    author: Selector,
    avatar: Selector,
    time: Selector,
}

impl Selectors {
    fn new() -> Self {
        let parse = |s: &str| Selector::parse(s).expect("static selector");
        Self {
            post: parse("div.tgme_widget_message_wrap"),
            text: parse("div.tgme_widget_message_text"),
            photo: parse("a.tgme_widget_message_photo_wrap"),
            author: parse("div.tgme_widget_message_author"),
            avatar: parse("div.tgme_widget_message_user img"),
            time: parse("a.tgme_widget_message_date time"),
        }
    }
}

/// Parse a channel page into messages, in document order.
pub fn parse_page(html: &str, source: &Source) -> Vec<Message> {
    let t0 = std::time::Instant::now();
    let document = Html::parse_document(html);
    let sel = Selectors::new();

    let posts: Vec<ElementRef> = document.select(&sel.post).collect();
    if posts.is_empty() {
        tracing::warn!(
            source = %source.id,
            "no post containers on page; the channel may be empty or the layout changed"
        );
    }

    let mut out = Vec::with_capacity(posts.len());
    for (index, post) in posts.into_iter().enumerate() {
        match parse_post(post, &sel, source) {
            Ok(msg) => out.push(msg),
            Err(reason) => {
                tracing::warn!(source = %source.id, index, %reason, "skipping malformed post");
                counter!("relay_malformed_posts_total", "source" => source.id.clone()).increment(1);
            }
        }
    }

    histogram!("relay_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    tracing::debug!(source = %source.id, count = out.len(), "parsed channel page");
    out
}

fn parse_post(post: ElementRef, sel: &Selectors, source: &Source) -> Result<Message, MalformedPost> {
    let text_el = post.select(&sel.text).next().ok_or(MalformedPost::MissingText)?;
    let time_el = post.select(&sel.time).next().ok_or(MalformedPost::MissingTime)?;

    let datetime = time_el
        .value()
        .attr("datetime")
        .ok_or(MalformedPost::MissingTime)?;
    let timestamp = chrono::DateTime::parse_from_rfc3339(datetime)
        .map_err(|_| MalformedPost::BadTimestamp(datetime.to_string()))?
        .timestamp();

    let photo = post
        .select(&sel.photo)
        .next()
        .and_then(|el| el.value().attr("style"))
        .and_then(background_image_url);

    let author = post
        .select(&sel.author)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());

    let profile_picture = post
        .select(&sel.avatar)
        .next()
        .and_then(|el| el.value().attr("src"))
        .map(str::to_string);

    Ok(Message {
        timestamp,
        text: render_text(text_el),
        photo,
        author,
        profile_picture,
        source_id: source.id.clone(),
        color: source.color,
    })
}

/// Flatten post markup to plain text: `<br>` becomes a newline and links
/// become `[text](href)` in place.
pub fn render_text(el: ElementRef) -> String {
    let mut out = String::new();
    render_into(el, &mut out);
    out
}

fn render_into(el: ElementRef, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                match child_el.value().name() {
                    "br" => out.push('\n'),
                    "a" => {
                        let inner = render_text(child_el);
                        match child_el.value().attr("href") {
                            Some(href) => {
                                out.push('[');
                                out.push_str(&inner);
                                out.push_str("](");
                                out.push_str(href);
                                out.push(')');
                            }
                            None => out.push_str(&inner),
                        }
                    }
                    _ => render_into(child_el, out),
                }
            }
            _ => {}
        }
    }
}

/// URL inside `background-image:url(...)` of an inline style, quotes stripped.
pub fn background_image_url(style: &str) -> Option<String> {
    static RE_BG: OnceCell<Regex> = OnceCell::new();
    let re = RE_BG.get_or_init(|| {
        Regex::new(r#"(?i)background-image\s*:\s*url\(\s*['"]?([^'")]+?)['"]?\s*\)"#)
            .expect("static regex")
    });
    re.captures(style)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
