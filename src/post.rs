//! Defines the normalized [`PostSummary`], [`Post`], and [`Article`] types and
//! their conversion into template [`Value`]s. Fields which the content API may
//! omit are kept as [`Option`]s and render as empty strings.
//!
//! Templates don't escape their output, so every string taken from the content
//! API is HTML-escaped (or href-escaped, for URLs) as it is converted.

use crate::richtext::{self, Block};
use chrono::{DateTime, FixedOffset};
use gtmpl::Value;
use pulldown_cmark::escape::{escape_href, escape_html};
use std::collections::HashMap;
use url::Url;

/// A post as it appears in the listing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostSummary {
    /// The document's uid, which doubles as its slug.
    pub id: Option<String>,

    /// The first publication timestamp exactly as the API reported it.
    pub published_at: Option<String>,

    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
}

/// A post's banner image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Banner {
    pub url: Option<String>,
}

/// One section of a post body: a heading followed by rich text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    pub heading: Option<String>,
    pub body: Option<Vec<Block>>,
}

/// A post with its full content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Post {
    pub id: Option<String>,
    pub published_at: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub banner: Option<Banner>,
    pub content: Option<Vec<Section>>,
}

impl Post {
    /// The listing fields of the post.
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            id: self.id.clone(),
            published_at: self.published_at.clone(),
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
        }
    }

    /// The post's sections, or an empty slice if the API omitted them.
    pub fn sections(&self) -> &[Section] {
        self.content.as_deref().unwrap_or_default()
    }
}

/// A [`Post`] paired with its estimated reading time. This is what gets handed
/// to the post template.
#[derive(Clone, Debug, PartialEq)]
pub struct Article {
    pub post: Post,

    /// Estimated reading time in whole minutes.
    pub reading_time: u32,
}

impl PostSummary {
    /// Converts the summary into a [`Value`] for the index template. The
    /// resulting object has `id`, `url`, `title`, `subtitle`, `author`, `date`,
    /// and `published_at` fields.
    pub fn to_value(&self, posts_url: &Url) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("id".to_owned(), text(&self.id));
        m.insert("url".to_owned(), post_url(posts_url, self.id.as_deref()));
        m.insert("title".to_owned(), text(&self.title));
        m.insert("subtitle".to_owned(), text(&self.subtitle));
        m.insert("author".to_owned(), text(&self.author));
        m.insert(
            "date".to_owned(),
            html(&display_date(self.published_at.as_deref())),
        );
        m.insert("published_at".to_owned(), text(&self.published_at));
        Value::Object(m)
    }
}

impl Article {
    /// Converts the article into a [`Value`] for the post template. Section
    /// bodies are rendered to HTML and the date is lowercased.
    pub fn to_value(&self, posts_url: &Url) -> Value {
        let post = &self.post;
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("id".to_owned(), text(&post.id));
        m.insert("url".to_owned(), post_url(posts_url, post.id.as_deref()));
        m.insert("title".to_owned(), text(&post.title));
        m.insert("subtitle".to_owned(), text(&post.subtitle));
        m.insert("author".to_owned(), text(&post.author));
        m.insert(
            "date".to_owned(),
            html(&display_date(post.published_at.as_deref()).to_lowercase()),
        );
        m.insert(
            "banner".to_owned(),
            href(
                post.banner
                    .as_ref()
                    .and_then(|b| b.url.as_deref())
                    .unwrap_or_default(),
            ),
        );
        m.insert("reading_time".to_owned(), Value::from(self.reading_time));
        m.insert(
            "sections".to_owned(),
            Value::Array(
                post.sections()
                    .iter()
                    .map(|section| {
                        let mut s: HashMap<String, Value> = HashMap::new();
                        s.insert("heading".to_owned(), text(&section.heading));
                        s.insert(
                            "body".to_owned(),
                            Value::String(richtext::as_html(
                                section.body.as_deref().unwrap_or_default(),
                            )),
                        );
                        Value::Object(s)
                    })
                    .collect(),
            ),
        );
        Value::Object(m)
    }
}

/// Formats a publication timestamp as e.g. `25 Mar 2021`. Timestamps which
/// can't be parsed are returned verbatim; absent ones become empty strings.
pub fn display_date(published_at: Option<&str>) -> String {
    match published_at {
        None => String::new(),
        Some(raw) => match parse_timestamp(raw) {
            Some(date) => date.format("%d %b %Y").to_string(),
            None => raw.to_owned(),
        },
    }
}

// The API reports offsets both as `+00:00` and `+0000`, and only the former is
// valid RFC 3339.
fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
}

fn text(field: &Option<String>) -> Value {
    html(field.as_deref().unwrap_or_default())
}

// Writing into a `String` can't fail.
fn html(s: &str) -> Value {
    let mut escaped = String::with_capacity(s.len());
    let _ = escape_html(&mut escaped, s);
    Value::String(escaped)
}

fn href(s: &str) -> Value {
    let mut escaped = String::with_capacity(s.len());
    let _ = escape_href(&mut escaped, s);
    Value::String(escaped)
}

fn post_url(posts_url: &Url, id: Option<&str>) -> Value {
    match id.and_then(|id| posts_url.join(&format!("{}.html", id)).ok()) {
        Some(url) => href(url.as_str()),
        None => Value::String(String::new()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn field<'a>(value: &'a Value, key: &str) -> &'a Value {
        match value {
            Value::Object(m) => &m[key],
            _ => panic!("wanted an object; found {}", value),
        }
    }

    fn string<'a>(value: &'a Value, key: &str) -> &'a str {
        match field(value, key) {
            Value::String(s) => s,
            other => panic!("wanted a string for `{}`; found {}", key, other),
        }
    }

    #[test]
    fn test_display_date_with_compact_offset() {
        assert_eq!(
            "25 Mar 2021",
            display_date(Some("2021-03-25T19:25:28+0000"))
        );
    }

    #[test]
    fn test_display_date_rfc3339() {
        assert_eq!("05 Jan 2022", display_date(Some("2022-01-05T10:00:00Z")));
    }

    #[test]
    fn test_display_date_unparseable_is_verbatim() {
        assert_eq!("yesterday", display_date(Some("yesterday")));
        assert_eq!("", display_date(None));
    }

    #[test]
    fn test_summary_value_missing_fields_render_empty() -> Result<(), url::ParseError> {
        let posts_url = Url::parse("https://example.org/post/")?;
        let summary = PostSummary {
            id: Some(String::from("hello")),
            title: Some(String::from("Hello")),
            ..PostSummary::default()
        };
        let value = summary.to_value(&posts_url);
        assert_eq!(
            "https://example.org/post/hello.html",
            string(&value, "url")
        );
        assert_eq!("", string(&value, "author"));
        assert_eq!("", string(&value, "date"));
        Ok(())
    }

    #[test]
    fn test_article_value() -> Result<(), url::ParseError> {
        let posts_url = Url::parse("https://example.org/post/")?;
        let article = Article {
            post: Post {
                id: Some(String::from("hello")),
                published_at: Some(String::from("2021-03-25T19:25:28+0000")),
                banner: Some(Banner {
                    url: Some(String::from("https://images.example.org/b.png")),
                }),
                content: Some(vec![Section {
                    heading: Some(String::from("Intro")),
                    body: Some(vec![Block {
                        kind: String::from("paragraph"),
                        text: String::from("Hi"),
                        ..Block::default()
                    }]),
                }]),
                ..Post::default()
            },
            reading_time: 3,
        };

        let value = article.to_value(&posts_url);
        assert_eq!("25 mar 2021", string(&value, "date"));
        assert_eq!("3", field(&value, "reading_time").to_string());
        match field(&value, "sections") {
            Value::Array(sections) => {
                assert_eq!(1, sections.len());
                assert_eq!("<p>Hi</p>", string(&sections[0], "body"));
            }
            other => panic!("wanted an array; found {}", other),
        }
        Ok(())
    }

    #[test]
    fn test_values_escape_content() -> Result<(), url::ParseError> {
        let posts_url = Url::parse("https://example.org/post/")?;
        let post = Post {
            id: Some(String::from("a&b")),
            published_at: Some(String::from("<soon>")),
            title: Some(String::from("<script>x</script>")),
            subtitle: Some(String::from("\"quoted\"")),
            author: Some(String::from("Tom & Jerry")),
            banner: Some(Banner {
                url: Some(String::from("https://images.example.org/b.png?w=1&h=2")),
            }),
            content: Some(vec![Section {
                heading: Some(String::from("<h1>")),
                body: None,
            }]),
        };

        let summary = post.summary().to_value(&posts_url);
        assert_eq!("&lt;script&gt;x&lt;/script&gt;", string(&summary, "title"));
        assert_eq!("&quot;quoted&quot;", string(&summary, "subtitle"));
        assert_eq!("Tom &amp; Jerry", string(&summary, "author"));
        assert_eq!("a&amp;b", string(&summary, "id"));
        assert_eq!("&lt;soon&gt;", string(&summary, "date"));
        assert_eq!(
            "https://example.org/post/a&amp;b.html",
            string(&summary, "url")
        );

        let article = Article {
            post,
            reading_time: 0,
        }
        .to_value(&posts_url);
        assert_eq!("&lt;script&gt;x&lt;/script&gt;", string(&article, "title"));
        assert_eq!(
            "https://images.example.org/b.png?w=1&amp;h=2",
            string(&article, "banner")
        );
        match field(&article, "sections") {
            Value::Array(sections) => assert_eq!("&lt;h1&gt;", string(&sections[0], "heading")),
            other => panic!("wanted an array; found {}", other),
        }
        Ok(())
    }
}
