use crate::pagination::PostListState;
use crate::post::Article;
use gtmpl::{Template, Value};
use pulldown_cmark::escape::escape_href;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Responsible for templating and writing the index page and the post pages
/// to disk.
pub struct Writer<'a> {
    /// The template for post pages.
    pub posts_template: &'a Template,

    /// The template for the index page.
    pub index_template: &'a Template,

    /// The base URL for post pages. A post's page is located at
    /// `{posts_url}{uid}.html`.
    pub posts_url: &'a Url,

    /// The directory in which `index.html` is written.
    pub root_output_directory: &'a Path,

    /// The directory in which the post HTML files are written.
    pub posts_output_directory: &'a Path,

    /// The URL for the site's home page. This is made available to both post and
    /// index templates, typically as the destination for the site-header link.
    pub home_page: &'a Url,

    /// The URL for the static assets. This is made available to both post and
    /// index templates, typically for the theme's stylesheet.
    pub static_url: &'a Url,

    /// The site title, made available to both templates as `site_title`.
    pub site_title: &'a str,
}

impl Writer<'_> {
    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let mut value = page.to_value();
        if let Value::Object(obj) = &mut value {
            obj.insert(
                "home_page".to_owned(),
                Value::String(self.home_page.to_string()),
            );
            obj.insert(
                "static_url".to_owned(),
                Value::String(self.static_url.to_string()),
            );
            obj.insert(
                "site_title".to_owned(),
                Value::String(self.site_title.to_owned()),
            );
        }
        let context =
            gtmpl::Context::from(value).map_err(|e| Error::Template(e.to_string()))?;
        page.template
            .execute(&mut std::fs::File::create(&page.file_path)?, &context)
            .map_err(|e| Error::Template(e.to_string()))?;
        tracing::debug!(path = %page.file_path.display(), "wrote page");
        Ok(())
    }

    /// Writes the index page for `listing` (the first page of the listing,
    /// along with the cursor to the rest of it) and one page per article.
    /// Articles link to their neighbors in the order given.
    pub fn write_site(&self, listing: &PostListState, articles: &[Article]) -> Result<()> {
        std::fs::create_dir_all(self.root_output_directory)?;
        self.write_page(&self.index_page(listing))?;

        std::fs::create_dir_all(self.posts_output_directory)?;
        for page in self.post_pages(articles)? {
            self.write_page(&page)?;
        }
        tracing::info!(
            posts = articles.len(),
            directory = %self.root_output_directory.display(),
            "wrote site"
        );
        Ok(())
    }

    fn index_page(&self, listing: &PostListState) -> Page<'_> {
        Page {
            item: Value::Array(
                listing
                    .posts
                    .iter()
                    .map(|p| p.to_value(self.posts_url))
                    .collect(),
            ),
            file_path: self.root_output_directory.join("index.html"),
            prev: None,
            next: None,
            next_page: listing.cursor.next_page_url.as_deref().map(|url| {
                let mut escaped = String::with_capacity(url.len());
                let _ = escape_href(&mut escaped, url);
                escaped
            }),
            template: self.index_template,
        }
    }

    /// Creates the post [`Page`]s, failing if any article lacks a uid that
    /// can be used as a file name.
    fn post_pages(&self, articles: &[Article]) -> Result<Vec<Page<'_>>> {
        let urls = articles
            .iter()
            .map(|article| -> Result<(&str, Url)> {
                let uid = file_stem(article.post.id.as_deref())?;
                Ok((uid, self.posts_url.join(&format!("{}.html", uid))?))
            })
            .collect::<Result<Vec<(&str, Url)>>>()?;

        Ok(articles
            .iter()
            .enumerate()
            .map(|(i, article)| Page {
                item: article.to_value(self.posts_url),
                file_path: self
                    .posts_output_directory
                    .join(format!("{}.html", urls[i].0)),
                prev: match i < 1 {
                    true => None,
                    false => Some(urls[i - 1].1.clone()),
                },
                next: match i + 1 >= urls.len() {
                    true => None,
                    false => Some(urls[i + 1].1.clone()),
                },
                next_page: None,
                template: self.posts_template,
            })
            .collect())
    }
}

// A uid becomes a file name, so it must not be able to escape the posts
// directory.
fn file_stem(uid: Option<&str>) -> Result<&str> {
    match uid {
        Some(uid)
            if !uid.is_empty()
                && !uid.starts_with('.')
                && !uid.contains(|c: char| c == '/' || c == '\\') =>
        {
            Ok(uid)
        }
        other => Err(Error::InvalidUid(other.unwrap_or_default().to_owned())),
    }
}

/// An object representing an output HTML file. A [`Page`] can be converted to a
/// [`Value`] and thus rendered in a template via [`Page::to_value`].
struct Page<'a> {
    /// The main item for the page.
    item: Value,

    /// The target location on disk for the output file.
    file_path: PathBuf,

    /// The URL for the previous page, if any.
    prev: Option<Url>,

    /// The URL for the next page, if any.
    next: Option<Url>,

    /// The content API URL of the next listing page, if any, href-escaped.
    /// Themes hand this to client-side code implementing "load more".
    next_page: Option<String>,

    /// The template with which the page will be rendered.
    template: &'a Template,
}

impl Page<'_> {
    /// Converts a [`Page`] into a [`Value`]. The result is a [`Value::Object`]
    /// with fields `item`, `prev`, `next`, `next_page`, and `has_more`.
    fn to_value(&self) -> Value {
        let option_to_value = |opt: Option<String>| match opt {
            Some(s) => Value::String(s),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("item".to_owned(), self.item.clone());
        m.insert(
            "prev".to_owned(),
            option_to_value(self.prev.as_ref().map(Url::to_string)),
        );
        m.insert(
            "next".to_owned(),
            option_to_value(self.next.as_ref().map(Url::to_string)),
        );
        m.insert("next_page".to_owned(), option_to_value(self.next_page.clone()));
        m.insert("has_more".to_owned(), Value::Bool(self.next_page.is_some()));
        Value::Object(m)
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error during templating.
    #[error("{0}")]
    Template(String),

    /// Returned when a post's uid is missing or can't be used as a file name.
    #[error("invalid post uid `{0}`")]
    InvalidUid(String),

    /// Returned when a post URL can't be built.
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),

    /// An error writing the output files.
    #[error(transparent)]
    Io(#[from] io::Error),
}
