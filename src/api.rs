//! The boundary to the headless content API. Defines the raw, loosely-typed
//! document shapes the API returns ([`RawDocument`], [`RawPage`]), the
//! [`Query`] builder, the [`ContentApi`] trait the rest of the crate depends
//! on, and [`Client`], the HTTP implementation of that trait.
//!
//! Every field of a raw document is optional. Absent fields are not validated
//! here; they flow through normalization as `None`.

use crate::richtext::Block;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// A document as returned by the content API.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawDocument {
    #[serde(default)]
    pub uid: Option<String>,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub data: RawData,
}

/// The custom fields of a post document. Listing queries only select
/// `title`, `subtitle`, and `author`; `banner` and `content` are present when
/// the full document is fetched.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawData {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub subtitle: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub banner: Option<RawBanner>,

    #[serde(default)]
    pub content: Option<Vec<RawSection>>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawBanner {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawSection {
    #[serde(default)]
    pub heading: Option<String>,

    #[serde(default)]
    pub body: Option<Vec<Block>>,
}

/// One page of query results. `next_page` is an opaque URL for the following
/// page, or `None` when the results are exhausted.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawPage {
    #[serde(default)]
    pub next_page: Option<String>,

    #[serde(default)]
    pub results: Vec<RawDocument>,
}

/// A query predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Matches documents whose `path` equals `value`, e.g.
    /// `[at(document.type, "post")]`.
    At { path: String, value: String },
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Predicate::At { path, value } => {
                write!(f, "[at({}, {:?})]", path, value)
            }
        }
    }
}

/// A search over the content API.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub predicates: Vec<Predicate>,

    /// Fully-qualified field names to select (e.g. `post.title`). Empty
    /// selects every field.
    pub fetch: Vec<String>,

    pub page_size: usize,

    /// An ordering expression such as `[document.first_publication_date desc]`.
    pub orderings: Option<String>,
}

impl Query {
    /// A query for every document of `document_type`.
    pub fn documents_of_type(document_type: &str) -> Query {
        Query {
            predicates: vec![Predicate::At {
                path: String::from("document.type"),
                value: document_type.to_owned(),
            }],
            fetch: Vec::new(),
            page_size: 20,
            orderings: None,
        }
    }

    /// Selects `fields` of `document_type`.
    pub fn fetch<'a>(
        mut self,
        document_type: &str,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> Query {
        self.fetch = fields
            .into_iter()
            .map(|field| format!("{}.{}", document_type, field))
            .collect();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Query {
        self.page_size = page_size;
        self
    }

    pub fn orderings(mut self, orderings: &str) -> Query {
        self.orderings = Some(orderings.to_owned());
        self
    }

    /// The value of the `q` parameter.
    fn q(&self) -> String {
        let predicates: Vec<String> =
            self.predicates.iter().map(|p| p.to_string()).collect();
        format!("[{}]", predicates.join(""))
    }
}

/// The operations the site builder needs from a content API.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Runs `query` and returns its first page of results.
    async fn query(&self, query: &Query) -> Result<RawPage>;

    /// Follows a `next_page` URL returned by a previous page.
    async fn fetch_page(&self, url: &str) -> Result<RawPage>;

    /// Looks up the full document of `document_type` whose uid is `uid`.
    async fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
    ) -> Result<Option<RawDocument>>;
}

/// Settings for building a [`Client`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// The API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`.
    pub endpoint: Url,
    pub access_token: Option<String>,
    pub user_agent: Option<String>,

    /// Applied to every request.
    pub timeout: Duration,
}

impl ClientConfig {
    fn to_builder(&self) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder();
        builder = match &self.user_agent {
            Some(user_agent) => builder.user_agent(user_agent),
            None => builder.user_agent(USER_AGENT),
        };
        builder.timeout(self.timeout)
    }

    pub fn build(&self) -> Result<Client> {
        let client = self.to_builder().build().map_err(Error::Client)?;
        Ok(Client {
            endpoint: self.endpoint.clone(),
            access_token: self.access_token.clone(),
            client,
            master_ref: OnceCell::new(),
        })
    }
}

const USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// An HTTP [`ContentApi`]. Searches are issued against the repository's
/// master ref, which is looked up once and then reused.
pub struct Client {
    endpoint: Url,
    access_token: Option<String>,
    client: reqwest::Client,
    master_ref: OnceCell<String>,
}

#[derive(Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,

    #[serde(default, rename = "isMasterRef")]
    is_master_ref: bool,
}

impl Client {
    async fn master_ref(&self) -> Result<&str> {
        let master_ref = self
            .master_ref
            .get_or_try_init(|| async {
                let mut url = self.endpoint.clone();
                if let Some(token) = &self.access_token {
                    url.query_pairs_mut().append_pair("access_token", token);
                }
                let info: ApiInfo = self.get_json(url).await?;
                info.refs
                    .into_iter()
                    .find(|r| r.is_master_ref)
                    .map(|r| r.reference)
                    .ok_or_else(|| Error::NoMasterRef(self.endpoint.clone()))
            })
            .await?;
        Ok(master_ref.as_str())
    }

    async fn search(&self, query: &Query) -> Result<RawPage> {
        let master_ref = self.master_ref().await?;
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| Error::CannotBeABase(self.endpoint.clone()))?
            .pop_if_empty()
            .push("documents")
            .push("search");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", master_ref);
            pairs.append_pair("q", &query.q());
            if !query.fetch.is_empty() {
                pairs.append_pair("fetch", &query.fetch.join(","));
            }
            pairs.append_pair("pageSize", &query.page_size.to_string());
            if let Some(orderings) = &query.orderings {
                pairs.append_pair("orderings", orderings);
            }
            if let Some(token) = &self.access_token {
                pairs.append_pair("access_token", token);
            }
        }
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!(%url, "requesting content");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| Error::Http {
                url: url.to_string(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status(), url.to_string()));
        }
        resp.json().await.map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ContentApi for Client {
    async fn query(&self, query: &Query) -> Result<RawPage> {
        self.search(query).await
    }

    async fn fetch_page(&self, url: &str) -> Result<RawPage> {
        self.get_json(Url::parse(url)?).await
    }

    async fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
    ) -> Result<Option<RawDocument>> {
        let query = Query {
            predicates: vec![Predicate::At {
                path: format!("my.{}.uid", document_type),
                value: uid.to_owned(),
            }],
            fetch: Vec::new(),
            page_size: 1,
            orderings: None,
        };
        Ok(self.search(&query).await?.results.into_iter().next())
    }
}

/// The result of a content API operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed content API operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the HTTP client can't be constructed.
    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Returned when a request fails to send or its body can't be decoded.
    #[error("requesting `{url}`: {source}")]
    Http { url: String, source: reqwest::Error },

    /// Returned when the API answers with a non-success status.
    #[error("HTTP status error {0} (url: {1})")]
    Status(StatusCode, String),

    /// Returned when a `next_page` URL isn't a valid URL.
    #[error("invalid page URL: {0}")]
    Url(#[from] url::ParseError),

    /// Returned when the configured endpoint can't have a path appended.
    #[error("content API endpoint `{0}` cannot be used as a base URL")]
    CannotBeABase(Url),

    /// Returned when the API root lists no master ref.
    #[error("content API `{0}` has no master ref")]
    NoMasterRef(Url),
}

#[cfg(test)]
mod test {
    use super::*;

    const SEARCH_PAGE: &str = include_str!("../testdata/api/search.json");

    #[test]
    fn test_decode_search_page() -> serde_json::Result<()> {
        let page: RawPage = serde_json::from_str(SEARCH_PAGE)?;
        assert_eq!(
            Some(concat!(
                "https://spacetraveling.cdn.prismic.io/api/v2/documents/search",
                "?ref=YF&page=2&pageSize=1",
            )),
            page.next_page.as_deref()
        );
        assert_eq!(1, page.results.len());
        let doc = &page.results[0];
        assert_eq!(Some("como-utilizar-hooks"), doc.uid.as_deref());
        assert_eq!(
            Some("2021-03-15T19:25:28+0000"),
            doc.first_publication_date.as_deref()
        );
        assert_eq!(Some("Como utilizar Hooks"), doc.data.title.as_deref());
        assert_eq!(None, doc.data.content);
        Ok(())
    }

    #[test]
    fn test_decode_missing_and_null_fields() -> serde_json::Result<()> {
        let page: RawPage = serde_json::from_str(
            r#"{"next_page":null,"results":[{"uid":null,"data":{"title":"Only a title"}}]}"#,
        )?;
        assert_eq!(None, page.next_page);
        let doc = &page.results[0];
        assert_eq!(None, doc.uid);
        assert_eq!(None, doc.first_publication_date);
        assert_eq!(Some("Only a title"), doc.data.title.as_deref());
        assert_eq!(None, doc.data.author);
        Ok(())
    }

    #[test]
    fn test_decode_wrong_type_is_an_error() {
        assert!(serde_json::from_str::<RawPage>(
            r#"{"results":[{"data":{"title":42}}]}"#
        )
        .is_err());
    }

    #[test]
    fn test_query_q_parameter() {
        let query = Query::documents_of_type("post")
            .fetch("post", vec!["title", "subtitle"])
            .page_size(1);
        assert_eq!(r#"[[at(document.type, "post")]]"#, query.q());
        assert_eq!(vec!["post.title", "post.subtitle"], query.fetch);
        assert_eq!(1, query.page_size);
    }
}
