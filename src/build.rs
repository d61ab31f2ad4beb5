//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: querying the first listing page,
//! following the listing cursor to find every post ([`crate::pagination`]),
//! fetching each post and estimating its reading time
//! ([`crate::reading_time`]), rendering the index and post pages
//! ([`crate::write`]), and copying the theme's static assets into the output
//! directory.

use crate::api::{self, ContentApi, Query};
use crate::config::Config;
use crate::normalize;
use crate::pagination::{Controller, LoadMoreError, PostListState};
use crate::post::Article;
use crate::reading_time;
use crate::write::{self, Writer};
use gtmpl::Template;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The fields the index page needs from each listed post.
const LISTING_FIELDS: [&str; 3] = ["title", "subtitle", "author"];

/// Builds the site from a [`Config`] against `api`.
pub async fn build_site<A: ContentApi + ?Sized>(config: &Config, api: &A) -> Result<()> {
    // Parse the template files first so a broken theme fails before any
    // requests are made.
    let index_template = parse_template(config.index_template.iter())?;
    let posts_template = parse_template(config.posts_template.iter())?;

    let listing = first_page(config, api).await?;
    let summaries = all_posts(listing.clone(), api).await?;
    tracing::info!(posts = summaries.posts.len(), "listed posts");

    let mut articles = Vec::with_capacity(summaries.posts.len());
    let mut seen = HashSet::new();
    for summary in &summaries.posts {
        let uid = match &summary.id {
            Some(uid) => uid,
            None => {
                tracing::warn!(title = ?summary.title, "skipping post without uid");
                continue;
            }
        };
        // The listing isn't de-duplicated, but each page only needs writing
        // once.
        if !seen.insert(uid.clone()) {
            continue;
        }
        articles.push(article(config, api, uid).await?);
    }

    // Blow away old post and static output so deleted posts and assets don't
    // linger.
    rmdir(&config.posts_output_directory)?;
    rmdir(&config.static_output_directory)?;

    let writer = Writer {
        posts_template: &posts_template,
        index_template: &index_template,
        posts_url: &config.posts_url,
        root_output_directory: &config.root_output_directory,
        posts_output_directory: &config.posts_output_directory,
        home_page: &config.home_page,
        static_url: &config.static_url,
        site_title: &config.title,
    };
    writer.write_site(&listing, &articles)?;

    if config.static_source_directory.is_dir() {
        copy_dir(
            &config.static_source_directory,
            &config.static_output_directory,
        )?;
    }

    Ok(())
}

/// Queries the first page of the listing, which is what the index page shows.
async fn first_page<A: ContentApi + ?Sized>(config: &Config, api: &A) -> Result<PostListState> {
    let mut query = Query::documents_of_type(&config.document_type)
        .fetch(&config.document_type, LISTING_FIELDS.iter().copied())
        .page_size(config.index_page_size);
    if let Some(orderings) = &config.orderings {
        query = query.orderings(orderings);
    }
    Ok(PostListState::from_page(api.query(&query).await?))
}

/// Follows the listing's cursor until it runs out.
async fn all_posts<A: ContentApi + ?Sized>(
    listing: PostListState,
    api: &A,
) -> Result<PostListState> {
    let mut controller = Controller::new(listing);
    while controller.has_more() {
        controller.load_more(api).await?;
    }
    Ok(controller.into_state())
}

async fn article<A: ContentApi + ?Sized>(config: &Config, api: &A, uid: &str) -> Result<Article> {
    let raw = api
        .get_by_uid(&config.document_type, uid)
        .await?
        .ok_or_else(|| Error::MissingPost(uid.to_owned()))?;
    let post = normalize::post(raw);
    let reading_time = reading_time::estimate(post.sections(), config.words_per_minute);
    tracing::debug!(uid, reading_time, "fetched post");
    Ok(Article { post, reading_time })
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    for result in WalkDir::new(src) {
        let entry = result?;
        // strip_prefix shouldn't fail since `src` is always an ancestor of
        // `entry`
        let target = match entry.path().strip_prefix(src) {
            Ok(relative) => dst.join(relative),
            Err(_) => continue,
        };
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

// Concatenates the contents of the template files, in order, and parses the
// result into a single template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template
        .parse(&contents)
        .map_err(|e| Error::ParseTemplate(e.to_string()))?;
    Ok(template)
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can come from the content API,
/// pagination, writing, cleaning output directories, parsing template files,
/// and other I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned for content API failures outside of pagination.
    #[error(transparent)]
    Api(#[from] api::Error),

    /// Returned when following the listing cursor fails.
    #[error(transparent)]
    LoadMore(#[from] LoadMoreError),

    /// Returned when a listed post can't be found by its uid.
    #[error("post `{0}` is listed but could not be fetched")]
    MissingPost(String),

    /// Returned for errors writing pages to disk as HTML files.
    #[error(transparent)]
    Write(#[from] write::Error),

    /// Returned for I/O problems while cleaning output directories.
    #[error("Cleaning directory '{}': {}", path.display(), err)]
    Clean {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for I/O problems while opening template files.
    #[error("Opening template file '{}': {}", path.display(), err)]
    OpenTemplateFile {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for errors parsing template files.
    #[error("{0}")]
    ParseTemplate(String),

    /// Returned for errors walking the static directory.
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// Returned for other I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
