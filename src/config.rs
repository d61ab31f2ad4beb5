//! Loads the site [`Config`] from a `spacetraveling.yaml` project file and the
//! `theme/theme.yaml` file next to it.

use crate::api::ClientConfig;
use crate::reading_time::WORDS_PER_MINUTE;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const PROJECT_FILE: &str = "spacetraveling.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
struct WordsPerMinute(u32);
impl Default for WordsPerMinute {
    fn default() -> Self {
        WordsPerMinute(WORDS_PER_MINUTE)
    }
}

#[derive(Deserialize)]
struct Project {
    pub title: String,
    pub site_root: Url,

    #[serde(default)]
    pub home_page: String,

    pub api_endpoint: Url,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_document_type")]
    pub document_type: String,

    #[serde(default)]
    pub orderings: Option<String>,

    #[serde(default)]
    pub index_page_size: PageSize,

    #[serde(default)]
    pub words_per_minute: WordsPerMinute,

    #[serde(default = "default_timeout")]
    #[serde(deserialize_with = "duration_str::deserialize_duration")]
    pub timeout: Duration,

    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    posts_template: Vec<PathBuf>,
}

fn default_document_type() -> String {
    String::from("post")
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Everything needed to build the site.
pub struct Config {
    pub title: String,
    pub home_page: Url,

    /// The URL of the directory holding post pages, with a trailing slash.
    pub posts_url: Url,

    /// The URL of the directory holding theme assets, with a trailing slash.
    pub static_url: Url,

    pub index_template: Vec<PathBuf>,
    pub posts_template: Vec<PathBuf>,

    pub root_output_directory: PathBuf,
    pub posts_output_directory: PathBuf,
    pub static_source_directory: PathBuf,
    pub static_output_directory: PathBuf,

    /// The document type holding posts.
    pub document_type: String,

    /// Optional ordering for the listing query.
    pub orderings: Option<String>,

    /// The number of posts fetched per listing page.
    pub index_page_size: usize,

    pub words_per_minute: u32,

    pub client: ClientConfig,
}

impl Config {
    /// Looks for the project file in `dir` and then in each of its ancestors.
    /// `access_token`, if given, overrides the one in the project file.
    pub fn from_directory(
        dir: &Path,
        output_directory: &Path,
        access_token: Option<String>,
    ) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory, access_token)
                .context("Loading configuration")
        } else {
            match dir.parent() {
                Some(dir) => Config::from_directory(dir, output_directory, access_token),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(
        path: &Path,
        output_directory: &Path,
        access_token: Option<String>,
    ) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;

        let theme_dir = project_root.join("theme");
        let theme: Theme =
            serde_yaml::from_reader(open(&theme_dir.join("theme.yaml"), "theme")?)?;

        if project.index_page_size.0 == 0 {
            return Err(anyhow!("`index_page_size` must be at least 1"));
        }
        if project.words_per_minute.0 == 0 {
            return Err(anyhow!("`words_per_minute` must be at least 1"));
        }

        let site_root = directory_url(project.site_root);
        Ok(Config {
            title: project.title,
            home_page: site_root.join(&project.home_page)?,
            posts_url: site_root.join("post/")?,
            static_url: site_root.join("static/")?,
            index_template: theme
                .index_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            posts_template: theme
                .posts_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            root_output_directory: output_directory.to_owned(),
            posts_output_directory: output_directory.join("post"),
            static_source_directory: theme_dir.join("static"),
            static_output_directory: output_directory.join("static"),
            document_type: project.document_type,
            orderings: project.orderings,
            index_page_size: project.index_page_size.0,
            words_per_minute: project.words_per_minute.0,
            client: ClientConfig {
                endpoint: project.api_endpoint,
                access_token: access_token.or(project.access_token),
                user_agent: project.user_agent,
                timeout: project.timeout,
            },
        })
    }
}

fn open(path: &Path, kind: &str) -> Result<File> {
    File::open(path)
        .with_context(|| format!("Opening {} file `{}`", kind, path.display()))
}

// `Url::join` treats the last segment of a URL without a trailing slash as a
// file name and drops it.
fn directory_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_directory_walks_up() -> Result<()> {
        let config = Config::from_directory(
            Path::new("./testdata/project/theme/static"),
            Path::new("/tmp/out"),
            None,
        )?;

        assert_eq!("spacetraveling", config.title);
        assert_eq!("https://example.org/blog/", config.home_page.as_str());
        assert_eq!("https://example.org/blog/post/", config.posts_url.as_str());
        assert_eq!(
            "https://example.org/blog/static/",
            config.static_url.as_str()
        );
        assert_eq!(
            vec![
                PathBuf::from("./testdata/project/theme/base.html"),
                PathBuf::from("./testdata/project/theme/index.html"),
            ],
            config.index_template
        );
        assert_eq!(PathBuf::from("/tmp/out/post"), config.posts_output_directory);
        assert_eq!("post", config.document_type);
        assert_eq!(2, config.index_page_size);
        assert_eq!(WORDS_PER_MINUTE, config.words_per_minute);
        assert_eq!(Duration::from_secs(5), config.client.timeout);
        assert_eq!(
            "https://spacetraveling.cdn.prismic.io/api/v2",
            config.client.endpoint.as_str()
        );
        assert_eq!(None, config.client.access_token);
        Ok(())
    }

    #[test]
    fn test_access_token_override() -> Result<()> {
        let config = Config::from_directory(
            Path::new("./testdata/project"),
            Path::new("/tmp/out"),
            Some(String::from("secret")),
        )?;
        assert_eq!(Some("secret"), config.client.access_token.as_deref());
        Ok(())
    }

    #[test]
    fn test_directory_url() -> Result<()> {
        assert_eq!(
            "https://example.org/blog/",
            directory_url(Url::parse("https://example.org/blog")?).as_str()
        );
        assert_eq!(
            "https://example.org/",
            directory_url(Url::parse("https://example.org")?).as_str()
        );
        Ok(())
    }
}
