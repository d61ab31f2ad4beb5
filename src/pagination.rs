//! Drives cursor-based pagination over a listing of posts.
//!
//! A [`Controller`] owns a [`PostListState`] (the posts seen so far plus a
//! [`Cursor`] to the next page) and a [`Phase`]:
//!
//! | phase      | `load_more`                          | on response              |
//! |------------|--------------------------------------|--------------------------|
//! | `Idle`     | `Fetching`, one GET to the cursor    |                          |
//! | `Failed`   | `Fetching`, one GET to the cursor    |                          |
//! | `Fetching` | rejected with [`Rejected::InFlight`] | `Idle` (ok), `Failed`    |
//!
//! `load_more` is also rejected with [`Rejected::Exhausted`] once the cursor
//! is empty. Rejections issue no request and leave the state untouched. A
//! failed fetch leaves posts and cursor as they were so the call can be
//! retried.

use crate::api::{self, ContentApi, RawPage};
use crate::normalize;
use crate::post::PostSummary;

/// Where to fetch the next page from. `None` means the listing is exhausted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cursor {
    pub next_page_url: Option<String>,
}

impl Cursor {
    pub fn is_exhausted(&self) -> bool {
        self.next_page_url.is_none()
    }
}

/// The posts loaded so far and the cursor to the rest of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostListState {
    pub posts: Vec<PostSummary>,
    pub cursor: Cursor,
}

impl PostListState {
    /// Builds the initial state from the first page of a listing query.
    pub fn from_page(page: RawPage) -> PostListState {
        PostListState::default().appended(page)
    }

    /// Returns a new state with the page's documents normalized and appended
    /// after the existing posts, and the cursor replaced by the page's
    /// `next_page`. Posts are not de-duplicated.
    pub fn appended(self, page: RawPage) -> PostListState {
        let mut posts = self.posts;
        posts.extend(page.results.into_iter().map(normalize::summary));
        PostListState {
            posts,
            cursor: Cursor {
                next_page_url: page.next_page,
            },
        }
    }

    /// Whether there are more posts to load.
    pub fn has_more(&self) -> bool {
        !self.cursor.is_exhausted()
    }
}

/// The controller's fetch status.
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    Idle,
    Fetching,

    /// The last fetch failed with the contained message. Retrying is allowed.
    Failed(String),
}

/// Why a transition was refused.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum Rejected {
    #[error("the listing has no more pages")]
    Exhausted,

    #[error("a page is already being fetched")]
    InFlight,

    #[error("no page is being fetched")]
    NotInFlight,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadMoreError {
    #[error(transparent)]
    Rejected(#[from] Rejected),

    #[error("loading more posts: {0}")]
    Fetch(#[from] api::Error),
}

/// Owns a listing and moves it forward one page at a time.
#[derive(Debug)]
pub struct Controller {
    state: PostListState,
    phase: Phase,
}

impl Controller {
    /// Starts an idle controller from an already-loaded listing (usually the
    /// one rendered into the index page).
    pub fn new(state: PostListState) -> Controller {
        Controller {
            state,
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> &PostListState {
        &self.state
    }

    pub fn into_state(self) -> PostListState {
        self.state
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Whether a "load more" affordance should be offered.
    pub fn has_more(&self) -> bool {
        self.state.has_more()
    }

    /// Moves to `Fetching` and returns the URL the caller must fetch. The
    /// result must be handed back through [`Controller::complete_load_more`].
    pub fn begin_load_more(&mut self) -> Result<String, Rejected> {
        if self.phase == Phase::Fetching {
            tracing::debug!("load more rejected: fetch in flight");
            return Err(Rejected::InFlight);
        }
        let url = match &self.state.cursor.next_page_url {
            Some(url) => url.clone(),
            None => {
                tracing::debug!("load more rejected: listing exhausted");
                return Err(Rejected::Exhausted);
            }
        };
        tracing::debug!(%url, "fetching next page");
        self.phase = Phase::Fetching;
        Ok(url)
    }

    /// Applies the outcome of the fetch started by
    /// [`Controller::begin_load_more`]. Returns the number of posts appended.
    pub fn complete_load_more(
        &mut self,
        fetched: api::Result<RawPage>,
    ) -> Result<usize, LoadMoreError> {
        if self.phase != Phase::Fetching {
            return Err(Rejected::NotInFlight.into());
        }
        match fetched {
            Ok(page) => {
                let appended = page.results.len();
                let state = std::mem::take(&mut self.state);
                self.state = state.appended(page);
                self.phase = Phase::Idle;
                tracing::debug!(
                    appended,
                    total = self.state.posts.len(),
                    exhausted = self.state.cursor.is_exhausted(),
                    "loaded next page"
                );
                Ok(appended)
            }
            Err(err) => {
                tracing::warn!(error = %err, "loading next page failed");
                self.phase = Phase::Failed(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Abandons an in-flight fetch. Returns `false` if nothing was in flight.
    /// A response that arrives afterwards is rejected.
    pub fn cancel(&mut self) -> bool {
        if self.phase == Phase::Fetching {
            self.phase = Phase::Idle;
            true
        } else {
            false
        }
    }

    /// Fetches the next page from `api` and appends it. Dropping the returned
    /// future before it resolves cancels the fetch.
    pub async fn load_more<A: ContentApi + ?Sized>(
        &mut self,
        api: &A,
    ) -> Result<usize, LoadMoreError> {
        let url = self.begin_load_more()?;
        let fetched = {
            let mut in_flight = InFlight {
                phase: &mut self.phase,
                done: false,
            };
            let fetched = api.fetch_page(&url).await;
            in_flight.done = true;
            fetched
        };
        self.complete_load_more(fetched)
    }
}

/// Puts the phase back to `Idle` if a fetch is dropped mid-flight.
struct InFlight<'a> {
    phase: &'a mut Phase,
    done: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done && *self.phase == Phase::Fetching {
            tracing::debug!("next page fetch cancelled");
            *self.phase = Phase::Idle;
        }
    }
}
