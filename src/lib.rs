//! The library code for the `spacetraveling` blog. Posts live in a headless
//! content API and the site is built from them in a few steps:
//!
//! 1. Querying the first page of the post listing ([`crate::api`])
//! 2. Following the listing's cursor to find every post
//!    ([`crate::pagination`])
//! 3. Fetching each post, normalizing it ([`crate::normalize`]), and
//!    estimating its reading time ([`crate::reading_time`])
//! 4. Rendering the index page and the post pages to disk ([`crate::write`])
//!
//! The index page only lists the first page of posts. It carries the cursor
//! to the next page so the theme can offer a "load more" button, which drives
//! the same [`pagination::Controller`] transitions the build uses.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod api;
pub mod build;
pub mod config;
pub mod normalize;
pub mod pagination;
pub mod post;
pub mod reading_time;
pub mod richtext;
pub mod write;
