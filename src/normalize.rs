//! Maps raw API documents ([`RawDocument`]) onto the crate's fixed post shapes
//! ([`PostSummary`] and [`Post`]). Values are carried over unchanged: dates
//! stay as the API wrote them and absent fields stay absent.

use crate::api::RawDocument;
use crate::post::{Banner, Post, PostSummary, Section};

/// Normalizes a document from a listing query.
pub fn summary(raw: RawDocument) -> PostSummary {
    PostSummary {
        id: raw.uid,
        published_at: raw.first_publication_date,
        title: raw.data.title,
        subtitle: raw.data.subtitle,
        author: raw.data.author,
    }
}

/// Normalizes a fully-fetched document.
pub fn post(raw: RawDocument) -> Post {
    let data = raw.data;
    Post {
        id: raw.uid,
        published_at: raw.first_publication_date,
        title: data.title,
        subtitle: data.subtitle,
        author: data.author,
        banner: data.banner.map(|banner| Banner { url: banner.url }),
        content: data.content.map(|sections| {
            sections
                .into_iter()
                .map(|section| Section {
                    heading: section.heading,
                    body: section.body,
                })
                .collect()
        }),
    }
}
