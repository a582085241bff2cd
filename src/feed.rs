//! Feed-source collaborator: Reddit top listings.
//!
//! One best-effort fetch per subreddit; a failed fetch yields an empty batch
//! and a warning, never an abort. Source-side filtering happens here at the
//! collaborator boundary: stickied/pinned posts, posts the source already
//! flags as over_18, and non-image URLs are dropped before the pipeline ever
//! sees them.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::models::Candidate;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];
const VIDEO_EXTENSIONS: &[&str] = &[".gifv", ".mp4", ".webm"];

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    ups: i64,
    author: Option<String>,
    permalink: Option<String>,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    over_18: bool,
    url_overridden_by_dest: Option<String>,
    url: Option<String>,
}

/// Fetch the day's top posts from one subreddit. Any transport or parse
/// failure degrades to an empty list.
pub async fn fetch_top(client: &Client, subreddit: &str, limit: u32) -> Vec<Candidate> {
    let url = format!("https://www.reddit.com/r/{subreddit}/top.json?t=day&limit={limit}");
    let body = match fetch_body(client, &url).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(subreddit, error = %e, "failed to fetch posts");
            return Vec::new();
        }
    };

    match parse_listing(&body) {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!(subreddit, error = %e, "failed to parse listing");
            Vec::new()
        }
    }
}

async fn fetch_body(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .context("request failed")?
        .error_for_status()
        .context("non-success status")?;
    resp.text().await.context("failed to read body")
}

/// Parse a listing response into candidates, applying source-side filters.
fn parse_listing(body: &str) -> Result<Vec<Candidate>> {
    let listing: Listing = serde_json::from_str(body).context("unexpected listing shape")?;

    let candidates = listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter_map(candidate_from_post)
        .collect();
    Ok(candidates)
}

fn candidate_from_post(post: Post) -> Option<Candidate> {
    // Stickied posts and ads aren't feed content
    if post.stickied || post.pinned {
        return None;
    }
    // The source's own adult flag is authoritative, skip without scoring
    if post.over_18 {
        return None;
    }

    let image_url = post.url_overridden_by_dest.or(post.url)?;
    if !has_image_extension(&image_url) {
        return None;
    }

    let source_url = post
        .permalink
        .map(|p| format!("https://www.reddit.com{p}"))
        .unwrap_or_default();

    Some(Candidate {
        title: post.title.trim().to_string(),
        image_url,
        source_url,
        author: post.author,
        score: post.ups,
    })
}

fn has_image_extension(url: &str) -> bool {
    let lower = url.to_lowercase();
    if VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
