//! Purpose: Fetch Docker Hub tag pages and collect ARM64-capable tags.
//! Exports: `FetchConfig`, `first_page_url`, `http_fetcher`, `collect_arm64_tags`.
//! Role: The only networked path in the binary; page logic stays in `core::tags`.
//! Invariants: The page fetcher is injected, so the pagination loop is testable offline.
//! Invariants: Transport and non-2xx failures map to `ErrorKind::Http`, unrecovered.

use serde_json::Value;
use url::Url;

use hublens::core::error::{Error, ErrorKind};
use hublens::core::tags::{arm64_tags, parse_tag_page};

const REGISTRY_BASE: &str = "https://registry.hub.docker.com/v2/repositories";

// The tags endpoint rejects requests without a browser-like agent string.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub image: String,
    pub page_size: u32,
    pub limit: usize,
}

/// Build the first tags-endpoint URL for an image id. Ids without a
/// namespace get the implicit `library/` prefix, as Docker Hub does.
pub fn first_page_url(config: &FetchConfig) -> String {
    let image = if config.image.contains('/') {
        config.image.clone()
    } else {
        format!("library/{}", config.image)
    };
    format!(
        "{REGISTRY_BASE}/{image}/tags?page=1&page_size={}",
        config.page_size
    )
}

/// Page fetcher backed by a `ureq` agent.
pub fn http_fetcher() -> impl FnMut(&str) -> Result<String, Error> {
    let agent = ureq::AgentBuilder::new().build();
    move |url: &str| {
        let response = agent
            .get(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json")
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => Error::new(ErrorKind::Http)
                    .with_message(format!("tags endpoint returned HTTP {code}"))
                    .with_hint("Check the image id; unknown repositories return 404."),
                transport => Error::new(ErrorKind::Http)
                    .with_message("failed to reach the tags endpoint")
                    .with_source(transport),
            })?;
        response.into_string().map_err(|err| {
            Error::new(ErrorKind::Http)
                .with_message("failed to read the tags endpoint response body")
                .with_source(err)
        })
    }
}

/// Fetch tag pages starting from the first page, keep tags with ARM64
/// variants, and follow `next` links until `limit` tags are collected or
/// pagination ends.
pub fn collect_arm64_tags<F>(config: &FetchConfig, mut fetch: F) -> Result<Vec<Value>, Error>
where
    F: FnMut(&str) -> Result<String, Error>,
{
    let mut url = first_page_url(config);
    let mut collected = Vec::new();

    loop {
        tracing::debug!(url = %url, collected = collected.len(), "fetching tag page");
        let body = fetch(&url)?;
        let page = parse_tag_page(&body)?;
        collected.extend(arm64_tags(&page));

        if collected.len() >= config.limit {
            break;
        }
        match page.next {
            Some(next) => {
                // A relative or garbled continuation link means format drift.
                Url::parse(&next).map_err(|err| {
                    Error::new(ErrorKind::Parse)
                        .with_message(format!("tag page continuation link is not a valid URL: {next}"))
                        .with_source(err)
                })?;
                url = next;
            }
            None => break,
        }
    }

    Ok(collected)
}
