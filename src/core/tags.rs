//! Purpose: Parse Docker Hub tag-list responses and filter for ARM64 variants.
//! Exports: `TagPage`, `parse_tag_page`, `arm64_tags`.
//! Role: Pure page-level logic; pagination and HTTP live in the CLI layer.
//! Invariants: Tag objects pass through unmodified; filtering never rewrites them.
//! Invariants: A tag without an `images` array counts as having no variants.

use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

const ARCH_ARM64: &str = "arm64";

/// One page of the `v2/repositories/<image>/tags` endpoint.
#[derive(Clone, Debug)]
pub struct TagPage {
    pub next: Option<String>,
    pub results: Vec<Value>,
}

pub fn parse_tag_page(body: &str) -> Result<TagPage, Error> {
    let value: Value = serde_json::from_str(body).map_err(|err| {
        Error::new(ErrorKind::Parse)
            .with_message("tag page is not valid JSON")
            .with_source(err)
    })?;

    let next = match value.get("next") {
        None | Some(Value::Null) => None,
        Some(Value::String(url)) => Some(url.clone()),
        Some(_) => {
            return Err(Error::new(ErrorKind::Parse)
                .with_message("tag page field \"next\" must be a string or null"));
        }
    };

    let results = match value.get("results") {
        Some(Value::Array(items)) => items.clone(),
        _ => {
            return Err(Error::new(ErrorKind::Parse)
                .with_message("tag page field \"results\" must be a list")
                .with_hint("The tags endpoint response format may have changed."));
        }
    };

    Ok(TagPage { next, results })
}

/// Tags from the page that carry at least one `arm64` image variant.
pub fn arm64_tags(page: &TagPage) -> Vec<Value> {
    page.results
        .iter()
        .filter(|tag| has_arm64_image(tag))
        .cloned()
        .collect()
}

fn has_arm64_image(tag: &Value) -> bool {
    let Some(images) = tag.get("images").and_then(Value::as_array) else {
        return false;
    };
    images.iter().any(|image| {
        image.get("architecture").and_then(Value::as_str) == Some(ARCH_ARM64)
    })
}

#[cfg(test)]
mod tests {
    use super::{arm64_tags, parse_tag_page};
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn keeps_only_tags_with_arm64_variants() {
        let body = json!({
            "next": "https://registry.hub.docker.com/v2/repositories/x/tags?page=2",
            "results": [
                {"name": "latest", "images": [
                    {"architecture": "amd64"},
                    {"architecture": "arm64"}
                ]},
                {"name": "amd-only", "images": [{"architecture": "amd64"}]},
                {"name": "no-images"}
            ]
        })
        .to_string();

        let page = parse_tag_page(&body).unwrap();
        assert_eq!(page.next.as_deref(), Some("https://registry.hub.docker.com/v2/repositories/x/tags?page=2"));

        let arm64 = arm64_tags(&page);
        assert_eq!(arm64.len(), 1);
        assert_eq!(arm64[0].get("name").unwrap(), "latest");
        // The kept tag comes through unmodified.
        assert_eq!(arm64[0], page.results[0]);
    }

    #[test]
    fn null_next_means_no_more_pages() {
        let page = parse_tag_page(r#"{"next": null, "results": []}"#).unwrap();
        assert!(page.next.is_none());
        assert!(arm64_tags(&page).is_empty());
    }

    #[test]
    fn missing_results_is_a_parse_error() {
        let err = parse_tag_page(r#"{"next": null}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = parse_tag_page("{").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
