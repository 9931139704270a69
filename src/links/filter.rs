use serde::Deserialize;

use super::repo_types::Link;

/// Dashboard filter parameters. Every supplied dimension must match (AND).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkFilter {
    pub tag: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
    #[serde(rename = "q")]
    pub keyword: Option<String>,
}

// Empty strings come from blank query parameters and carry no constraint.
fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

impl LinkFilter {
    pub fn is_empty(&self) -> bool {
        present(&self.tag).is_none()
            && present(&self.category).is_none()
            && present(&self.link_type).is_none()
            && present(&self.keyword).is_none()
    }

    /// Produce a filtered view over `links`; the input is left untouched.
    pub fn apply<'a>(&self, links: &'a [Link]) -> Vec<&'a Link> {
        let tag = present(&self.tag);
        let category = present(&self.category);
        let link_type = present(&self.link_type);
        let keyword = present(&self.keyword);

        links
            .iter()
            .filter(|link| {
                tag.as_ref()
                    .map_or(true, |t| link.tags.iter().any(|lt| lt.to_lowercase() == *t))
            })
            .filter(|link| {
                category
                    .as_ref()
                    .map_or(true, |c| link.category.to_lowercase() == *c)
            })
            .filter(|link| {
                link_type
                    .as_ref()
                    .map_or(true, |k| link.link_type.as_str() == k.as_str())
            })
            .filter(|link| keyword.as_ref().map_or(true, |k| matches_keyword(link, k)))
            .collect()
    }
}

fn matches_keyword(link: &Link, needle: &str) -> bool {
    link.title.to_lowercase().contains(needle)
        || link.description.to_lowercase().contains(needle)
        || link.url.to_lowercase().contains(needle)
        || link.tags.iter().any(|t| t.to_lowercase().contains(needle))
        || link.category.to_lowercase().contains(needle)
}
