// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound content policy.
//!
//! Text without URLs always passes. Text with URLs passes only when every
//! URL matches an approved link or media url after trimming and lowercasing.

use std::collections::HashSet;
use std::sync::LazyLock;

use mflow_core::{ApprovedLink, ApprovedMedia, FlowError};
use regex::Regex;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s]+").unwrap());

/// Allow-list built from the approved links and media.
#[derive(Debug, Clone, Default)]
pub struct ContentPolicy {
    approved: HashSet<String>,
}

fn normalize(url: &str) -> String {
    url.trim().to_lowercase()
}

/// Every URL substring of `text`, in order of appearance.
pub fn extract_urls(text: &str) -> Vec<&str> {
    URL_PATTERN.find_iter(text).map(|m| m.as_str()).collect()
}

impl ContentPolicy {
    pub fn new(links: &[ApprovedLink], media: &[ApprovedMedia]) -> Self {
        let approved = links
            .iter()
            .map(|l| normalize(&l.url))
            .chain(media.iter().map(|m| normalize(&m.url)))
            .collect();
        Self { approved }
    }

    /// URLs in `text` that are not approved.
    pub fn violations<'t>(&self, text: &'t str) -> Vec<&'t str> {
        extract_urls(text)
            .into_iter()
            .filter(|url| !self.approved.contains(&normalize(url)))
            .collect()
    }

    /// Reject `text` with [`FlowError::PolicyViolation`] when it carries unapproved URLs.
    pub fn check(&self, text: &str) -> Result<(), FlowError> {
        let urls = self.violations(text);
        if urls.is_empty() {
            Ok(())
        } else {
            Err(FlowError::PolicyViolation {
                urls: urls.into_iter().map(str::to_string).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mflow_core::MediaType;

    fn policy() -> ContentPolicy {
        ContentPolicy::new(
            &[ApprovedLink {
                id: "1".into(),
                title: "Site".into(),
                url: "https://messengerflow.io".into(),
                category: "General".into(),
            }],
            &[ApprovedMedia {
                id: "m1".into(),
                title: "Welcome".into(),
                url: " https://cdn.example/Welcome.png ".into(),
                media_type: MediaType::Image,
            }],
        )
    }

    #[test]
    fn text_without_urls_passes() {
        assert!(policy().check("Thanks for reaching out!").is_ok());
        assert!(ContentPolicy::default().check("no links here").is_ok());
    }

    #[test]
    fn approved_url_passes_case_insensitively() {
        assert!(policy().check("See HTTPS://MessengerFlow.io").is_ok());
        assert!(policy().check("pic: https://cdn.example/welcome.png").is_ok());
    }

    #[test]
    fn unapproved_url_is_rejected_with_list() {
        let err = policy()
            .check("Try https://messengerflow.io and https://evil.example/x")
            .unwrap_err();
        match err {
            FlowError::PolicyViolation { urls } => assert_eq!(urls, vec!["https://evil.example/x"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn url_with_trailing_path_is_not_the_approved_url() {
        assert!(policy().check("https://messengerflow.io/pricing").is_err());
    }

    #[test]
    fn extract_urls_stops_at_whitespace() {
        assert_eq!(
            extract_urls("a http://x.y/z b\thttps://q.r"),
            vec!["http://x.y/z", "https://q.r"]
        );
    }
}
