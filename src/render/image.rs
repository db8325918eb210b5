//! Per-canvas image cache.
//!
//! Image I/O belongs to the host: the canvas queues one request per URL and
//! the host answers through [`ImageCache::complete`]. Every node that needed
//! the image while it was in flight is recorded as a waiter and handed back
//! on completion, so the dimension-dependent work runs once per URL.

use std::collections::HashMap;
use std::sync::LazyLock;

use glam::DVec2;
use regex_lite::Regex;

use super::element::NodeId;
use crate::errors::ImageLoadError;

static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    // A trailing 3-4 character extension marks a fill value as an image URL
    Regex::new(r"\.\w{3,4}$").expect("image URL pattern is valid")
});

/// Whether a fill value names an image rather than a color
pub fn is_image_url(value: &str) -> bool {
    IMAGE_URL.is_match(value)
}

/// What a waiting node does with the image once it is available
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImagePurpose {
    /// Tiled pattern fill of a shape
    PatternFill,
    /// Source of an image shape
    ImageSource,
}

/// A node waiting for an image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Waiter {
    pub node: NodeId,
    pub purpose: ImagePurpose,
}

#[derive(Debug)]
enum ImageState {
    Pending { waiters: Vec<Waiter> },
    Loaded { size: DVec2, pattern: Option<u32> },
    Failed(ImageLoadError),
}

/// Result of looking an image up on behalf of a node
#[derive(Clone, Debug, PartialEq)]
pub enum ImageLookup {
    /// Natural size is known; apply synchronously
    Ready(DVec2),
    /// Request queued or already in flight; the waiter was recorded
    Pending,
    /// The image failed to load earlier; nothing will be applied
    Failed,
}

/// A registered pattern definition
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    pub id: u32,
    pub url: String,
    pub size: DVec2,
}

#[derive(Debug)]
pub struct ImageCache {
    entries: HashMap<String, ImageState>,
    requests: Vec<String>,
    next_pattern: u32,
    patterns: Vec<Pattern>,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            requests: Vec::new(),
            next_pattern: 1,
            patterns: Vec::new(),
        }
    }
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look `url` up for `waiter`, queueing a host request on first use.
    pub fn lookup(&mut self, url: &str, waiter: Waiter) -> ImageLookup {
        match self.entries.get_mut(url) {
            Some(ImageState::Loaded { size, .. }) => ImageLookup::Ready(*size),
            Some(ImageState::Failed(_)) => ImageLookup::Failed,
            Some(ImageState::Pending { waiters }) => {
                if !waiters.contains(&waiter) {
                    waiters.push(waiter);
                }
                ImageLookup::Pending
            }
            None => {
                crate::log::debug!(url, "image request issued");
                self.entries.insert(
                    url.to_string(),
                    ImageState::Pending {
                        waiters: vec![waiter],
                    },
                );
                self.requests.push(url.to_string());
                ImageLookup::Pending
            }
        }
    }

    /// Pattern id for a loaded image, registering the pattern on first use.
    pub fn pattern_id(&mut self, url: &str) -> Option<u32> {
        let Some(ImageState::Loaded { size, pattern }) = self.entries.get_mut(url) else {
            return None;
        };
        if let Some(id) = pattern {
            return Some(*id);
        }
        let id = self.next_pattern;
        self.next_pattern += 1;
        *pattern = Some(id);
        self.patterns.push(Pattern {
            id,
            url: url.to_string(),
            size: *size,
        });
        crate::log::debug!(url, id, "pattern registered");
        Some(id)
    }

    /// Record the host's answer for `url` and return the waiters to notify.
    ///
    /// Failed loads drop their waiters. Answers for URLs that are not in
    /// flight are ignored.
    pub fn complete(&mut self, url: &str, result: Result<DVec2, ImageLoadError>) -> Vec<Waiter> {
        let Some(ImageState::Pending { .. }) = self.entries.get(url) else {
            crate::log::debug!(url, "ignoring answer for an image that is not in flight");
            return Vec::new();
        };
        let next = match result {
            Ok(size) => {
                crate::log::debug!(url, width = size.x, height = size.y, "image loaded");
                ImageState::Loaded {
                    size,
                    pattern: None,
                }
            }
            Err(error) => {
                crate::log::warn!(url, reason = %error.reason, "image failed to load");
                ImageState::Failed(error)
            }
        };
        let loaded = matches!(next, ImageState::Loaded { .. });
        match self.entries.insert(url.to_string(), next) {
            Some(ImageState::Pending { waiters }) if loaded => waiters,
            _ => Vec::new(),
        }
    }

    /// Drain the URLs the host has not been asked for yet.
    pub fn take_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.requests)
    }

    /// Load error of a failed image
    pub fn error(&self, url: &str) -> Option<&ImageLoadError> {
        match self.entries.get(url) {
            Some(ImageState::Failed(error)) => Some(error),
            _ => None,
        }
    }

    /// Registered patterns in id order
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}
