// SPDX-License-Identifier: GPL-3.0-only

//! Preview and still-image resolution negotiation
//!
//! Sizes are grouped into buckets keyed by their reduced aspect ratio. The still
//! size prefers 16:9 capped at a configurable area; the preview size is the
//! smallest preview stream with the same ratio that is at least as large as the
//! still size.

use crate::errors::NegotiationError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// What the caller wants a size for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRequest {
    /// Preview surface
    Preview,
    /// JPEG still output
    Image,
}

/// A supported stream resolution
///
/// Ordered by area, then width, so every set of sizes has a deterministic
/// smallest and largest element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeCandidate {
    pub width: u32,
    pub height: u32,
}

impl SizeCandidate {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Reduced aspect ratio of this size
    pub fn aspect_ratio(&self) -> AspectRatio {
        AspectRatio::of(self.width, self.height)
    }

    /// Same size with width and height exchanged
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }
}

impl Ord for SizeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.area()
            .cmp(&other.area())
            .then(self.width.cmp(&other.width))
    }
}

impl PartialOrd for SizeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SizeCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for SizeCandidate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Malformed size: {}", s))?;
        let width = w.trim().parse().map_err(|_| format!("Malformed size: {}", s))?;
        let height = h.trim().parse().map_err(|_| format!("Malformed size: {}", s))?;
        Ok(Self::new(width, height))
    }
}

/// Aspect ratio reduced by the greatest common divisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AspectRatio {
    x: u32,
    y: u32,
}

impl AspectRatio {
    /// Reduce `width:height` to its lowest terms
    pub fn of(width: u32, height: u32) -> Self {
        let divisor = gcd(width, height);
        Self {
            x: width / divisor,
            y: height / divisor,
        }
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    /// Whether `size` reduces to this ratio
    pub fn matches(&self, size: &SizeCandidate) -> bool {
        size.aspect_ratio() == *self
    }

    pub fn inverse(&self) -> Self {
        Self::of(self.y, self.x)
    }
}

impl Ord for AspectRatio {
    fn cmp(&self, other: &Self) -> Ordering {
        // Both sides are reduced, so equal cross products mean equal ratios
        (self.x as u64 * other.y as u64).cmp(&(other.x as u64 * self.y as u64))
    }
}

impl PartialOrd for AspectRatio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    /// Parse a ratio formatted like "4:3"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(':')
            .ok_or_else(|| format!("Malformed aspect ratio: {}", s))?;
        let x: u32 = x.parse().map_err(|_| format!("Malformed aspect ratio: {}", s))?;
        let y: u32 = y.parse().map_err(|_| format!("Malformed aspect ratio: {}", s))?;
        if x == 0 || y == 0 {
            return Err(format!("Malformed aspect ratio: {}", s));
        }
        Ok(Self::of(x, y))
    }
}

/// Sizes bucketed by aspect ratio, each bucket sorted by (area, width)
#[derive(Debug, Clone, Default)]
pub struct SizeMap {
    ratios: BTreeMap<AspectRatio, BTreeSet<SizeCandidate>>,
}

impl SizeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sizes<'a>(sizes: impl IntoIterator<Item = &'a SizeCandidate>) -> Self {
        let mut map = Self::new();
        for size in sizes {
            map.add(*size);
        }
        map
    }

    /// Add a size; returns `false` if it was already present
    pub fn add(&mut self, size: SizeCandidate) -> bool {
        self.ratios
            .entry(size.aspect_ratio())
            .or_default()
            .insert(size)
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    pub fn ratios(&self) -> impl Iterator<Item = &AspectRatio> {
        self.ratios.keys()
    }

    /// Sizes of a bucket in ascending order (None if no size has this ratio)
    pub fn sizes(&self, ratio: &AspectRatio) -> Option<&BTreeSet<SizeCandidate>> {
        self.ratios.get(ratio).filter(|sizes| !sizes.is_empty())
    }

    /// Largest size of the 4:3 bucket
    pub fn default_size(&self) -> Option<SizeCandidate> {
        let (x, y) = crate::constants::sizes::FALLBACK_RATIO;
        self.sizes(&AspectRatio::of(x, y))
            .and_then(|sizes| sizes.last().copied())
    }

    /// Largest size across every bucket
    pub fn largest(&self) -> Option<SizeCandidate> {
        self.ratios
            .values()
            .filter_map(|sizes| sizes.last())
            .max()
            .copied()
    }
}

/// Pick the still-image size
///
/// Prefers the 16:9 bucket, keeping the largest size whose area fits in
/// `max_image`; if none fits the largest 16:9 size is used. Without a 16:9 bucket
/// the largest 4:3 size is used, and without that the largest size overall.
pub fn select_image_size(
    image_sizes: &[SizeCandidate],
    max_image: SizeCandidate,
) -> Result<SizeCandidate, NegotiationError> {
    let image_map = SizeMap::from_sizes(image_sizes);
    if image_map.is_empty() {
        return Err(NegotiationError::NoSupportedSizes);
    }

    let (x, y) = crate::constants::sizes::PREFERRED_RATIO;
    let preferred = match image_map.sizes(&AspectRatio::of(x, y)) {
        Some(sizes) => {
            let cap = max_image.area();
            sizes
                .iter()
                .take_while(|size| size.area() <= cap)
                .last()
                .or_else(|| sizes.last())
                .copied()
        }
        None => image_map.default_size().or_else(|| image_map.largest()),
    };

    preferred.ok_or(NegotiationError::NoSupportedSizes)
}

/// Pick the preview size matching a still size
pub fn select_preview_size(
    preview_sizes: &[SizeCandidate],
    image_size: SizeCandidate,
) -> Result<SizeCandidate, NegotiationError> {
    let supported: BTreeSet<SizeCandidate> = preview_sizes.iter().copied().collect();
    let largest = supported
        .last()
        .copied()
        .ok_or(NegotiationError::NoSupportedSizes)?;

    let longer = image_size.width.max(image_size.height);
    let shorter = image_size.width.min(image_size.height);
    let target = AspectRatio::of(longer, shorter);

    // Smallest of those big enough
    if let Some(size) = supported
        .iter()
        .find(|s| target.matches(s) && s.width >= longer && s.height >= shorter)
    {
        return Ok(*size);
    }

    // Otherwise the largest with the right ratio, or simply the largest
    Ok(supported
        .iter()
        .rev()
        .find(|s| target.matches(s))
        .copied()
        .unwrap_or(largest))
}

/// Negotiate a preview or still size from the device's stream tables
///
/// Pure and deterministic: the same tables and request always give the same size.
pub fn negotiate(
    preview_sizes: &[SizeCandidate],
    image_sizes: &[SizeCandidate],
    request: SizeRequest,
    max_image: SizeCandidate,
) -> Result<SizeCandidate, NegotiationError> {
    let image_size = select_image_size(image_sizes, max_image)?;
    match request {
        SizeRequest::Image => Ok(image_size),
        SizeRequest::Preview => select_preview_size(preview_sizes, image_size),
    }
}

/// Greatest common divisor (never returns 0)
fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a.max(1)
}
