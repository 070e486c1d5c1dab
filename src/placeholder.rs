//! Randomized placeholder handles
//!
//! Used to run a check offline with made-up lists, and to anonymize an
//! export before sharing it.

use crate::handle::MAX_HANDLE_LEN;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::collections::{BTreeMap, HashSet};

const ADJECTIVES: &[&str] = &[
    "amber", "brave", "calm", "dusty", "eager", "fuzzy", "gentle", "hazy", "icy", "jolly",
    "kind", "lucky", "misty", "noble", "odd", "proud", "quiet", "rusty", "sunny", "tidy",
    "urban", "vivid", "witty", "young", "zesty",
];

const NOUNS: &[&str] = &[
    "otter", "falcon", "maple", "pixel", "comet", "harbor", "lantern", "meadow", "pebble",
    "river", "sparrow", "thistle", "walrus", "willow", "yak", "badger", "cactus", "dune",
    "ember", "fjord", "glacier", "heron", "island", "juniper", "koala",
];

/// One random handle like `misty_heron42`.
pub fn placeholder_name<R: Rng>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("quiet");
    let noun = NOUNS.choose(rng).copied().unwrap_or("otter");
    let number: u16 = rng.random_range(0..1000);

    let mut name = format!("{adjective}_{noun}{number}");
    name.truncate(MAX_HANDLE_LEN);
    name
}

/// `count` distinct placeholder handles.
pub fn placeholder_names<R: Rng>(rng: &mut R, count: usize) -> Vec<String> {
    let mut seen = HashSet::with_capacity(count);
    let mut names = Vec::with_capacity(count);

    while names.len() < count {
        let mut name = placeholder_name(rng);
        // Fall back to a numbered suffix once random draws start colliding
        if seen.contains(&name) {
            name = format!("user_{}", seen.len());
        }
        if seen.insert(name.clone()) {
            names.push(name);
        }
    }

    names
}

/// A made-up followers/following pair sharing exactly `mutual` names.
///
/// `mutual` is clamped to the shorter list.
pub fn demo_lists<R: Rng>(
    rng: &mut R,
    followers: usize,
    following: usize,
    mutual: usize,
) -> (Vec<String>, Vec<String>) {
    let mutual = mutual.min(followers).min(following);
    let total = followers + following - mutual;
    let pool = placeholder_names(rng, total);

    let (shared, rest) = pool.split_at(mutual);
    let (only_followers, only_following) = rest.split_at(followers - mutual);

    let mut follower_list: Vec<String> = shared.iter().chain(only_followers).cloned().collect();
    let mut following_list: Vec<String> = shared.iter().chain(only_following).cloned().collect();
    follower_list.shuffle(rng);
    following_list.shuffle(rng);

    (follower_list, following_list)
}

/// Consistent real-handle to placeholder mapping for anonymizing output.
#[derive(Debug, Default)]
pub struct Anonymizer {
    mapping: BTreeMap<String, String>,
    used: HashSet<String>,
}

impl Anonymizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder for `handle`, allocating a new one on first sight.
    pub fn alias<R: Rng>(&mut self, rng: &mut R, handle: &str) -> String {
        if let Some(existing) = self.mapping.get(handle) {
            return existing.clone();
        }

        let mut candidate = placeholder_name(rng);
        while self.used.contains(&candidate) {
            candidate = format!("user_{}", self.used.len());
        }
        self.used.insert(candidate.clone());
        self.mapping.insert(handle.to_string(), candidate.clone());
        candidate
    }

    pub fn alias_all<R: Rng>(&mut self, rng: &mut R, handles: &[String]) -> Vec<String> {
        handles.iter().map(|h| self.alias(rng, h)).collect()
    }
}
