//! Cache tags and the tag invalidation index

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::fingerprint::Fingerprint;

/// A label declaring a data dependency.
///
/// Queries *provide* tags when they fulfill; mutations *invalidate* tags.
/// A general tag (no id) stands for every resource of its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Tag {
    /// A tag covering every resource of `kind`
    pub fn general(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// A tag for one resource
    pub fn specific(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }

    pub fn is_general(&self) -> bool {
        self.id.is_none()
    }

    /// Whether invalidating `self` affects an entry that provided `provided`
    pub fn matches(&self, provided: &Tag) -> bool {
        self.kind == provided.kind && (self.id.is_none() || self.id == provided.id)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.kind, id),
            None => f.write_str(&self.kind),
        }
    }
}

impl FromStr for Tag {
    type Err = String;

    /// Parses `Kind` or `Kind:id`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, id) = match s.split_once(':') {
            Some((kind, id)) => (kind, Some(id)),
            None => (s, None),
        };

        if kind.is_empty() {
            return Err(format!("Invalid tag '{s}': kind is empty"));
        }

        match id {
            Some("") => Err(format!("Invalid tag '{s}': id is empty")),
            Some(id) => Ok(Tag::specific(kind, id)),
            None => Ok(Tag::general(kind)),
        }
    }
}

/// Maps tags to the fingerprints stamped with them on their last
/// successful fetch.
///
/// Only back-references are held here; the request cache owns the entries
/// and keeps this index in step with them.
#[derive(Debug, Default)]
pub struct TagIndex {
    /// kind -> id (None for general) -> fingerprints
    by_kind: HashMap<String, HashMap<Option<String>, HashSet<Fingerprint>>>,
    by_fingerprint: HashMap<Fingerprint, Vec<Tag>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tags associated with `fingerprint`
    pub fn stamp(&mut self, fingerprint: &Fingerprint, tags: &[Tag]) {
        self.remove(fingerprint);

        if tags.is_empty() {
            return;
        }

        let mut unique: Vec<Tag> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.contains(tag) {
                unique.push(tag.clone());
            }
        }

        for tag in &unique {
            self.by_kind
                .entry(tag.kind.clone())
                .or_default()
                .entry(tag.id.clone())
                .or_default()
                .insert(fingerprint.clone());
        }
        self.by_fingerprint.insert(fingerprint.clone(), unique);
    }

    /// Union of fingerprints affected by invalidating any of `tags`
    pub fn lookup(&self, tags: &[Tag]) -> HashSet<Fingerprint> {
        let mut found = HashSet::new();

        for tag in tags {
            let Some(ids) = self.by_kind.get(&tag.kind) else {
                continue;
            };

            match &tag.id {
                None => {
                    for fingerprints in ids.values() {
                        found.extend(fingerprints.iter().cloned());
                    }
                }
                Some(_) => {
                    if let Some(fingerprints) = ids.get(&tag.id) {
                        found.extend(fingerprints.iter().cloned());
                    }
                }
            }
        }

        found
    }

    /// Drop every association for `fingerprint`
    pub fn remove(&mut self, fingerprint: &Fingerprint) {
        let Some(tags) = self.by_fingerprint.remove(fingerprint) else {
            return;
        };

        for tag in tags {
            let Some(ids) = self.by_kind.get_mut(&tag.kind) else {
                continue;
            };
            if let Some(fingerprints) = ids.get_mut(&tag.id) {
                fingerprints.remove(fingerprint);
                if fingerprints.is_empty() {
                    ids.remove(&tag.id);
                }
            }
            if ids.is_empty() {
                self.by_kind.remove(&tag.kind);
            }
        }
    }

    /// Tags currently stamped on `fingerprint`
    pub fn tags_of(&self, fingerprint: &Fingerprint) -> &[Tag] {
        self.by_fingerprint
            .get(fingerprint)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.by_fingerprint.contains_key(fingerprint)
    }

    /// Number of fingerprints with at least one tag
    pub fn len(&self) -> usize {
        self.by_fingerprint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_fingerprint.is_empty()
    }
}
