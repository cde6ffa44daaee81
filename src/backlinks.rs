use std::collections::{HashMap, HashSet};

use crate::links::LinkResolver;
use crate::markup;
use crate::note::Note;

/// Reverse link relation for one scan: target path -> linking notes.
///
/// Each linking note is recorded once per target no matter how many links
/// it holds, and a note never counts as its own backlink.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BacklinkIndex {
    sources: HashMap<String, Vec<String>>,
}

impl BacklinkIndex {
    pub fn build(notes: &[Note], resolver: &LinkResolver<'_>) -> Self {
        let mut sources: HashMap<String, Vec<String>> = HashMap::new();
        for source in notes {
            let mut seen: HashSet<&str> = HashSet::new();
            for token in markup::link_tokens(&source.content) {
                let Some(target) = resolver.resolve(source, token.target) else {
                    continue;
                };
                if target.relative_path == source.relative_path
                    || !seen.insert(target.relative_path.as_str())
                {
                    continue;
                }
                sources
                    .entry(target.relative_path.clone())
                    .or_default()
                    .push(source.relative_path.clone());
            }
        }

        let titles: HashMap<&str, String> = notes
            .iter()
            .map(|n| (n.relative_path.as_str(), n.title.to_lowercase()))
            .collect();
        for list in sources.values_mut() {
            list.sort_by_cached_key(|path| {
                let title = titles.get(path.as_str()).cloned().unwrap_or_default();
                (title, path.to_lowercase())
            });
        }
        Self { sources }
    }

    /// Relative paths of the notes linking to `key`, ordered by title.
    pub fn sources(&self, key: &str) -> &[String] {
        self.sources.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, key: &str) -> usize {
        self.sources(key).len()
    }

    /// The linking notes themselves, in the same order as [`Self::sources`].
    pub fn backlinks_of<'n>(&self, notes: &'n [Note], key: &str) -> Vec<&'n Note> {
        self.sources(key)
            .iter()
            .filter_map(|path| notes.iter().find(|n| &n.relative_path == path))
            .collect()
    }
}
