use std::collections::HashSet;

use anyhow::Context;
use serde::Serialize;

/// The document printed on stdout: `{"images": [...]}`.
#[derive(Debug, Serialize)]
pub struct ImageList {
    pub images: Vec<String>,
}

impl ImageList {
    pub fn new(images: Vec<String>) -> Self {
        Self {
            images: make_unique(images),
        }
    }

    pub fn sort(&mut self) {
        self.images.sort_unstable();
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, anyhow::Error> {
        if pretty {
            serde_json::to_string_pretty(self).context("cannot serialize image list")
        } else {
            serde_json::to_string(self).context("cannot serialize image list")
        }
    }
}

/// Collapses repeated entries. The order of the result is unspecified.
pub fn make_unique(images: Vec<String>) -> Vec<String> {
    images.into_iter().collect::<HashSet<_>>().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::images::{make_unique, ImageList};

    #[test]
    fn make_unique_keeps_every_value_once() {
        let input: Vec<String> = ["app:v1", "sidecar:v2", "app:v1", "app:v1", "nginx:1.27"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let unique = make_unique(input.clone());
        assert_eq!(unique.len(), 3);

        let unique_set: HashSet<&String> = unique.iter().collect();
        assert_eq!(unique_set.len(), unique.len(), "no duplicates");
        assert_eq!(unique_set, input.iter().collect::<HashSet<_>>());
    }

    #[test]
    fn make_unique_empty() {
        assert!(make_unique(Vec::new()).is_empty());
    }

    #[test]
    fn serializes_as_images_object() {
        let mut list = ImageList::new(vec![
            "sidecar:v2".to_string(),
            "app:v1".to_string(),
            "sidecar:v2".to_string(),
        ]);
        list.sort();
        assert_eq!(list.to_json(false).unwrap(), r#"{"images":["app:v1","sidecar:v2"]}"#);

        assert_eq!(ImageList::new(Vec::new()).to_json(false).unwrap(), r#"{"images":[]}"#);
    }

    #[test]
    fn pretty_output_parses_back() {
        let list = ImageList::new(vec!["app:v1".to_string()]);
        let json = list.to_json(true).unwrap();
        assert!(json.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["images"][0], "app:v1");
    }
}
