//! File reference extraction from result payloads.

use presale_models::{FileReference, PayloadNode, DEFAULT_MIME_TYPE};

/// Key names that mark a mapping as a file descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileKeys {
    /// Key holding the download URL.
    pub url: String,
    /// Key holding the file name.
    pub name: String,
    /// Optional key holding the MIME type.
    pub mime: String,
}

impl Default for FileKeys {
    fn default() -> Self {
        Self {
            url: "fileUrl".to_string(),
            name: "fileName".to_string(),
            mime: "mimeType".to_string(),
        }
    }
}

/// Collects file descriptors from an arbitrarily nested payload.
///
/// Every mapping that carries both a URL and a name yields one reference;
/// the walk always continues into the mapping's values and into sequence
/// elements, so descriptors nested inside descriptors are found too.
/// Descriptors with only one of the two keys, or with a non-text or empty
/// value under either, are skipped. Emission follows depth-first traversal
/// order, which callers should not read meaning into.
#[derive(Debug, Clone, Default)]
pub struct FileReferenceExtractor {
    keys: FileKeys,
}

impl FileReferenceExtractor {
    /// Creates an extractor with the default keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an extractor with custom keys.
    pub fn with_keys(keys: FileKeys) -> Self {
        Self { keys }
    }

    /// Walks `root` and returns every file reference found.
    pub fn extract(&self, root: &PayloadNode) -> Vec<FileReference> {
        let mut found = Vec::new();
        self.walk(root, &mut found);
        found
    }

    fn walk(&self, node: &PayloadNode, found: &mut Vec<FileReference>) {
        match node {
            PayloadNode::Mapping(map) => {
                if let Some(reference) = self.as_reference(node) {
                    found.push(reference);
                }
                for child in map.values() {
                    self.walk(child, found);
                }
            }
            PayloadNode::Sequence(items) => {
                for item in items {
                    self.walk(item, found);
                }
            }
            PayloadNode::Scalar(_) => {}
        }
    }

    fn as_reference(&self, node: &PayloadNode) -> Option<FileReference> {
        let url = non_blank(node.get_str(&self.keys.url))?;
        let name = non_blank(node.get_str(&self.keys.name))?;
        let mime = non_blank(node.get_str(&self.keys.mime)).unwrap_or(DEFAULT_MIME_TYPE);

        Some(FileReference::new(url, name).with_mime_type(mime))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(value: serde_json::Value) -> Vec<FileReference> {
        FileReferenceExtractor::new().extract(&PayloadNode::from(value))
    }

    fn names(refs: &[FileReference]) -> Vec<&str> {
        let mut names: Vec<&str> = refs.iter().map(|r| r.display_name.as_str()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_top_level_descriptor() {
        let refs = extract(json!({
            "fileUrl": "https://cdn/a.pdf",
            "fileName": "a.pdf",
            "mimeType": "application/pdf"
        }));
        assert_eq!(
            refs,
            vec![FileReference::new("https://cdn/a.pdf", "a.pdf").with_mime_type("application/pdf")]
        );
    }

    #[test]
    fn test_mime_defaults() {
        let refs = extract(json!({"fileUrl": "u", "fileName": "n"}));
        assert_eq!(refs[0].mime_type, DEFAULT_MIME_TYPE);

        let refs = extract(json!({"fileUrl": "u", "fileName": "n", "mimeType": 3}));
        assert_eq!(refs[0].mime_type, DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_deeply_nested_and_array_wrapped() {
        let refs = extract(json!({
            "status": "completed",
            "output": [
                {"content": [[{"fileUrl": "u1", "fileName": "Deal_Brief.pdf"}]]},
                {"attachments": {"deep": {"deeper": [{"fileUrl": "u2", "fileName": "MAP.xlsx"}]}}}
            ],
            "extra": [[[[{"fileUrl": "u3", "fileName": "Sources.md"}]]]]
        }));
        assert_eq!(names(&refs), vec!["Deal_Brief.pdf", "MAP.xlsx", "Sources.md"]);
    }

    #[test]
    fn test_partial_descriptors_skipped() {
        let refs = extract(json!([
            {"fileUrl": "only-url"},
            {"fileName": "only-name.pdf"},
            {"fileUrl": "", "fileName": "empty-url.pdf"},
            {"fileUrl": 12, "fileName": "numeric-url.pdf"},
            {"fileUrl": "u", "fileName": null}
        ]));
        assert!(refs.is_empty());
    }

    #[test]
    fn test_descriptor_inside_descriptor() {
        let refs = extract(json!({
            "fileUrl": "outer",
            "fileName": "outer.zip",
            "parts": [{"fileUrl": "inner", "fileName": "inner.txt"}]
        }));
        assert_eq!(names(&refs), vec!["inner.txt", "outer.zip"]);
    }

    #[test]
    fn test_scalars_and_empty_containers() {
        assert!(extract(json!(null)).is_empty());
        assert!(extract(json!("fileUrl")).is_empty());
        assert!(extract(json!([])).is_empty());
        assert!(extract(json!({})).is_empty());
    }

    #[test]
    fn test_custom_keys() {
        let extractor = FileReferenceExtractor::with_keys(FileKeys {
            url: "url".into(),
            name: "name".into(),
            mime: "type".into(),
        });
        let refs = extractor.extract(&PayloadNode::from(json!({
            "files": [{"url": "u", "name": "n.docx", "type": "application/msword"}],
            "ignored": {"fileUrl": "x", "fileName": "y"}
        })));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].mime_type, "application/msword");
    }

    #[test]
    fn test_one_reference_per_matching_node() {
        // Two identical descriptors at different places are two references.
        let refs = extract(json!({
            "a": {"fileUrl": "u", "fileName": "same.pdf"},
            "b": [{"fileUrl": "u", "fileName": "same.pdf"}]
        }));
        assert_eq!(refs.len(), 2);
    }
}
