//! Discovery of content links and references embedded in JSON bodies.
//!
//! A reference is any object whose `_meta.schema` ends with
//! `/definitions/content-link` or `/definitions/content-reference`. Inside a
//! slot body its `id` holds a snapshot id and `_meta.rootContentItemId` the
//! content item the snapshot was taken from.
//!
//! Scanning yields descriptors in depth-first document order. Each descriptor
//! carries a JSON pointer to the reference object, so the original document
//! can be rewritten in place without copying the tree:
//!
//! ```ignore
//! for mut dep in DependencyScanner::scan(&content) {
//!     dep.set_id(&mut content, "new-snapshot-id");
//! }
//! ```

use serde_json::{Map, Value};

pub const CONTENT_LINK_SCHEMA: &str =
    "http://bigcontent.io/cms/schema/v1/core#/definitions/content-link";
pub const CONTENT_REFERENCE_SCHEMA: &str =
    "http://bigcontent.io/cms/schema/v1/core#/definitions/content-reference";

const LINK_SUFFIX: &str = "/definitions/content-link";
const REFERENCE_SUFFIX: &str = "/definitions/content-reference";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Link,
    Reference,
}

impl DependencyKind {
    fn from_schema(schema: &str) -> Option<Self> {
        if schema.ends_with(LINK_SUFFIX) {
            Some(Self::Link)
        } else if schema.ends_with(REFERENCE_SUFFIX) {
            Some(Self::Reference)
        } else {
            None
        }
    }
}

/// A reference found in a document, addressed by JSON pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentDependency {
    /// RFC 6901 pointer from the scanned root to the reference object.
    pub pointer: String,
    pub kind: DependencyKind,
    /// The referenced id; a snapshot id in slot bodies.
    pub id: Option<String>,
    pub root_content_item_id: Option<String>,
    pub content_type: Option<String>,
    pub locked: Option<bool>,
}

impl ContentDependency {
    fn from_object(pointer: String, kind: DependencyKind, object: &Map<String, Value>) -> Self {
        let meta = object.get("_meta");
        let meta_str = |key: &str| {
            meta.and_then(|m| m.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Self {
            pointer,
            kind,
            id: object.get("id").and_then(Value::as_str).map(str::to_string),
            root_content_item_id: meta_str("rootContentItemId"),
            content_type: object
                .get("contentType")
                .and_then(Value::as_str)
                .map(str::to_string),
            locked: meta.and_then(|m| m.get("locked")).and_then(Value::as_bool),
        }
    }

    /// The live reference object inside `root`.
    pub fn target_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Map<String, Value>> {
        root.pointer_mut(&self.pointer)?.as_object_mut()
    }

    /// Rewrite the reference's `id` in `root`. Returns false if the pointer no longer resolves.
    pub fn set_id(&mut self, root: &mut Value, id: &str) -> bool {
        let Some(target) = self.target_mut(root) else {
            return false;
        };
        target.insert("id".to_string(), Value::String(id.to_string()));
        self.id = Some(id.to_string());
        true
    }

    /// Rewrite `_meta.rootContentItemId` in `root`.
    pub fn set_root_content_item_id(&mut self, root: &mut Value, id: &str) -> bool {
        let Some(target) = self.target_mut(root) else {
            return false;
        };
        let meta = target
            .entry("_meta")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(meta) = meta.as_object_mut() else {
            return false;
        };
        meta.insert(
            "rootContentItemId".to_string(),
            Value::String(id.to_string()),
        );
        self.root_content_item_id = Some(id.to_string());
        true
    }
}

/// Stateless scanner; every call walks the document afresh.
pub struct DependencyScanner;

impl DependencyScanner {
    /// All references in `root`, depth-first in document order.
    ///
    /// The body of a reference is not searched further.
    pub fn scan(root: &Value) -> Vec<ContentDependency> {
        let mut found = Vec::new();
        let mut pointer = String::new();
        Self::visit(root, &mut pointer, &mut found);
        found
    }

    fn visit(value: &Value, pointer: &mut String, found: &mut Vec<ContentDependency>) {
        match value {
            Value::Object(object) => {
                if let Some(kind) = schema_of(object).and_then(DependencyKind::from_schema) {
                    found.push(ContentDependency::from_object(pointer.clone(), kind, object));
                    return;
                }
                for (key, child) in object {
                    let len = pointer.len();
                    push_token(pointer, key);
                    Self::visit(child, pointer, found);
                    pointer.truncate(len);
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    let len = pointer.len();
                    pointer.push('/');
                    pointer.push_str(&index.to_string());
                    Self::visit(child, pointer, found);
                    pointer.truncate(len);
                }
            }
            _ => {}
        }
    }
}

fn schema_of(object: &Map<String, Value>) -> Option<&str> {
    object.get("_meta")?.get("schema")?.as_str()
}

fn push_token(pointer: &mut String, key: &str) {
    pointer.push('/');
    for c in key.chars() {
        match c {
            '~' => pointer.push_str("~0"),
            '/' => pointer.push_str("~1"),
            _ => pointer.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn link(id: &str, item: &str) -> Value {
        json!({
            "_meta": { "schema": CONTENT_LINK_SCHEMA, "rootContentItemId": item, "locked": true },
            "contentType": "https://schema.example/banner.json",
            "id": id
        })
    }

    fn reference(id: &str, item: &str) -> Value {
        json!({
            "_meta": { "schema": CONTENT_REFERENCE_SCHEMA, "rootContentItemId": item },
            "contentType": "https://schema.example/promo.json",
            "id": id
        })
    }

    fn slot_body() -> Value {
        json!({
            "_meta": { "schema": "https://schema.example/slot.json", "name": "homepage" },
            "banners": [ link("snap-a", "item-a") ],
            "hero": reference("snap-b", "item-b"),
            "layout": { "column": { "promo": reference("snap-c", "item-c") } },
            "title": { "text": "Not a reference", "_meta": { "name": "plain" } }
        })
    }

    #[test]
    fn finds_references_in_document_order() {
        let found = DependencyScanner::scan(&slot_body());

        let ids: Vec<_> = found.iter().map(|d| d.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["snap-a", "snap-b", "snap-c"]);

        assert_eq!(found[0].pointer, "/banners/0");
        assert_eq!(found[0].kind, DependencyKind::Link);
        assert_eq!(found[0].locked, Some(true));
        assert_eq!(found[1].pointer, "/hero");
        assert_eq!(found[1].kind, DependencyKind::Reference);
        assert_eq!(found[2].pointer, "/layout/column/promo");
        assert_eq!(found[2].root_content_item_id.as_deref(), Some("item-c"));
        assert_eq!(
            found[2].content_type.as_deref(),
            Some("https://schema.example/promo.json")
        );
    }

    #[test]
    fn empty_bodies_have_no_references() {
        assert!(DependencyScanner::scan(&Value::Null).is_empty());
        assert!(DependencyScanner::scan(&json!({})).is_empty());
        assert!(DependencyScanner::scan(&json!([1, "two", { "three": 3 }])).is_empty());
    }

    #[test]
    fn rewrites_in_place() {
        let mut body = slot_body();
        let mut found = DependencyScanner::scan(&body);

        assert!(found[2].set_id(&mut body, "dest-snap"));
        assert!(found[2].set_root_content_item_id(&mut body, "dest-item"));

        assert_eq!(body["layout"]["column"]["promo"]["id"], "dest-snap");
        assert_eq!(
            body["layout"]["column"]["promo"]["_meta"]["rootContentItemId"],
            "dest-item"
        );
        assert_eq!(found[2].id.as_deref(), Some("dest-snap"));
        // untouched neighbours
        assert_eq!(body["hero"]["id"], "snap-b");

        // scanning again sees the rewritten values
        let again = DependencyScanner::scan(&body);
        assert_eq!(again[2].id.as_deref(), Some("dest-snap"));
    }

    #[test]
    fn pointer_escapes_special_keys() {
        let mut body = json!({ "a/b": { "c~d": link("snap", "item") } });
        let mut found = DependencyScanner::scan(&body);
        assert_eq!(found[0].pointer, "/a~1b/c~0d");
        assert!(found[0].set_id(&mut body, "changed"));
        assert_eq!(body["a/b"]["c~d"]["id"], "changed");
    }

    #[test]
    fn reference_at_root() {
        let mut body = reference("root-snap", "root-item");
        let mut found = DependencyScanner::scan(&body);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pointer, "");
        assert!(found[0].set_id(&mut body, "new"));
        assert_eq!(body["id"], "new");
    }
}
