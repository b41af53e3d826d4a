//! Wire models for the upstream catalog API.
//!
//! Items are opaque: the core only needs a stable identity, so everything
//! besides `id` is kept as the raw JSON object and passed through untouched.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// Stable identity of a catalog item. Numeric ids are normalized to strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_owned())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A catalog record: an identity plus the untouched upstream object.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: ItemId,
    record: Map<String, Value>,
}

impl Item {
    /// Build an item from an upstream JSON object. Returns `None` when the
    /// value is not an object or carries no usable `id`.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(record) = value else {
            return None;
        };
        let id = record.get("id").and_then(ItemId::from_json)?;
        Some(Self { id, record })
    }

    /// Convenience constructor for an item with a display name.
    pub fn named(id: impl Into<String>, name: &str) -> Self {
        let id = ItemId::new(id);
        let mut record = Map::new();
        record.insert("id".to_owned(), Value::String(id.0.clone()));
        record.insert("name".to_owned(), Value::String(name.to_owned()));
        Self { id, record }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.field("name").and_then(Value::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }

    /// Overlay fields from a detail record. The identity never changes.
    pub fn absorb(&mut self, detail: &Item) {
        for (key, value) in &detail.record {
            if key != "id" {
                self.record.insert(key.clone(), value.clone());
            }
        }
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

/// Envelope returned by every catalog endpoint.
///
/// Every field is optional on purpose: a body missing `data` is still a
/// successful response (zero results), not a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Option<Vec<Value>>,
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
    #[serde(default)]
    pub has_more: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub cursor: Option<CursorMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CursorMeta {
    #[serde(default)]
    pub next: Option<String>,
}

impl CatalogResponse {
    /// Build a well-formed response, mostly useful for fakes and tests.
    pub fn page(items: &[Item], next_cursor: Option<&str>, has_more: Option<bool>) -> Self {
        Self {
            success: Some(true),
            data: Some(
                items
                    .iter()
                    .map(|item| Value::Object(item.record.clone()))
                    .collect(),
            ),
            meta: Some(ResponseMeta {
                cursor: Some(CursorMeta {
                    next: next_cursor.map(str::to_owned),
                }),
            }),
            has_more,
        }
    }

    /// The continuation token, with blank tokens treated as absent.
    pub fn next_cursor(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.cursor.as_ref())
            .and_then(|c| c.next.as_deref())
            .filter(|c| !c.is_empty())
    }

    /// Whether another page can be requested.
    ///
    /// An explicit `has_more: false` wins; otherwise the presence of a next
    /// cursor decides. Without a cursor there is nothing to continue from, so
    /// `has_more: true` alone is not enough.
    pub fn has_more(&self) -> bool {
        self.next_cursor().is_some() && self.has_more.unwrap_or(true)
    }

    pub fn data_present(&self) -> bool {
        self.data.is_some()
    }

    /// Convert the raw `data` array into items, dropping records without an id.
    pub fn items(&self) -> Vec<Item> {
        let Some(data) = &self.data else {
            return Vec::new();
        };
        data.iter()
            .cloned()
            .filter_map(|value| {
                let item = Item::from_value(value);
                if item.is_none() {
                    warn!("dropping catalog record without a usable id");
                }
                item
            })
            .collect()
    }
}

/// One page of results as handed to callers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub items: Vec<Item>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}
