use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// A character's assets: locations → items → optional one level of sub-items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterAssets {
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: i64,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub type_id: i64,
    pub quantity: i64,
    pub contents: Vec<SubItem>,
}

/// Item stored inside a container item. Cannot hold further items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubItem {
    pub type_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetTreeError {
    #[error("asset tree must be an object keyed by location, found {0}")]
    NotAMapping(&'static str),
    #[error("{path}: missing `{field}`")]
    MissingField { path: String, field: &'static str },
    #[error("{path}: `{field}` has the wrong type")]
    WrongType { path: String, field: &'static str },
    #[error("{path}: quantity must be positive, got {quantity}")]
    NonPositiveQuantity { path: String, quantity: i64 },
}

impl CharacterAssets {
    /// Validate a raw asset mapping (`{ key: { location_id, contents: [...] } }`).
    ///
    /// `null` is an empty tree. Contents nested below sub-items are ignored
    /// with a warning.
    pub fn from_json(value: &Value) -> Result<Self, AssetTreeError> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => return Err(AssetTreeError::NotAMapping(json_kind(other))),
        };

        let mut locations = Vec::with_capacity(map.len());
        for (key, record) in map {
            let path = format!("assets[{key}]");
            let record = as_object(record, &path)?;
            let id = int_field(record, &path, "location_id")?;
            let contents = array_field(record, &path, "contents")?
                .ok_or_else(|| missing(&path, "contents"))?;

            let mut items = Vec::with_capacity(contents.len());
            for (index, raw_item) in contents.iter().enumerate() {
                let item_path = format!("{path}.contents[{index}]");
                items.push(parse_item(raw_item, &item_path)?);
            }
            locations.push(Location { id, items });
        }

        Ok(Self { locations })
    }

    /// Number of asset lines (items plus sub-items).
    pub fn line_count(&self) -> usize {
        self.locations
            .iter()
            .flat_map(|location| &location.items)
            .map(|item| 1 + item.contents.len())
            .sum()
    }
}

fn parse_item(raw: &Value, path: &str) -> Result<Item, AssetTreeError> {
    let record = as_object(raw, path)?;
    let (type_id, quantity) = item_header(record, path)?;

    let mut contents = Vec::new();
    if let Some(children) = array_field(record, path, "contents")? {
        for (index, raw_child) in children.iter().enumerate() {
            let child_path = format!("{path}.contents[{index}]");
            let child = as_object(raw_child, &child_path)?;
            let (type_id, quantity) = item_header(child, &child_path)?;

            let nested = array_field(child, &child_path, "contents")?.map_or(0, Vec::len);
            if nested > 0 {
                warn!(path = %child_path, nested, "Ignoring assets nested below one container level");
            }
            contents.push(SubItem { type_id, quantity });
        }
    }

    Ok(Item { type_id, quantity, contents })
}

fn item_header(record: &Map<String, Value>, path: &str) -> Result<(i64, i64), AssetTreeError> {
    let type_id = int_field(record, path, "item_type_id")?;
    let quantity = int_field(record, path, "quantity")?;
    if quantity <= 0 {
        return Err(AssetTreeError::NonPositiveQuantity { path: path.to_string(), quantity });
    }
    Ok((type_id, quantity))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, AssetTreeError> {
    value.as_object().ok_or_else(|| AssetTreeError::WrongType {
        path: path.to_string(),
        field: "record",
    })
}

fn int_field(record: &Map<String, Value>, path: &str, field: &'static str) -> Result<i64, AssetTreeError> {
    match record.get(field) {
        None | Some(Value::Null) => Err(missing(path, field)),
        Some(value) => value.as_i64().ok_or_else(|| AssetTreeError::WrongType {
            path: path.to_string(),
            field,
        }),
    }
}

fn array_field<'a>(
    record: &'a Map<String, Value>,
    path: &str,
    field: &'static str,
) -> Result<Option<&'a Vec<Value>>, AssetTreeError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(values)) => Ok(Some(values)),
        Some(_) => Err(AssetTreeError::WrongType { path: path.to_string(), field }),
    }
}

fn missing(path: &str, field: &'static str) -> AssetTreeError {
    AssetTreeError::MissingField { path: path.to_string(), field }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
