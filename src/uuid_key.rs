//! UUID key behavior - creation-time assignment, lookup scopes, and the
//! textual view over binary UUID columns
//!
//! The text variant stores the canonical hyphenated form; the binary variant
//! stores the packed 16 bytes and exposes a derived `uuid_text` view so the
//! raw bytes never leak through an API surface.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::{HasBinaryUuidColumn, HasUuidColumn};
use crate::query::QueryBuilder;
use crate::uuid_codec;

/// Assign a freshly generated UUID at creation time if the column is empty.
///
/// Never regenerates: an already-populated column is left alone.
pub fn assign_uuid<M: HasUuidColumn>(model: &mut M) {
    if model.uuid_value().is_none() {
        model.set_uuid_value(uuid_codec::generate().hyphenated().to_string());
    }
}

/// Binary-column variant of [`assign_uuid`]: stores the packed bytes.
pub fn assign_binary_uuid<M: HasBinaryUuidColumn>(model: &mut M) {
    if model.uuid_bytes().is_none() {
        let text = uuid_codec::generate().hyphenated().to_string();
        model.set_uuid_bytes(uuid_codec::encode(text.as_bytes()));
    }
}

/// Filter a query by a single UUID value
pub fn by_uuid<M: HasUuidColumn>(query: QueryBuilder<M>, uuid: &str) -> QueryBuilder<M> {
    query.where_eq(&M::qualified_uuid_column(), uuid)
}

/// Filter a query by membership in a set of UUID values
pub fn by_uuids<M: HasUuidColumn>(query: QueryBuilder<M>, uuids: &[&str]) -> QueryBuilder<M> {
    query.where_in(
        &M::qualified_uuid_column(),
        uuids.iter().map(|u| u.to_string()).collect(),
    )
}

/// Filter a binary-column query by a single UUID; the input may be UUID
/// text or already-packed bytes
pub fn by_binary_uuid<M: HasBinaryUuidColumn>(
    query: QueryBuilder<M>,
    uuid: &[u8],
) -> QueryBuilder<M> {
    let encoded = uuid_codec::encode(uuid);
    query.where_raw(&format!(
        "{} = {}",
        M::qualified_uuid_column(),
        binary_literal(&encoded)
    ))
}

/// Filter a binary-column query by membership in a set of UUIDs; each input
/// may be UUID text or already-packed bytes
pub fn by_binary_uuids<M: HasBinaryUuidColumn>(
    query: QueryBuilder<M>,
    uuids: &[&[u8]],
) -> QueryBuilder<M> {
    let literals: Vec<String> = uuids
        .iter()
        .map(|uuid| binary_literal(&uuid_codec::encode(uuid)))
        .collect();
    query.where_raw(&format!(
        "{} IN ({})",
        M::qualified_uuid_column(),
        literals.join(", ")
    ))
}

/// Derived textual view of the binary UUID column
pub fn uuid_text<M: HasBinaryUuidColumn>(model: &M) -> Option<String> {
    model.uuid_bytes().map(|bytes| uuid_codec::decode(&bytes))
}

/// Assign through the textual view: stores the packed form
pub fn set_uuid_text<M: HasBinaryUuidColumn>(model: &mut M, uuid: &str) {
    model.set_uuid_bytes(uuid_codec::encode(uuid.as_bytes()));
}

/// Field map for external serialization: the raw binary UUID column is
/// replaced with its decoded text so opaque bytes never reach callers
pub fn to_api_fields<M: HasBinaryUuidColumn>(model: &M) -> HashMap<String, Value> {
    let mut fields = model.to_fields();
    if let Some(bytes) = model.uuid_bytes() {
        fields.insert(
            M::uuid_column().to_string(),
            Value::String(uuid_codec::decode(&bytes)),
        );
    }
    fields
}

/// Render packed bytes as a hex blob literal; pass-through values that were
/// never UUID-shaped render as an escaped string instead
fn binary_literal(bytes: &[u8]) -> String {
    if bytes.len() == 16 {
        let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        format!("X'{}'", hex)
    } else {
        let text = String::from_utf8_lossy(bytes);
        format!("'{}'", text.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolsResult;
    use crate::model::Model;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Device {
        id: Option<i64>,
        uuid: Option<Vec<u8>>,
        name: String,
    }

    impl Model for Device {
        type PrimaryKey = i64;

        fn table_name() -> &'static str {
            "devices"
        }

        fn primary_key(&self) -> Option<i64> {
            self.id
        }

        fn set_primary_key(&mut self, key: i64) {
            self.id = Some(key);
        }

        fn from_row(_row: &sqlx::postgres::PgRow) -> ToolsResult<Self> {
            unimplemented!("not exercised in tests")
        }

        fn to_fields(&self) -> HashMap<String, Value> {
            let mut fields = HashMap::new();
            if let Some(uuid) = &self.uuid {
                fields.insert(
                    "uuid".to_string(),
                    Value::String(String::from_utf8_lossy(uuid).into_owned()),
                );
            }
            fields.insert("name".to_string(), Value::String(self.name.clone()));
            fields
        }
    }

    impl HasBinaryUuidColumn for Device {
        fn uuid_bytes(&self) -> Option<Vec<u8>> {
            self.uuid.clone()
        }

        fn set_uuid_bytes(&mut self, bytes: Vec<u8>) {
            self.uuid = Some(bytes);
        }
    }

    fn fresh_device() -> Device {
        Device {
            id: Some(1),
            uuid: None,
            name: "sensor".to_string(),
        }
    }

    #[test]
    fn test_assign_binary_uuid_fills_empty_column_once() {
        let mut device = fresh_device();
        assign_binary_uuid(&mut device);

        let assigned = device.uuid_bytes().expect("uuid was assigned");
        assert_eq!(assigned.len(), 16);

        assign_binary_uuid(&mut device);
        assert_eq!(device.uuid_bytes().unwrap(), assigned);
    }

    #[test]
    fn test_uuid_text_round_trips_through_the_accessor() {
        let mut device = fresh_device();
        let uuid = "49d9f4ee-dc87-4f34-af56-0b75e2dfb456";

        set_uuid_text(&mut device, uuid);
        assert_eq!(device.uuid_bytes().unwrap().len(), 16);
        assert_eq!(uuid_text(&device).unwrap(), uuid);
    }

    #[test]
    fn test_by_binary_uuid_accepts_text_or_bytes() {
        let uuid = "49d9f4ee-dc87-4f34-af56-0b75e2dfb456";
        let packed = uuid_codec::encode(uuid.as_bytes());

        let from_text = by_binary_uuid(QueryBuilder::<Device>::for_model(), uuid.as_bytes());
        let from_bytes = by_binary_uuid(QueryBuilder::<Device>::for_model(), &packed);

        assert_eq!(from_text.to_sql(), from_bytes.to_sql());
        assert!(from_text.to_sql().contains("devices.uuid = X'"));
    }

    #[test]
    fn test_by_binary_uuids_builds_a_membership_filter() {
        let a = "49d9f4ee-dc87-4f34-af56-0b75e2dfb456";
        let b = "05bfc963-14c1-4afc-a727-163e8fd9d7bf";

        let query = by_binary_uuids(
            QueryBuilder::<Device>::for_model(),
            &[a.as_bytes(), b.as_bytes()],
        );
        let sql = query.to_sql();

        assert!(sql.contains("devices.uuid IN (X'"));
        assert!(sql.contains(", X'"));
    }

    #[test]
    fn test_api_fields_substitute_decoded_text_for_raw_bytes() {
        let mut device = fresh_device();
        let uuid = "49d9f4ee-dc87-4f34-af56-0b75e2dfb456";
        set_uuid_text(&mut device, uuid);

        let fields = to_api_fields(&device);
        assert_eq!(fields.get("uuid"), Some(&Value::String(uuid.to_string())));
    }
}
