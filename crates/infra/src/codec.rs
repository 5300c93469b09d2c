//! Mapping between stored documents and domain values.
//!
//! Field names follow the existing `Products` / `StockIncreases` /
//! `StockDecreases` / `Category` / `Languages` documents. Money is written as
//! a decimal string; numbers written by older clients are still accepted.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use stockledger_core::{Money, MovementId, ProductId};
use stockledger_inventory::{MovementKind, NewProduct, Product, ProductRecord, StockAdjusted, StockMovement};

use crate::document_store::{Collection, Document, FieldValue, StoreError, WriteFields};

pub mod product_keys {
    pub const NAME: &str = "productName";
    pub const STOCK: &str = "productStock";
    pub const INITIAL_STOCK: &str = "initialStock";
    pub const PURCHASE_PRICE: &str = "purchasePrice";
    pub const SALE_PRICE: &str = "salePrice";
    pub const DESCRIPTION: &str = "productDescription";
    pub const CATEGORY: &str = "category";
    pub const CREATED_AT: &str = "createdAt";
}

pub mod movement_keys {
    pub const PRODUCT_ID: &str = "productId";
    pub const CHANGE_AMOUNT: &str = "changeAmount";
    pub const UNIT_PRICE: &str = "unitPrice";
    pub const TOTAL_AMOUNT: &str = "totalAmount";
    pub const TIMESTAMP: &str = "timestamp";
}

pub const CATEGORY_NAME: &str = "name";
pub const LANGUAGE_NAME: &str = "languages";

/// RFC 3339, UTC, microsecond precision (`2024-03-01T09:00:00.000000Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Collection holding movements of `kind`.
pub fn movement_collection(kind: MovementKind) -> Collection {
    match kind {
        MovementKind::Increase => Collection::StockIncreases,
        MovementKind::Decrease => Collection::StockDecreases,
    }
}

pub fn new_product_fields(product: &NewProduct) -> WriteFields {
    use product_keys::*;

    let mut fields = WriteFields::new();
    fields.insert(NAME.into(), FieldValue::set(product.name()));
    fields.insert(STOCK.into(), FieldValue::set(product.initial_stock()));
    fields.insert(INITIAL_STOCK.into(), FieldValue::set(product.initial_stock()));
    fields.insert(PURCHASE_PRICE.into(), money_value(product.purchase_price()));
    fields.insert(SALE_PRICE.into(), money_value(product.sale_price()));
    fields.insert(
        DESCRIPTION.into(),
        FieldValue::Set(product.description().map(JsonValue::from).unwrap_or(JsonValue::Null)),
    );
    fields.insert(
        CATEGORY.into(),
        FieldValue::Set(product.category().map(JsonValue::from).unwrap_or(JsonValue::Null)),
    );
    fields.insert(CREATED_AT.into(), FieldValue::ServerTimestamp);
    fields
}

/// Product write applying the stock delta of `event` atomically.
pub fn stock_delta_fields(event: &StockAdjusted) -> WriteFields {
    let mut fields = WriteFields::new();
    fields.insert(
        product_keys::STOCK.into(),
        FieldValue::Increment(event.kind.signed(event.change_amount)),
    );
    fields
}

pub fn movement_fields(event: &StockAdjusted) -> WriteFields {
    use movement_keys::*;

    let mut fields = WriteFields::new();
    fields.insert(PRODUCT_ID.into(), FieldValue::set(event.product_id.to_string()));
    fields.insert(CHANGE_AMOUNT.into(), FieldValue::set(event.change_amount));
    fields.insert(UNIT_PRICE.into(), money_value(event.unit_price));
    fields.insert(TOTAL_AMOUNT.into(), money_value(event.total_amount));
    fields.insert(TIMESTAMP.into(), FieldValue::ServerTimestamp);
    fields
}

pub fn name_fields(collection: Collection, name: &str) -> WriteFields {
    let field = match collection {
        Collection::Languages => LANGUAGE_NAME,
        _ => CATEGORY_NAME,
    };
    let mut fields = WriteFields::new();
    fields.insert(field.into(), FieldValue::set(name));
    fields
}

pub fn decode_product(doc: &Document) -> Result<Product, StoreError> {
    use product_keys::*;

    let stock = int_field(doc, STOCK)?;
    let record = ProductRecord {
        id: doc.id.into(),
        version: doc.version,
        name: str_field(doc, NAME)?.to_string(),
        stock,
        // Products written before `initialStock` existed started at zero.
        initial_stock: opt_int_field(doc, INITIAL_STOCK)?.unwrap_or(0),
        purchase_price: money_field(doc, PURCHASE_PRICE)?,
        sale_price: money_field(doc, SALE_PRICE)?,
        description: opt_str_field(doc, DESCRIPTION)?,
        category: opt_str_field(doc, CATEGORY)?,
        created_at: opt_timestamp_field(doc, CREATED_AT)?.unwrap_or(doc.create_time),
    };

    Product::rehydrate(record).map_err(|e| StoreError::Decode(format!("product {}: {e}", doc.id)))
}

pub fn decode_movement(kind: MovementKind, doc: &Document) -> Result<StockMovement, StoreError> {
    use movement_keys::*;

    let raw_product = str_field(doc, PRODUCT_ID)?;
    let product_id = ProductId::from_str(raw_product)
        .map_err(|e| StoreError::Decode(format!("movement {}: {e}", doc.id)))?;

    let change_amount = int_field(doc, CHANGE_AMOUNT)?;
    if change_amount <= 0 {
        return Err(StoreError::Decode(format!(
            "movement {}: changeAmount must be positive (got {change_amount})",
            doc.id
        )));
    }

    Ok(StockMovement {
        id: MovementId::from(doc.id),
        product_id,
        kind,
        change_amount,
        unit_price: money_field(doc, UNIT_PRICE)?,
        total_amount: money_field(doc, TOTAL_AMOUNT)?,
        timestamp: opt_timestamp_field(doc, TIMESTAMP)?.unwrap_or(doc.create_time),
    })
}

pub fn decode_name(collection: Collection, doc: &Document) -> Result<String, StoreError> {
    let field = match collection {
        Collection::Languages => LANGUAGE_NAME,
        _ => CATEGORY_NAME,
    };
    Ok(str_field(doc, field)?.to_string())
}

fn money_value(money: Money) -> FieldValue {
    FieldValue::set(money.amount().to_string())
}

fn missing(doc: &Document, field: &str) -> StoreError {
    StoreError::Decode(format!("document {} is missing field '{field}'", doc.id))
}

fn wrong_type(doc: &Document, field: &str, expected: &str) -> StoreError {
    StoreError::Decode(format!("document {} field '{field}' is not {expected}", doc.id))
}

fn present<'a>(doc: &'a Document, field: &str) -> Option<&'a JsonValue> {
    doc.field(field).filter(|v| !v.is_null())
}

fn str_field<'a>(doc: &'a Document, field: &str) -> Result<&'a str, StoreError> {
    present(doc, field)
        .ok_or_else(|| missing(doc, field))?
        .as_str()
        .ok_or_else(|| wrong_type(doc, field, "a string"))
}

fn opt_str_field(doc: &Document, field: &str) -> Result<Option<String>, StoreError> {
    match present(doc, field) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| wrong_type(doc, field, "a string")),
    }
}

fn int_field(doc: &Document, field: &str) -> Result<i64, StoreError> {
    opt_int_field(doc, field)?.ok_or_else(|| missing(doc, field))
}

fn opt_int_field(doc: &Document, field: &str) -> Result<Option<i64>, StoreError> {
    match present(doc, field) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| wrong_type(doc, field, "an integer")),
    }
}

fn money_field(doc: &Document, field: &str) -> Result<Money, StoreError> {
    let value = present(doc, field).ok_or_else(|| missing(doc, field))?;
    let parsed = match value {
        JsonValue::String(s) => Decimal::from_str(s).ok(),
        JsonValue::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        _ => None,
    };
    parsed
        .map(Money::new)
        .ok_or_else(|| wrong_type(doc, field, "a decimal amount"))
}

fn opt_timestamp_field(doc: &Document, field: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
    match present(doc, field) {
        None => Ok(None),
        Some(JsonValue::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| wrong_type(doc, field, "an RFC 3339 timestamp")),
        Some(_) => Err(wrong_type(doc, field, "an RFC 3339 timestamp")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::{Map as JsonMap, json};
    use stockledger_core::DocumentId;

    fn doc(fields: JsonValue) -> Document {
        let now = Utc::now();
        let fields: JsonMap<String, JsonValue> = match fields {
            JsonValue::Object(map) => map,
            _ => JsonMap::new(),
        };
        Document {
            id: DocumentId::new(),
            version: 3,
            create_time: now,
            update_time: now,
            fields,
        }
    }

    fn resolved(fields: WriteFields) -> JsonValue {
        let map: JsonMap<String, JsonValue> = fields
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    FieldValue::Set(v) => v,
                    FieldValue::ServerTimestamp => json!("2024-03-01T09:00:00.000000Z"),
                    FieldValue::Increment(n) => json!(n),
                };
                (k, v)
            })
            .collect();
        JsonValue::Object(map)
    }

    #[test]
    fn product_fields_decode_back() {
        let np = NewProduct::new("Widget", 12, Money::new(dec!(5)), Money::new(dec!(8.50)))
            .unwrap()
            .with_category("Tools");
        let d = doc(resolved(new_product_fields(&np)));

        assert_eq!(d.fields["salePrice"], json!("8.50"));
        assert_eq!(d.fields["productDescription"], JsonValue::Null);

        let p = decode_product(&d).unwrap();
        assert_eq!(p.name(), "Widget");
        assert_eq!(p.stock(), 12);
        assert_eq!(p.initial_stock(), 12);
        assert_eq!(p.sale_price(), Money::new(dec!(8.50)));
        assert_eq!(p.category(), Some("Tools"));
        assert_eq!(p.description(), None);
        assert_eq!(p.created_at().to_rfc3339(), "2024-03-01T09:00:00+00:00");
    }

    #[test]
    fn numeric_prices_from_older_clients_are_accepted() {
        let d = doc(json!({
            "productName": "Legacy",
            "productStock": 4,
            "purchasePrice": 2.5,
            "salePrice": 3,
        }));
        let p = decode_product(&d).unwrap();
        assert_eq!(p.purchase_price(), Money::new(dec!(2.5)));
        assert_eq!(p.sale_price(), Money::new(dec!(3)));
        assert_eq!(p.initial_stock(), 0);
        assert_eq!(p.created_at(), d.create_time);
    }

    #[test]
    fn malformed_product_is_a_decode_error() {
        let cases = [
            json!({ "productStock": 1, "purchasePrice": "1", "salePrice": "1" }),
            json!({ "productName": "X", "productStock": "many", "purchasePrice": "1", "salePrice": "1" }),
            json!({ "productName": "X", "productStock": -1, "purchasePrice": "1", "salePrice": "1" }),
            json!({ "productName": "X", "productStock": 1, "purchasePrice": "cheap", "salePrice": "1" }),
        ];
        for case in cases {
            assert!(matches!(decode_product(&doc(case)), Err(StoreError::Decode(_))));
        }
    }

    #[test]
    fn movement_fields_decode_back() {
        let event = StockAdjusted {
            product_id: ProductId::new(),
            kind: MovementKind::Decrease,
            change_amount: 3,
            unit_price: Money::new(dec!(8)),
            total_amount: Money::new(dec!(24)),
        };
        let d = doc(resolved(movement_fields(&event)));
        let m = decode_movement(MovementKind::Decrease, &d).unwrap();

        assert_eq!(m.id, MovementId::from(d.id));
        assert_eq!(m.product_id, event.product_id);
        assert_eq!(m.change_amount, 3);
        assert_eq!(m.total_amount, Money::new(dec!(24)));
        assert_eq!(movement_collection(m.kind), Collection::StockDecreases);
    }

    #[test]
    fn stock_delta_is_signed() {
        let event = StockAdjusted {
            product_id: ProductId::new(),
            kind: MovementKind::Decrease,
            change_amount: 7,
            unit_price: Money::ZERO,
            total_amount: Money::ZERO,
        };
        assert_eq!(
            stock_delta_fields(&event).get("productStock"),
            Some(&FieldValue::Increment(-7))
        );
    }

    #[test]
    fn timestamps_use_micros_and_z() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T09:00:00.123456789Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(at), "2024-03-01T09:00:00.123456Z");
    }

    #[test]
    fn names_use_collection_specific_fields() {
        let d = doc(resolved(name_fields(Collection::Languages, "English")));
        assert_eq!(d.fields["languages"], json!("English"));
        assert_eq!(decode_name(Collection::Languages, &d).unwrap(), "English");
    }
}
