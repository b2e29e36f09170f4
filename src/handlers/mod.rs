// Route handlers, one module per resource.
//
// Handlers map a request straight onto a repository call and hand the raw
// store result back as the response body. There is no response envelope.

pub mod auth;
pub mod items;
pub mod overview;
pub mod profile;
pub mod system;

use serde_json::Value;

use crate::database::Document;

/// Copy `fields` out of a request body for a `$set`-style update.
/// Fields the body does not carry are set to null.
pub(crate) fn pick_fields(body: &Document, fields: &[&str]) -> Document {
    fields
        .iter()
        .map(|field| {
            let value = body.get(*field).cloned().unwrap_or(Value::Null);
            (field.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_listed_fields_and_nulls_missing_ones() {
        let body = json!({ "quantity": 3, "brand": "ignored" }).as_object().cloned().unwrap();
        let set = pick_fields(&body, &["quantity", "price"]);
        assert_eq!(Value::Object(set), json!({ "quantity": 3, "price": null }));
    }
}
