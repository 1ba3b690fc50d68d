//! Translation between storage query types and BSON documents.

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson, Document, doc};
use operator_repo_storage::{ID_FIELD, Operator, OperatorFilter, OperatorPatch, SortSpec};
use tracing::warn;

use crate::error::{MongoError, Result};

/// Builds the query document for `filter`.
///
/// Ids that are not valid object ids cannot exist in the collection, so they
/// are dropped from the `$in` list rather than rejected.
pub fn filter_document(filter: &OperatorFilter) -> Document {
    let mut clauses: Vec<Document> = Vec::new();

    if let Some(ids) = &filter.ids {
        let oids: Vec<Bson> = ids
            .iter()
            .filter_map(|id| ObjectId::parse_str(id).ok())
            .map(Bson::ObjectId)
            .collect();
        clauses.push(doc! { "_id": { "$in": oids } });
    }

    if let Some(owner) = &filter.owner {
        clauses.push(doc! { "userId": owner.as_str() });
    }

    if let Some(caller) = &filter.visible_to {
        clauses.push(doc! {
            "$or": [ { "pub": true }, { "userId": caller.as_str() } ]
        });
    }

    if let Some(pattern) = &filter.name_pattern {
        clauses.push(doc! { "name": { "$regex": pattern.as_str() } });
    }

    match clauses.len() {
        0 => Document::new(),
        1 => clauses.pop().unwrap_or_default(),
        _ => doc! { "$and": clauses },
    }
}

/// Builds the sort document: the requested key, then `_id` ascending.
pub fn sort_document(sort: &SortSpec) -> Document {
    let mut document = Document::new();
    document.insert(sort.store_field(), sort.direction.as_i32());
    if !sort.is_id() {
        document.insert(ID_FIELD, 1);
    }
    document
}

/// Builds the `$set` body for `patch`. Empty when the patch changes nothing.
pub fn patch_document(patch: &OperatorPatch) -> Result<Document> {
    Ok(bson::to_document(patch)?)
}

/// Converts a stored document into an [`Operator`], rendering `_id` as hex.
pub fn document_to_operator(mut document: Document) -> Result<Operator> {
    match document.remove(ID_FIELD) {
        Some(Bson::ObjectId(oid)) => {
            document.insert(ID_FIELD, oid.to_hex());
        }
        Some(Bson::String(id)) => {
            document.insert(ID_FIELD, id);
        }
        Some(other) => {
            return Err(MongoError::bson(format!(
                "unsupported _id type: {:?}",
                other.element_type()
            )));
        }
        None => return Err(MongoError::bson("document without _id")),
    }
    Ok(bson::from_document(document)?)
}

/// Decodes a listing, skipping documents that do not fit the operator shape.
pub fn decode_documents(documents: Vec<Document>) -> Vec<Operator> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get(ID_FIELD).map(ToString::to_string);
            match document_to_operator(document) {
                Ok(operator) => Some(operator),
                Err(e) => {
                    warn!(id = ?id, error = %e, "skipping undecodable operator document");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use operator_repo_storage::{IoField, SortDirection};

    const OID: &str = "65f0c0ffee0000000000abcd";

    #[test]
    fn empty_filter_matches_everything() {
        assert!(filter_document(&OperatorFilter::new()).is_empty());
    }

    #[test]
    fn single_clause_is_not_wrapped() {
        let filter = OperatorFilter::new().with_owner("alice");
        assert_eq!(filter_document(&filter), doc! { "userId": "alice" });
    }

    #[test]
    fn list_filter_combines_visibility_and_search() {
        let filter = OperatorFilter::new()
            .visible_to("bob")
            .with_name_pattern("add");
        let expected = doc! {
            "$and": [
                { "$or": [ { "pub": true }, { "userId": "bob" } ] },
                { "name": { "$regex": "add" } },
            ]
        };
        assert_eq!(filter_document(&filter), expected);
    }

    #[test]
    fn ids_become_object_ids_and_invalid_ones_are_dropped() {
        let filter = OperatorFilter::new()
            .with_ids(vec![OID.into(), "nope".into()])
            .with_owner("alice");
        let oid = ObjectId::parse_str(OID).unwrap();
        let expected = doc! {
            "$and": [
                { "_id": { "$in": [ oid ] } },
                { "userId": "alice" },
            ]
        };
        assert_eq!(filter_document(&filter), expected);
    }

    #[test]
    fn sort_appends_id_tie_break() {
        let sort = SortSpec::new("name", SortDirection::Desc);
        assert_eq!(sort_document(&sort), doc! { "name": -1, "_id": 1 });

        let sort = SortSpec::new("id", SortDirection::Desc);
        assert_eq!(sort_document(&sort), doc! { "_id": -1 });
    }

    #[test]
    fn patch_only_contains_present_fields() {
        let patch = OperatorPatch {
            public: Some(Some(true)),
            inputs: Some(Some(vec![IoField::new("a", "int")])),
            ..OperatorPatch::default()
        };
        let document = patch_document(&patch).unwrap();
        assert_eq!(
            document,
            doc! { "pub": true, "inputs": [ { "name": "a", "type": "int" } ] }
        );
        assert!(
            patch_document(&OperatorPatch::default())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn stored_document_decodes_with_hex_id() {
        let oid = ObjectId::parse_str(OID).unwrap();
        let document = doc! {
            "_id": oid,
            "name": "adder",
            "pub": false,
            "outputs": [ { "name": "sum", "type": "float" } ],
            "userId": "alice",
        };
        let operator = document_to_operator(document).unwrap();
        assert_eq!(operator.id, OID);
        assert_eq!(operator.public, Some(false));
        assert_eq!(operator.outputs, Some(vec![IoField::new("sum", "float")]));
        assert!(operator.inputs.is_none());
    }

    #[test]
    fn null_patch_fields_are_set_to_null() {
        let patch: OperatorPatch = serde_json::from_value(serde_json::json!({
            "description": null,
            "outputs": null,
            "image": "repo/adder:2"
        }))
        .unwrap();
        let document = patch_document(&patch).unwrap();
        assert_eq!(
            document,
            doc! { "image": "repo/adder:2", "description": Bson::Null, "outputs": Bson::Null }
        );
    }

    #[test]
    fn partial_legacy_document_decodes() {
        let oid = ObjectId::parse_str(OID).unwrap();
        let operator = document_to_operator(doc! { "_id": oid, "name": "legacy" }).unwrap();
        assert_eq!(operator.name, "legacy");
        assert_eq!(operator.user_id, "");

        let operator = document_to_operator(doc! { "_id": oid, "userId": "alice" }).unwrap();
        assert_eq!(operator.name, "");
        assert_eq!(operator.user_id, "alice");
    }

    #[test]
    fn undecodable_documents_are_skipped_in_listings() {
        let oid = ObjectId::parse_str(OID).unwrap();
        let documents = vec![
            doc! { "_id": ObjectId::new(), "name": "ok", "userId": "alice" },
            doc! { "_id": oid, "name": 42, "userId": "alice" },
            doc! { "name": "no id" },
            doc! { "_id": ObjectId::new(), "name": "legacy" },
        ];
        let operators = decode_documents(documents);
        let names: Vec<&str> = operators.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["ok", "legacy"]);
    }

    #[test]
    fn document_without_id_is_rejected() {
        let err = document_to_operator(doc! { "name": "x", "userId": "u" }).unwrap_err();
        assert!(matches!(err, MongoError::Bson { .. }));
    }
}
