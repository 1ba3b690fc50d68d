//! Operator data model.
//!
//! Wire keys follow the registry's historical JSON shape (`_id`, `pub`,
//! `deploymentType`, `config_values`, `userId`), so field names are mapped
//! with serde renames rather than matching the Rust identifiers.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Maps both a missing key and an explicit `null` to `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Keeps a present `null` apart from a missing key: the key must be
/// `#[serde(default)]` so absence yields `None`, while `null` yields
/// `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A named, typed slot used for operator inputs, outputs and config values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IoField {
    /// Field name
    pub name: String,
    /// Field type
    #[serde(rename = "type")]
    pub field_type: String,
}

impl IoField {
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

/// An operator as stored and returned by the registry.
///
/// Every key is always present on the wire; unset optional values are
/// serialized as `null`. Documents written without `name` or `userId`
/// decode with an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Operator {
    /// Store-assigned identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Operator name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Name of the associated docker image
    #[serde(default)]
    pub image: Option<String>,
    /// Description of the operator
    #[serde(default)]
    pub description: Option<String>,
    /// Readable by every caller when `true`.
    #[serde(rename = "pub", default)]
    pub public: Option<bool>,
    #[serde(rename = "deploymentType", default)]
    pub deployment_type: Option<String>,
    #[serde(default)]
    pub inputs: Option<Vec<IoField>>,
    #[serde(default)]
    pub outputs: Option<Vec<IoField>>,
    #[serde(default)]
    pub config_values: Option<Vec<IoField>>,
    /// Owner identity, assigned from the creating caller.
    #[serde(rename = "userId", default, deserialize_with = "null_as_default")]
    pub user_id: String,
}

impl Operator {
    /// Returns `true` if `caller` may see this operator in listings.
    #[must_use]
    pub fn is_visible_to(&self, caller: &str) -> bool {
        self.public == Some(true) || self.user_id == caller
    }

    /// Returns `true` if `caller` owns this operator.
    #[must_use]
    pub fn is_owned_by(&self, caller: &str) -> bool {
        self.user_id == caller
    }
}

/// Create payload.
///
/// Only `name` is required. Owner and id fields sent by the client are not
/// part of this type and are dropped during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OperatorInput {
    /// Operator name
    pub name: String,
    /// Name of the associated docker image
    #[serde(default)]
    pub image: Option<String>,
    /// Description of the operator
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "pub", default)]
    pub public: Option<bool>,
    #[serde(rename = "deploymentType", default)]
    pub deployment_type: Option<String>,
    #[serde(default)]
    pub inputs: Option<Vec<IoField>>,
    #[serde(default)]
    pub outputs: Option<Vec<IoField>>,
    #[serde(default)]
    pub config_values: Option<Vec<IoField>>,
}

impl OperatorInput {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
            description: None,
            public: None,
            deployment_type: None,
            inputs: None,
            outputs: None,
            config_values: None,
        }
    }

    /// Binds the payload to its owner, producing the document to insert.
    #[must_use]
    pub fn into_new(self, owner: impl Into<String>) -> NewOperator {
        NewOperator {
            name: self.name,
            image: self.image,
            description: self.description,
            public: self.public,
            deployment_type: self.deployment_type,
            inputs: self.inputs,
            outputs: self.outputs,
            config_values: self.config_values,
            user_id: owner.into(),
        }
    }
}

/// Document handed to a backend for insertion. The backend assigns the id.
///
/// Unset fields are omitted so stored documents only carry what the client
/// sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOperator {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "pub", default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(
        rename = "deploymentType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deployment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<IoField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<IoField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_values: Option<Vec<IoField>>,
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl NewOperator {
    /// Attaches a store-assigned id.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Operator {
        Operator {
            id: id.into(),
            name: self.name,
            image: self.image,
            description: self.description,
            public: self.public,
            deployment_type: self.deployment_type,
            inputs: self.inputs,
            outputs: self.outputs,
            config_values: self.config_values,
            user_id: self.user_id,
        }
    }
}

/// Update payload with shallow merge semantics.
///
/// Each key that is present replaces the stored value verbatim; sequences
/// are replaced whole and an explicit `null` clears an optional field
/// (`Some(None)`). Absent keys (`None`) leave the stored value untouched.
/// `name` and `userId` are always strings, so `null` for them is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OperatorPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub image: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(
        rename = "pub",
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<bool>)]
    pub public: Option<Option<bool>>,
    #[serde(
        rename = "deploymentType",
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub deployment_type: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<Vec<IoField>>)]
    pub inputs: Option<Option<Vec<IoField>>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<Vec<IoField>>)]
    pub outputs: Option<Option<Vec<IoField>>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<Vec<IoField>>)]
    pub config_values: Option<Option<Vec<IoField>>>,
    /// Reassigns ownership. Only the current owner can reach this.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl OperatorPatch {
    /// Returns `true` if the patch would not change any field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies the patch in place.
    pub fn apply_to(&self, operator: &mut Operator) {
        if let Some(name) = &self.name {
            operator.name = name.clone();
        }
        if let Some(image) = &self.image {
            operator.image = image.clone();
        }
        if let Some(description) = &self.description {
            operator.description = description.clone();
        }
        if let Some(public) = self.public {
            operator.public = public;
        }
        if let Some(deployment_type) = &self.deployment_type {
            operator.deployment_type = deployment_type.clone();
        }
        if let Some(inputs) = &self.inputs {
            operator.inputs = inputs.clone();
        }
        if let Some(outputs) = &self.outputs {
            operator.outputs = outputs.clone();
        }
        if let Some(config_values) = &self.config_values {
            operator.config_values = config_values.clone();
        }
        if let Some(user_id) = &self.user_id {
            operator.user_id = user_id.clone();
        }
    }
}

/// One page of a listing plus the size of the full match set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OperatorPage {
    pub operators: Vec<Operator>,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}
