//! Skill command envelope
//!
//! The envelope is the unit that travels through the broker. Its `payload` is
//! left untyped on the wire and reinterpreted as the action's typed request on
//! the consuming side.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillAction {
    Create,
    Update,
    UpdateName,
    UpdateDescription,
    UpdateLogo,
    UpdateTags,
    Delete,
}

impl SkillAction {
    pub const ALL: [SkillAction; 7] = [
        SkillAction::Create,
        SkillAction::Update,
        SkillAction::UpdateName,
        SkillAction::UpdateDescription,
        SkillAction::UpdateLogo,
        SkillAction::UpdateTags,
        SkillAction::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillAction::Create => "create",
            SkillAction::Update => "update",
            SkillAction::UpdateName => "update_name",
            SkillAction::UpdateDescription => "update_description",
            SkillAction::UpdateLogo => "update_logo",
            SkillAction::UpdateTags => "update_tags",
            SkillAction::Delete => "delete",
        }
    }

    /// Every action except `create` addresses an existing skill by key.
    pub fn requires_key(&self) -> bool {
        !matches!(self, SkillAction::Create)
    }
}

impl fmt::Display for SkillAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillAction {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(SkillAction::Create),
            "update" => Ok(SkillAction::Update),
            "update_name" => Ok(SkillAction::UpdateName),
            "update_description" | "update_desc" => Ok(SkillAction::UpdateDescription),
            "update_logo" => Ok(SkillAction::UpdateLogo),
            "update_tags" => Ok(SkillAction::UpdateTags),
            "delete" => Ok(SkillAction::Delete),
            other => Err(CommandError::UnknownAction(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("key is missing for action {action:?}")]
    MissingKey { action: String },
    #[error("action is missing for key {}", display_key(.key.as_deref()))]
    MissingAction { key: Option<String> },
    #[error("unknown action {0:?}")]
    UnknownAction(String),
}

/// Failure to reinterpret an untyped payload as a typed request.
#[derive(Error, Debug)]
#[error("cannot convert payload into {target}: {source}")]
pub struct ConversionError {
    pub target: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Wire envelope: `{"action": string, "key": string|null, "payload": object|null}`.
///
/// `action` stays a raw string here so an empty tag and an unrecognised tag can
/// be told apart when the envelope is validated and dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCommand {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl SkillCommand {
    pub fn new(action: SkillAction, key: Option<String>, payload: Value) -> Self {
        Self {
            action: action.as_str().to_string(),
            key,
            payload,
        }
    }

    /// Builds the envelope for a typed request, serializing its body.
    pub fn from_request(key: Option<String>, request: &SkillRequest) -> Result<Self, serde_json::Error> {
        Ok(Self::new(request.action(), key, request.payload()?))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Key, treating an empty string as absent.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn key_or_placeholder(&self) -> &str {
        display_key(self.key())
    }

    /// Checks the structural invariants: a key for every non-create action,
    /// then a non-empty action. The key check runs first.
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.action != SkillAction::Create.as_str() && self.key().is_none() {
            return Err(CommandError::MissingKey {
                action: self.action.clone(),
            });
        }

        if self.action.is_empty() {
            return Err(CommandError::MissingAction {
                key: self.key().map(str::to_string),
            });
        }

        Ok(())
    }

    /// Validates the envelope and resolves its action tag.
    pub fn resolve(&self) -> Result<SkillAction, CommandError> {
        self.validate()?;
        self.action.parse()
    }

    /// Reinterprets the untyped payload as the request type `T`.
    pub fn payload_as<T: TypedRequest>(&self) -> Result<T, ConversionError> {
        convert_payload(&self.payload)
    }
}

/// `"action": null` reads as an empty action so validation, not decoding, rejects it.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn display_key(key: Option<&str>) -> &str {
    key.unwrap_or("<none>")
}

/// Typed request bodies carried by the envelope payload.
pub trait TypedRequest: DeserializeOwned + Serialize {
    const NAME: &'static str;
}

/// Round-trips an untyped value through JSON into `T`, reporting `T::NAME` on
/// a shape mismatch.
pub fn convert_payload<T: TypedRequest>(value: &Value) -> Result<T, ConversionError> {
    let bytes = serde_json::to_vec(value).map_err(|source| ConversionError {
        target: T::NAME,
        source,
    })?;

    serde_json::from_slice(&bytes).map_err(|source| ConversionError {
        target: T::NAME,
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSkillRequest {
    pub key: String,
    pub name: String,
    pub description: String,
    pub logo: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSkillRequest {
    pub name: String,
    pub description: String,
    pub logo: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSkillNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSkillDescriptionRequest {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSkillLogoRequest {
    pub logo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSkillTagsRequest {
    pub tags: Vec<String>,
}

impl TypedRequest for CreateSkillRequest {
    const NAME: &'static str = "CreateSkillRequest";
}

impl TypedRequest for UpdateSkillRequest {
    const NAME: &'static str = "UpdateSkillRequest";
}

impl TypedRequest for UpdateSkillNameRequest {
    const NAME: &'static str = "UpdateSkillNameRequest";
}

impl TypedRequest for UpdateSkillDescriptionRequest {
    const NAME: &'static str = "UpdateSkillDescriptionRequest";
}

impl TypedRequest for UpdateSkillLogoRequest {
    const NAME: &'static str = "UpdateSkillLogoRequest";
}

impl TypedRequest for UpdateSkillTagsRequest {
    const NAME: &'static str = "UpdateSkillTagsRequest";
}

/// One variant per action; the publishing side builds envelopes from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillRequest {
    Create(CreateSkillRequest),
    Update(UpdateSkillRequest),
    UpdateName(UpdateSkillNameRequest),
    UpdateDescription(UpdateSkillDescriptionRequest),
    UpdateLogo(UpdateSkillLogoRequest),
    UpdateTags(UpdateSkillTagsRequest),
    Delete,
}

impl SkillRequest {
    pub fn action(&self) -> SkillAction {
        match self {
            SkillRequest::Create(_) => SkillAction::Create,
            SkillRequest::Update(_) => SkillAction::Update,
            SkillRequest::UpdateName(_) => SkillAction::UpdateName,
            SkillRequest::UpdateDescription(_) => SkillAction::UpdateDescription,
            SkillRequest::UpdateLogo(_) => SkillAction::UpdateLogo,
            SkillRequest::UpdateTags(_) => SkillAction::UpdateTags,
            SkillRequest::Delete => SkillAction::Delete,
        }
    }

    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            SkillRequest::Create(req) => serde_json::to_value(req),
            SkillRequest::Update(req) => serde_json::to_value(req),
            SkillRequest::UpdateName(req) => serde_json::to_value(req),
            SkillRequest::UpdateDescription(req) => serde_json::to_value(req),
            SkillRequest::UpdateLogo(req) => serde_json::to_value(req),
            SkillRequest::UpdateTags(req) => serde_json::to_value(req),
            SkillRequest::Delete => Ok(Value::Null),
        }
    }
}
