//! Contract for the remote drilling-data store.
//!
//! The engine never inspects how a call reaches the store. Every method
//! resolves to either success or a [`RemoteFailure`] value carrying the
//! reason reported by the server.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of object held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Well,
    Wellbore,
    Log,
    Trajectory,
    Risk,
    Rig,
    Tubular,
    MudLog,
    Message,
    BhaRun,
    WbGeometry,
    FormationMarker,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Well => "well",
            EntityType::Wellbore => "wellbore",
            EntityType::Log => "log",
            EntityType::Trajectory => "trajectory",
            EntityType::Risk => "risk",
            EntityType::Rig => "rig",
            EntityType::Tubular => "tubular",
            EntityType::MudLog => "mudLog",
            EntityType::Message => "message",
            EntityType::BhaRun => "bhaRun",
            EntityType::WbGeometry => "wbGeometry",
            EntityType::FormationMarker => "formationMarker",
        }
    }

    /// Plural used in job descriptions and result messages.
    pub fn plural(self) -> &'static str {
        match self {
            EntityType::Well => "wells",
            EntityType::Wellbore => "wellbores",
            EntityType::Log => "logs",
            EntityType::Trajectory => "trajectories",
            EntityType::Risk => "risks",
            EntityType::Rig => "rigs",
            EntityType::Tubular => "tubulars",
            EntityType::MudLog => "mudLogs",
            EntityType::Message => "messages",
            EntityType::BhaRun => "bhaRuns",
            EntityType::WbGeometry => "wbGeometries",
            EntityType::FormationMarker => "formationMarkers",
        }
    }

    /// Returns true for objects that live under a wellbore.
    pub fn is_child_object(self) -> bool {
        !matches!(self, EntityType::Well | EntityType::Wellbore)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of repeated sub-element inside a growing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentType {
    Mnemonic,
    TrajectoryStation,
    TubularComponent,
    WbGeometrySection,
    GeologyInterval,
    BhaRunComponent,
}

impl ComponentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Mnemonic => "mnemonic",
            ComponentType::TrajectoryStation => "trajectory station",
            ComponentType::TubularComponent => "tubular component",
            ComponentType::WbGeometrySection => "wbGeometry section",
            ComponentType::GeologyInterval => "geology interval",
            ComponentType::BhaRunComponent => "bhaRun component",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one object in the store hierarchy.
///
/// For a well, `uid` and `well_uid` are the same. For a wellbore,
/// `wellbore_uid` equals `uid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub entity_type: EntityType,
    pub well_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wellbore_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wellbore_name: Option<String>,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ObjectRef {
    pub fn well(uid: impl Into<String>) -> Self {
        let uid = uid.into();
        Self {
            entity_type: EntityType::Well,
            well_uid: uid.clone(),
            well_name: None,
            wellbore_uid: None,
            wellbore_name: None,
            uid,
            name: None,
        }
    }

    pub fn wellbore(well_uid: impl Into<String>, uid: impl Into<String>) -> Self {
        let uid = uid.into();
        Self {
            entity_type: EntityType::Wellbore,
            well_uid: well_uid.into(),
            well_name: None,
            wellbore_uid: Some(uid.clone()),
            wellbore_name: None,
            uid,
            name: None,
        }
    }

    pub fn object(
        entity_type: EntityType,
        well_uid: impl Into<String>,
        wellbore_uid: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            well_uid: well_uid.into(),
            well_name: None,
            wellbore_uid: Some(wellbore_uid.into()),
            wellbore_name: None,
            uid: uid.into(),
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parent_names(
        mut self,
        well_name: impl Into<String>,
        wellbore_name: Option<String>,
    ) -> Self {
        self.well_name = Some(well_name.into());
        self.wellbore_name = wellbore_name;
        self
    }

    /// Name if known, uid otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uid)
    }

    pub fn well_display_name(&self) -> &str {
        self.well_name.as_deref().unwrap_or(&self.well_uid)
    }

    pub fn wellbore_display_name(&self) -> Option<&str> {
        self.wellbore_name
            .as_deref()
            .or(self.wellbore_uid.as_deref())
    }

    /// Same object placed under another wellbore, used when copying.
    pub fn moved_to(&self, wellbore: &ObjectRef) -> ObjectRef {
        ObjectRef {
            entity_type: self.entity_type,
            well_uid: wellbore.well_uid.clone(),
            well_name: wellbore.well_name.clone(),
            wellbore_uid: Some(wellbore.uid.clone()),
            wellbore_name: wellbore.name.clone(),
            uid: self.uid.clone(),
            name: self.name.clone(),
        }
    }

    /// Stable key identifying the object across the whole store.
    pub fn key(&self) -> String {
        match &self.wellbore_uid {
            Some(wellbore) if self.entity_type.is_child_object() => format!(
                "{}/{}/{}/{}",
                self.entity_type, self.well_uid, wellbore, self.uid
            ),
            Some(wellbore) => format!("{}/{}/{}", self.entity_type, self.well_uid, wellbore),
            None => format!("{}/{}", self.entity_type, self.well_uid),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.entity_type, self.display_name())
    }
}

/// An object with its writable properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreObject {
    pub reference: ObjectRef,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl StoreObject {
    pub fn new(reference: ObjectRef) -> Self {
        Self {
            reference,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// One page of log data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    pub rows: Vec<String>,
    pub has_more: bool,
    /// Total number of pages, when the server knows it up front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
}

/// A single failed call against the store.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{reason}")]
pub struct RemoteFailure {
    pub reason: String,
}

impl RemoteFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Operations the engine performs against the remote store.
///
/// Implementations must be safe to call concurrently; the fan-out executor
/// issues many calls at once against the same store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Identity of the server, used to scope notifications.
    fn server_url(&self) -> &str;

    async fn add_object(&self, object: &StoreObject) -> Result<(), RemoteFailure>;

    async fn update_object(&self, object: &StoreObject) -> Result<(), RemoteFailure>;

    async fn delete_object(&self, target: &ObjectRef) -> Result<(), RemoteFailure>;

    async fn delete_components(
        &self,
        parent: &ObjectRef,
        component_type: ComponentType,
        uids: &[String],
    ) -> Result<(), RemoteFailure>;

    async fn get_object(&self, target: &ObjectRef) -> Result<StoreObject, RemoteFailure>;

    /// Reads page `page` (zero based) of a log's data.
    async fn read_log_page(&self, log: &ObjectRef, page: usize) -> Result<LogPage, RemoteFailure>;
}
