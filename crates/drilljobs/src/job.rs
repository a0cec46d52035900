//! Job kinds and their payloads.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::remote::{ComponentType, EntityType, ObjectRef, StoreObject};

/// Closed set of job kinds the engine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    DeleteObjects,
    DeleteComponents,
    DeleteWell,
    DeleteWellbore,
    CreateWell,
    ModifyWell,
    BatchModifyWells,
    CopyObjects,
    DownloadLog,
}

impl JobKind {
    pub const ALL: [JobKind; 9] = [
        JobKind::DeleteObjects,
        JobKind::DeleteComponents,
        JobKind::DeleteWell,
        JobKind::DeleteWellbore,
        JobKind::CreateWell,
        JobKind::ModifyWell,
        JobKind::BatchModifyWells,
        JobKind::CopyObjects,
        JobKind::DownloadLog,
    ];

    /// Position of the kind in [`JobKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::DeleteObjects => "DeleteObjects",
            JobKind::DeleteComponents => "DeleteComponents",
            JobKind::DeleteWell => "DeleteWell",
            JobKind::DeleteWellbore => "DeleteWellbore",
            JobKind::CreateWell => "CreateWell",
            JobKind::ModifyWell => "ModifyWell",
            JobKind::BatchModifyWells => "BatchModifyWells",
            JobKind::CopyObjects => "CopyObjects",
            JobKind::DownloadLog => "DownloadLog",
        }
    }

    /// Whether operators may cancel jobs of this kind.
    ///
    /// Only kinds that work through many independent units (fan-out
    /// targets, log pages) can stop part way.
    pub fn is_cancelable(self) -> bool {
        matches!(
            self,
            JobKind::DeleteObjects
                | JobKind::BatchModifyWells
                | JobKind::CopyObjects
                | JobKind::DownloadLog
        )
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteObjectsJob {
    pub objects: Vec<ObjectRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteComponentsJob {
    pub parent: ObjectRef,
    pub component_type: ComponentType,
    pub component_uids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteWellJob {
    pub well: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteWellboreJob {
    pub wellbore: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWellJob {
    pub well: StoreObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyWellJob {
    pub well: StoreObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchModifyWellsJob {
    pub wells: Vec<StoreObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyObjectsJob {
    pub sources: Vec<ObjectRef>,
    pub target_wellbore: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLogJob {
    pub log: ObjectRef,
}

/// An immutable work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum Job {
    DeleteObjects(DeleteObjectsJob),
    DeleteComponents(DeleteComponentsJob),
    DeleteWell(DeleteWellJob),
    DeleteWellbore(DeleteWellboreJob),
    CreateWell(CreateWellJob),
    ModifyWell(ModifyWellJob),
    BatchModifyWells(BatchModifyWellsJob),
    CopyObjects(CopyObjectsJob),
    DownloadLog(DownloadLogJob),
}

/// Display fields derived from a job once, at submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub well_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wellbore_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
}

impl Job {
    pub fn kind(&self) -> JobKind {
        match self {
            Job::DeleteObjects(_) => JobKind::DeleteObjects,
            Job::DeleteComponents(_) => JobKind::DeleteComponents,
            Job::DeleteWell(_) => JobKind::DeleteWell,
            Job::DeleteWellbore(_) => JobKind::DeleteWellbore,
            Job::CreateWell(_) => JobKind::CreateWell,
            Job::ModifyWell(_) => JobKind::ModifyWell,
            Job::BatchModifyWells(_) => JobKind::BatchModifyWells,
            Job::CopyObjects(_) => JobKind::CopyObjects,
            Job::DownloadLog(_) => JobKind::DownloadLog,
        }
    }

    pub fn is_cancelable(&self) -> bool {
        self.kind().is_cancelable()
    }

    /// Checks the structural prerequisites of the payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let kind = self.kind();
        match self {
            Job::DeleteObjects(job) => validate_siblings(kind, &job.objects),
            Job::DeleteComponents(job) => {
                require_child_object(kind, &job.parent)?;
                if job.component_uids.is_empty() {
                    return Err(ValidationError::EmptyTargets { kind });
                }
                if job.component_uids.iter().any(|uid| uid.trim().is_empty()) {
                    return Err(ValidationError::MissingField {
                        kind,
                        field: "component uid",
                    });
                }
                Ok(())
            }
            Job::DeleteWell(job) => require_ref(kind, &job.well, EntityType::Well),
            Job::DeleteWellbore(job) => require_ref(kind, &job.wellbore, EntityType::Wellbore),
            Job::CreateWell(job) => {
                require_ref(kind, &job.well.reference, EntityType::Well)?;
                let has_name = job
                    .well
                    .reference
                    .name
                    .as_deref()
                    .is_some_and(|name| !name.trim().is_empty());
                if !has_name {
                    return Err(ValidationError::MissingField {
                        kind,
                        field: "well name",
                    });
                }
                Ok(())
            }
            Job::ModifyWell(job) => require_well_update(kind, &job.well),
            Job::BatchModifyWells(job) => {
                if job.wells.is_empty() {
                    return Err(ValidationError::EmptyTargets { kind });
                }
                job.wells
                    .iter()
                    .try_for_each(|well| require_well_update(kind, well))
            }
            Job::CopyObjects(job) => {
                require_ref(kind, &job.target_wellbore, EntityType::Wellbore)?;
                validate_siblings(kind, &job.sources)
            }
            Job::DownloadLog(job) => require_ref(kind, &job.log, EntityType::Log),
        }
    }

    /// Builds the description and target names shown for the job.
    pub fn info(&self) -> JobInfo {
        match self {
            Job::DeleteObjects(job) => objects_info("Delete", &job.objects),
            Job::DeleteComponents(job) => JobInfo {
                description: format!(
                    "Delete {} {}(s) from {}",
                    job.component_uids.len(),
                    job.component_type,
                    job.parent
                ),
                well_name: Some(job.parent.well_display_name().to_string()),
                wellbore_name: job.parent.wellbore_display_name().map(str::to_string),
                object_name: Some(job.parent.display_name().to_string()),
            },
            Job::DeleteWell(job) => JobInfo {
                description: format!("Delete {}", job.well),
                well_name: Some(job.well.display_name().to_string()),
                ..JobInfo::default()
            },
            Job::DeleteWellbore(job) => JobInfo {
                description: format!("Delete {}", job.wellbore),
                well_name: Some(job.wellbore.well_display_name().to_string()),
                wellbore_name: Some(job.wellbore.display_name().to_string()),
                object_name: None,
            },
            Job::CreateWell(job) => JobInfo {
                description: format!("Create {}", job.well.reference),
                well_name: Some(job.well.reference.display_name().to_string()),
                ..JobInfo::default()
            },
            Job::ModifyWell(job) => JobInfo {
                description: format!("Modify {}", job.well.reference),
                well_name: Some(job.well.reference.display_name().to_string()),
                ..JobInfo::default()
            },
            Job::BatchModifyWells(job) => JobInfo {
                description: format!("Batch modify {} wells", job.wells.len()),
                well_name: Some(join_names(job.wells.iter().map(|w| &w.reference))),
                ..JobInfo::default()
            },
            Job::CopyObjects(job) => {
                let mut info = objects_info("Copy", &job.sources);
                info.description = format!(
                    "{} to wellbore '{}'",
                    info.description,
                    job.target_wellbore.display_name()
                );
                info
            }
            Job::DownloadLog(job) => JobInfo {
                description: format!("Download data from {}", job.log),
                well_name: Some(job.log.well_display_name().to_string()),
                wellbore_name: job.log.wellbore_display_name().map(str::to_string),
                object_name: Some(job.log.display_name().to_string()),
            },
        }
    }
}

fn join_names<'a>(refs: impl Iterator<Item = &'a ObjectRef>) -> String {
    refs.map(ObjectRef::display_name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn objects_info(verb: &str, objects: &[ObjectRef]) -> JobInfo {
    let Some(first) = objects.first() else {
        return JobInfo {
            description: format!("{verb} objects"),
            ..JobInfo::default()
        };
    };
    JobInfo {
        description: format!(
            "{verb} {} {}",
            objects.len(),
            first.entity_type.plural()
        ),
        well_name: Some(first.well_display_name().to_string()),
        wellbore_name: first.wellbore_display_name().map(str::to_string),
        object_name: Some(join_names(objects.iter())),
    }
}

fn require_ref(
    kind: JobKind,
    reference: &ObjectRef,
    expected: EntityType,
) -> Result<(), ValidationError> {
    if reference.entity_type != expected {
        return Err(ValidationError::WrongEntityType {
            kind,
            expected,
            found: reference.entity_type,
        });
    }
    if reference.well_uid.trim().is_empty() {
        return Err(ValidationError::MissingField {
            kind,
            field: "well uid",
        });
    }
    if expected != EntityType::Well
        && reference
            .wellbore_uid
            .as_deref()
            .is_none_or(|uid| uid.trim().is_empty())
    {
        return Err(ValidationError::MissingField {
            kind,
            field: "wellbore uid",
        });
    }
    if reference.uid.trim().is_empty() {
        return Err(ValidationError::MissingField { kind, field: "uid" });
    }
    if expected == EntityType::Wellbore {
        if let Some(wellbore_uid) = reference
            .wellbore_uid
            .as_deref()
            .filter(|uid| *uid != reference.uid)
        {
            return Err(ValidationError::WellboreUidMismatch {
                kind,
                uid: reference.uid.clone(),
                wellbore_uid: wellbore_uid.to_string(),
            });
        }
    }
    Ok(())
}

fn require_child_object(kind: JobKind, reference: &ObjectRef) -> Result<(), ValidationError> {
    if !reference.entity_type.is_child_object() {
        return Err(ValidationError::NotAChildObject {
            kind,
            entity_type: reference.entity_type,
        });
    }
    require_ref(kind, reference, reference.entity_type)
}

fn require_well_update(kind: JobKind, well: &StoreObject) -> Result<(), ValidationError> {
    require_ref(kind, &well.reference, EntityType::Well)?;
    if well.properties.is_empty() {
        return Err(ValidationError::NoProperties {
            kind,
            uid: well.reference.uid.clone(),
        });
    }
    Ok(())
}

/// Targets of a bulk object job must share type and parent wellbore.
fn validate_siblings(kind: JobKind, objects: &[ObjectRef]) -> Result<(), ValidationError> {
    let Some(first) = objects.first() else {
        return Err(ValidationError::EmptyTargets { kind });
    };
    let mut seen = HashSet::with_capacity(objects.len());
    for object in objects {
        require_child_object(kind, object)?;
        if object.entity_type != first.entity_type {
            return Err(ValidationError::MixedEntityTypes { kind });
        }
        if object.well_uid != first.well_uid || object.wellbore_uid != first.wellbore_uid {
            return Err(ValidationError::MixedParents { kind });
        }
        if !seen.insert(object.uid.as_str()) {
            return Err(ValidationError::DuplicateTarget {
                kind,
                uid: object.uid.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(uid: &str) -> ObjectRef {
        ObjectRef::object(EntityType::Log, "W-1", "WB-1", uid)
    }

    #[test]
    fn test_kind_table_is_ordered_by_index() {
        for (i, kind) in JobKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i, "{kind} out of place");
        }
    }

    #[test]
    fn test_cancelable_kinds() {
        assert!(JobKind::DeleteObjects.is_cancelable());
        assert!(JobKind::DownloadLog.is_cancelable());
        assert!(!JobKind::DeleteWell.is_cancelable());
        assert!(!JobKind::CreateWell.is_cancelable());
    }

    #[test]
    fn test_empty_delete_is_rejected() {
        let job = Job::DeleteObjects(DeleteObjectsJob { objects: vec![] });
        assert_eq!(
            job.validate(),
            Err(ValidationError::EmptyTargets {
                kind: JobKind::DeleteObjects
            })
        );
    }

    #[test]
    fn test_delete_objects_requires_same_parent() {
        let other = ObjectRef::object(EntityType::Log, "W-1", "WB-2", "L-9");
        let job = Job::DeleteObjects(DeleteObjectsJob {
            objects: vec![log("L-1"), other],
        });
        assert_eq!(
            job.validate(),
            Err(ValidationError::MixedParents {
                kind: JobKind::DeleteObjects
            })
        );
    }

    #[test]
    fn test_delete_objects_requires_same_type() {
        let risk = ObjectRef::object(EntityType::Risk, "W-1", "WB-1", "R-1");
        let job = Job::DeleteObjects(DeleteObjectsJob {
            objects: vec![log("L-1"), risk],
        });
        assert_eq!(
            job.validate(),
            Err(ValidationError::MixedEntityTypes {
                kind: JobKind::DeleteObjects
            })
        );
    }

    #[test]
    fn test_delete_objects_rejects_wells() {
        let job = Job::DeleteObjects(DeleteObjectsJob {
            objects: vec![ObjectRef::well("W-1")],
        });
        assert!(matches!(
            job.validate(),
            Err(ValidationError::NotAChildObject { .. })
        ));
    }

    #[test]
    fn test_delete_well_requires_uid() {
        let job = Job::DeleteWell(DeleteWellJob {
            well: ObjectRef::well(""),
        });
        assert_eq!(
            job.validate(),
            Err(ValidationError::MissingField {
                kind: JobKind::DeleteWell,
                field: "well uid"
            })
        );
    }

    #[test]
    fn test_delete_wellbore_requires_wellbore_type() {
        let job = Job::DeleteWellbore(DeleteWellboreJob {
            wellbore: ObjectRef::well("W-1"),
        });
        assert!(matches!(
            job.validate(),
            Err(ValidationError::WrongEntityType {
                expected: EntityType::Wellbore,
                found: EntityType::Well,
                ..
            })
        ));
    }

    #[test]
    fn test_create_well_requires_name() {
        let job = Job::CreateWell(CreateWellJob {
            well: StoreObject::new(ObjectRef::well("W-1")),
        });
        assert_eq!(
            job.validate(),
            Err(ValidationError::MissingField {
                kind: JobKind::CreateWell,
                field: "well name"
            })
        );

        let job = Job::CreateWell(CreateWellJob {
            well: StoreObject::new(ObjectRef::well("W-1").named("Troll A-1")),
        });
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_modify_well_requires_properties() {
        let job = Job::BatchModifyWells(BatchModifyWellsJob {
            wells: vec![
                StoreObject::new(ObjectRef::well("W-1")).with_property("field", "Troll"),
                StoreObject::new(ObjectRef::well("W-2")),
            ],
        });
        assert_eq!(
            job.validate(),
            Err(ValidationError::NoProperties {
                kind: JobKind::BatchModifyWells,
                uid: "W-2".to_string()
            })
        );
    }

    #[test]
    fn test_delete_components_requires_uids() {
        let job = Job::DeleteComponents(DeleteComponentsJob {
            parent: log("L-1"),
            component_type: ComponentType::Mnemonic,
            component_uids: vec![],
        });
        assert!(matches!(
            job.validate(),
            Err(ValidationError::EmptyTargets { .. })
        ));
    }

    #[test]
    fn test_copy_requires_target_wellbore() {
        let job = Job::CopyObjects(CopyObjectsJob {
            sources: vec![log("L-1")],
            target_wellbore: ObjectRef::well("W-2"),
        });
        assert!(matches!(
            job.validate(),
            Err(ValidationError::WrongEntityType { .. })
        ));
    }

    #[test]
    fn test_delete_objects_info() {
        let job = Job::DeleteObjects(DeleteObjectsJob {
            objects: vec![
                log("L-1").named("GR").with_parent_names("Troll", Some("Main".to_string())),
                log("L-2").named("RES"),
            ],
        });
        let info = job.info();
        assert_eq!(info.description, "Delete 2 logs");
        assert_eq!(info.well_name.as_deref(), Some("Troll"));
        assert_eq!(info.wellbore_name.as_deref(), Some("Main"));
        assert_eq!(info.object_name.as_deref(), Some("GR, RES"));
    }

    #[test]
    fn test_copy_info_mentions_target() {
        let job = Job::CopyObjects(CopyObjectsJob {
            sources: vec![log("L-1")],
            target_wellbore: ObjectRef::wellbore("W-2", "WB-2").named("Sidetrack"),
        });
        assert_eq!(job.info().description, "Copy 1 logs to wellbore 'Sidetrack'");
    }

    #[test]
    fn test_duplicate_targets_are_rejected() {
        let job = Job::DeleteObjects(DeleteObjectsJob {
            objects: vec![log("A"), log("B"), log("A")],
        });
        assert_eq!(
            job.validate(),
            Err(ValidationError::DuplicateTarget {
                kind: JobKind::DeleteObjects,
                uid: "A".to_string(),
            })
        );
    }

    #[test]
    fn test_wellbore_with_foreign_wellbore_uid_is_rejected() {
        let mut target = ObjectRef::wellbore("W-2", "WB-9");
        target.wellbore_uid = Some("WB-OTHER".to_string());
        let job = Job::CopyObjects(CopyObjectsJob {
            sources: vec![log("L-1")],
            target_wellbore: target,
        });
        assert_eq!(
            job.validate(),
            Err(ValidationError::WellboreUidMismatch {
                kind: JobKind::CopyObjects,
                uid: "WB-9".to_string(),
                wellbore_uid: "WB-OTHER".to_string(),
            })
        );
    }

    #[test]
    fn test_job_deserializes_from_tagged_json() {
        let json = r#"{
            "kind": "DeleteWell",
            "payload": { "well": { "entityType": "well", "wellUid": "W-1", "uid": "W-1" } }
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.kind(), JobKind::DeleteWell);
        assert!(job.validate().is_ok());
    }
}
