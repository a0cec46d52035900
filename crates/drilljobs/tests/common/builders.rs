//! Builders for object references, stores and job payloads.

#![allow(dead_code)]

use drilljobs::job::{
    BatchModifyWellsJob, CopyObjectsJob, DeleteObjectsJob, DeleteWellJob, DownloadLogJob,
};
use drilljobs::testing::MemoryStore;
use drilljobs::{EntityType, Job, ObjectRef, StoreObject};

pub const SERVER: &str = "https://witsml.example.com/store";
pub const WELL: &str = "W-1";
pub const WELLBORE: &str = "WB-1";

pub fn log_ref(uid: &str) -> ObjectRef {
    ObjectRef::object(EntityType::Log, WELL, WELLBORE, uid)
        .named(format!("Log {}", uid))
        .with_parent_names("Troll A-1", Some("Main bore".to_string()))
}

pub fn well_ref(uid: &str) -> ObjectRef {
    ObjectRef::well(uid).named(format!("Well {}", uid))
}

pub fn wellbore_ref(well: &str, uid: &str) -> ObjectRef {
    ObjectRef::wellbore(well, uid).named(format!("Wellbore {}", uid))
}

/// Store holding one log per uid under the default wellbore.
pub fn store_with_logs(server: &str, uids: &[&str]) -> MemoryStore {
    uids.iter().fold(MemoryStore::new(server), |store, uid| {
        store.with_object(StoreObject::new(log_ref(uid)))
    })
}

pub fn delete_logs(uids: &[&str]) -> Job {
    Job::DeleteObjects(DeleteObjectsJob {
        objects: uids.iter().map(|uid| log_ref(uid)).collect(),
    })
}

pub fn delete_well(uid: &str) -> Job {
    Job::DeleteWell(DeleteWellJob {
        well: well_ref(uid),
    })
}

pub fn copy_logs(uids: &[&str], target: ObjectRef) -> Job {
    Job::CopyObjects(CopyObjectsJob {
        sources: uids.iter().map(|uid| log_ref(uid)).collect(),
        target_wellbore: target,
    })
}

pub fn rename_wells(uids: &[&str]) -> Job {
    Job::BatchModifyWells(BatchModifyWellsJob {
        wells: uids
            .iter()
            .map(|uid| StoreObject::new(well_ref(uid)).with_property("field", "Troll"))
            .collect(),
    })
}

pub fn download_log(uid: &str) -> Job {
    Job::DownloadLog(DownloadLogJob { log: log_ref(uid) })
}
