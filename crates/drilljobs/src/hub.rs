//! Completion and refresh events for observers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::job::JobKind;
use crate::record::JobStatus;
use crate::remote::{EntityType, ObjectRef};
use crate::worker::WorkerResult;

/// Kind of change described by a refresh notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Remove,
    Update,
    BatchUpdate,
}

/// Statement that some data on a server changed and views should re-sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshNotification {
    pub entity_type: EntityType,
    pub server_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub well_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wellbore_uid: Option<String>,
    #[serde(default)]
    pub object_uids: Vec<String>,
    pub change: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl RefreshNotification {
    /// A single well was added, removed or updated.
    pub fn well(server_url: &str, well_uid: &str, change: ChangeKind) -> Self {
        Self {
            entity_type: EntityType::Well,
            server_url: server_url.to_string(),
            well_uid: Some(well_uid.to_string()),
            wellbore_uid: None,
            object_uids: vec![],
            change,
            timestamp: Utc::now(),
        }
    }

    /// Several wells were updated together.
    pub fn wells_batch(server_url: &str, well_uids: Vec<String>) -> Self {
        Self {
            entity_type: EntityType::Well,
            server_url: server_url.to_string(),
            well_uid: None,
            wellbore_uid: None,
            object_uids: well_uids,
            change: ChangeKind::BatchUpdate,
            timestamp: Utc::now(),
        }
    }

    pub fn wellbore(server_url: &str, wellbore: &ObjectRef, change: ChangeKind) -> Self {
        Self {
            entity_type: EntityType::Wellbore,
            server_url: server_url.to_string(),
            well_uid: Some(wellbore.well_uid.clone()),
            wellbore_uid: Some(wellbore.uid.clone()),
            object_uids: vec![],
            change,
            timestamp: Utc::now(),
        }
    }

    /// Objects of one type under `wellbore` changed.
    pub fn objects(
        server_url: &str,
        entity_type: EntityType,
        wellbore: &ObjectRef,
        object_uids: Vec<String>,
        change: ChangeKind,
    ) -> Self {
        Self {
            entity_type,
            server_url: server_url.to_string(),
            well_uid: Some(wellbore.well_uid.clone()),
            wellbore_uid: wellbore.wellbore_uid.clone(),
            object_uids,
            change,
            timestamp: Utc::now(),
        }
    }

    /// A single child object changed in place.
    pub fn object(server_url: &str, object: &ObjectRef, change: ChangeKind) -> Self {
        Self {
            entity_type: object.entity_type,
            server_url: server_url.to_string(),
            well_uid: Some(object.well_uid.clone()),
            wellbore_uid: object.wellbore_uid.clone(),
            object_uids: vec![object.uid.clone()],
            change,
            timestamp: Utc::now(),
        }
    }
}

/// Published once for every job that reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCompletedEvent {
    pub job_id: String,
    pub kind: JobKind,
    pub description: String,
    pub server_url: String,
    pub status: JobStatus,
    pub result: WorkerResult,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    JobCompleted(JobCompletedEvent),
    Refresh(RefreshNotification),
}

impl HubEvent {
    /// Server the event originated from.
    pub fn server_url(&self) -> &str {
        match self {
            HubEvent::JobCompleted(event) => &event.server_url,
            HubEvent::Refresh(refresh) => &refresh.server_url,
        }
    }
}

/// Broadcasts job events to every connected observer.
///
/// Delivery is at most once and never replayed. Publishing does not wait
/// for observers; one that falls more than the channel capacity behind
/// loses the oldest events.
#[derive(Clone)]
pub struct NotificationHub {
    sender: Arc<broadcast::Sender<HubEvent>>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: HubEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn publish_completed(&self, event: JobCompletedEvent) {
        log::debug!(
            "Publishing completion of job {} ({})",
            event.job_id,
            event.status
        );
        self.publish(HubEvent::JobCompleted(event));
    }

    pub fn publish_refresh(&self, refresh: RefreshNotification) {
        log::debug!(
            "Publishing {:?} refresh for {} on {}",
            refresh.change,
            refresh.entity_type,
            refresh.server_url
        );
        self.publish(HubEvent::Refresh(refresh));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.sender.subscribe()
    }

    /// Subscribes to events originating from one server only.
    pub fn subscribe_server(&self, server_url: impl Into<String>) -> ServerSubscription {
        ServerSubscription {
            server_url: server_url.into(),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Receiver filtered to a single origin server.
pub struct ServerSubscription {
    server_url: String,
    receiver: broadcast::Receiver<HubEvent>,
}

impl ServerSubscription {
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Next event for this server, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<HubEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.server_url() == self.server_url => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "Subscription for {} lagged, skipped {} events",
                        self.server_url,
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next buffered event for this server, without waiting.
    pub fn try_recv(&mut self) -> Option<HubEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.server_url() == self.server_url => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!(
                        "Subscription for {} lagged, skipped {} events",
                        self.server_url,
                        skipped
                    );
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
