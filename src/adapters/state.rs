use crate::domain::model::{MessageId, NotificationState, ReleaseVersion};
use crate::domain::ports::StateRepository;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

/// In-memory notification state, one per process.
///
/// Each field is guarded on its own; no operation spans two fields.
pub struct InMemoryStateStore {
    message_count: AtomicUsize,
    has_notification: AtomicBool,
    general_notification_sent: AtomicBool,
    current_version: ReleaseVersion,
    latest_version: RwLock<ReleaseVersion>,
    notified_messages: Mutex<HashSet<MessageId>>,
}

impl InMemoryStateStore {
    pub fn new(current_version: ReleaseVersion) -> Self {
        let initial = NotificationState::initial(current_version);
        Self {
            message_count: AtomicUsize::new(initial.message_count),
            has_notification: AtomicBool::new(initial.has_notification),
            general_notification_sent: AtomicBool::new(false),
            current_version: initial.current_version,
            latest_version: RwLock::new(initial.latest_version),
            notified_messages: Mutex::new(HashSet::new()),
        }
    }

    pub fn notified_count(&self) -> usize {
        self.ledger().len()
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, HashSet<MessageId>> {
        self.notified_messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl StateRepository for InMemoryStateStore {
    fn snapshot(&self) -> NotificationState {
        NotificationState {
            message_count: self.message_count.load(Ordering::SeqCst),
            has_notification: self.has_notification.load(Ordering::SeqCst),
            current_version: self.current_version.clone(),
            latest_version: self.latest_version(),
        }
    }

    fn update_message_count(&self, count: usize) {
        self.message_count.store(count, Ordering::SeqCst);
    }

    fn update_notification_flag(&self, flag: bool) {
        self.has_notification.store(flag, Ordering::SeqCst);
    }

    fn update_latest_version(&self, version: ReleaseVersion) {
        let mut latest = self
            .latest_version
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *latest = version;
    }

    fn latest_version(&self) -> ReleaseVersion {
        self.latest_version
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn is_message_already_notified(&self, id: &MessageId) -> bool {
        self.ledger().contains(id)
    }

    fn mark_message_notified(&self, id: MessageId) {
        self.ledger().insert(id);
    }

    fn cleanup_old_messages(&self, current_ids: &HashSet<MessageId>) {
        let mut ledger = self.ledger();
        let before = ledger.len();
        ledger.retain(|id| current_ids.contains(id));

        let removed = before - ledger.len();
        if removed > 0 {
            tracing::debug!("Removed {} stale message id(s) from ledger", removed);
        }
    }

    fn reset_notified_messages(&self) {
        self.ledger().clear();
    }

    fn reset_general_notification_flag(&self) {
        self.general_notification_sent.store(false, Ordering::SeqCst);
    }

    fn mark_general_notification_sent(&self) {
        self.general_notification_sent.store(true, Ordering::SeqCst);
    }

    fn is_general_notification_sent(&self) -> bool {
        self.general_notification_sent.load(Ordering::SeqCst)
    }
}
