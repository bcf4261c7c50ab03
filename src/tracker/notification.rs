//! Caller mailboxes and notification messages
//!
//! Each waiting execution context owns a [`Mailbox`]: an identity plus an
//! inbox. The tracker delivers `(caller, target)` tagged messages into it;
//! the waiting side matches on both fields and discards anything else
//! (late notifications for waits it already gave up on).

use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::position::LogPosition;

/// Identity of a waiting execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerId(Uuid);

impl CallerId {
    /// Fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message telling a caller its target is locally visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub caller: CallerId,
    pub target: LogPosition,
}

/// Result of waiting for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Target is visible locally
    Ready,
    /// Timeout elapsed first
    TimedOut,
}

impl WaitOutcome {
    /// Check if the wait succeeded
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

pub(crate) type NotificationSender = mpsc::UnboundedSender<Notification>;

/// Inbox of one waiting execution context
#[derive(Debug)]
pub struct Mailbox {
    id: CallerId,
    sender: NotificationSender,
    receiver: mpsc::UnboundedReceiver<Notification>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    /// Mailbox with a fresh identity.
    pub fn new() -> Self {
        Self::with_id(CallerId::new())
    }

    /// Mailbox for a known identity.
    ///
    /// Several mailboxes may share one identity; each only ever receives
    /// notifications for entries it registered itself.
    pub fn with_id(id: CallerId) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            id,
            sender,
            receiver,
        }
    }

    /// Caller identity
    pub fn id(&self) -> CallerId {
        self.id
    }

    pub(crate) fn sender(&self) -> NotificationSender {
        self.sender.clone()
    }

    fn matches(&self, notification: &Notification, target: &LogPosition) -> bool {
        notification.caller == self.id && notification.target == *target
    }

    /// Wait for the notification tagged `(self.id, target)`.
    ///
    /// Never completes on its own if the message never comes; callers bound
    /// it with a timeout.
    pub(crate) async fn recv_matching(&mut self, target: &LogPosition) {
        // The mailbox holds a sender, so the channel never closes here.
        while let Some(notification) = self.receiver.recv().await {
            if self.matches(&notification, target) {
                return;
            }
        }
        std::future::pending::<()>().await
    }

    /// Drain queued messages; true if one matched `target`.
    pub(crate) fn take_matching(&mut self, target: &LogPosition) -> bool {
        let mut found = false;
        while let Ok(notification) = self.receiver.try_recv() {
            found |= self.matches(&notification, target);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_ids_unique() {
        assert_ne!(CallerId::new(), CallerId::new());
        assert_ne!(Mailbox::new().id(), Mailbox::new().id());
    }

    #[tokio::test]
    async fn test_recv_matching_skips_foreign_messages() {
        let mut mailbox = Mailbox::new();
        let target = LogPosition::insert(0, 10);
        let sender = mailbox.sender();

        sender
            .send(Notification {
                caller: mailbox.id(),
                target: LogPosition::insert(0, 5),
            })
            .unwrap();
        sender
            .send(Notification {
                caller: CallerId::new(),
                target,
            })
            .unwrap();
        sender
            .send(Notification {
                caller: mailbox.id(),
                target,
            })
            .unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), mailbox.recv_matching(&target))
            .await
            .unwrap();
        assert!(!mailbox.take_matching(&target));
    }

    #[test]
    fn test_take_matching_drains() {
        let mut mailbox = Mailbox::new();
        let target = LogPosition::insert(1, 1);
        mailbox
            .sender()
            .send(Notification {
                caller: mailbox.id(),
                target,
            })
            .unwrap();

        assert!(mailbox.take_matching(&target));
        assert!(!mailbox.take_matching(&target));
    }

    #[test]
    fn test_wait_outcome() {
        assert!(WaitOutcome::Ready.is_ready());
        assert!(!WaitOutcome::TimedOut.is_ready());
    }
}
