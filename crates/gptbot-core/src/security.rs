use std::collections::HashSet;

use crate::domain::{Chat, ChatId, ChatKind, Sender, UserId};

pub const PRIVATE_DENIED_NOTICE: &str =
    "⛔️ Sorry, you are not my owner. I cannot chat with you or execute your command.";
pub const GROUP_DENIED_NOTICE: &str =
    "⛔️ Sorry, I'm not supposed to work here. Please remove me from the group.";

// ============== Authorization ==============

/// Static allow-lists, fixed at startup.
///
/// An empty list leaves that chat kind unrestricted.
#[derive(Clone, Debug, Default)]
pub struct AccessPolicy {
    owners: HashSet<i64>,
    groups: HashSet<i64>,
}

impl AccessPolicy {
    pub fn new(owners: &[i64], groups: &[i64]) -> Self {
        Self {
            owners: owners.iter().copied().collect(),
            groups: groups.iter().copied().collect(),
        }
    }

    pub fn is_allowed(&self, kind: ChatKind, chat_id: ChatId, sender: UserId) -> bool {
        match kind {
            ChatKind::Private => self.owners.is_empty() || self.owners.contains(&sender.0),
            ChatKind::Group => self.groups.is_empty() || self.groups.contains(&chat_id.0),
        }
    }

    /// Stronger check for privileged commands: explicit membership only.
    pub fn is_owner(&self, sender: Option<UserId>) -> bool {
        sender.is_some_and(|id| self.owners.contains(&id.0))
    }

    /// Evaluate an inbound chat/sender pair.
    ///
    /// Private chats without a sender fall back to the chat id, which equals
    /// the user id for private chats.
    pub fn check(&self, chat: &Chat, sender: Option<&Sender>) -> AccessDecision {
        let sender_id = sender.map(|s| s.id).unwrap_or(UserId(chat.id.0));
        if self.is_allowed(chat.kind, chat.id, sender_id) {
            return AccessDecision::Allowed;
        }
        match chat.kind {
            ChatKind::Private => AccessDecision::Denied {
                notice: PRIVATE_DENIED_NOTICE,
                subject: format!("user {}", describe_sender(sender, chat)),
            },
            ChatKind::Group => AccessDecision::Denied {
                notice: GROUP_DENIED_NOTICE,
                subject: chat.to_string(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied {
        /// User-facing rejection text.
        notice: &'static str,
        /// Identifying info for the denial log line.
        subject: String,
    },
}

pub fn describe_sender(sender: Option<&Sender>, chat: &Chat) -> String {
    match sender {
        Some(s) => s.to_string(),
        None => format!("@ ({})", chat.id.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(kind: ChatKind, id: i64) -> Chat {
        Chat {
            id: ChatId(id),
            kind,
            title: Some("Team".to_string()),
        }
    }

    fn sender(id: i64) -> Sender {
        Sender {
            id: UserId(id),
            username: Some("alice".to_string()),
        }
    }

    #[test]
    fn empty_lists_allow_everyone() {
        let p = AccessPolicy::default();
        assert!(p.is_allowed(ChatKind::Private, ChatId(5), UserId(5)));
        assert!(p.is_allowed(ChatKind::Group, ChatId(-100), UserId(5)));
    }

    #[test]
    fn private_checks_sender_membership_only() {
        let p = AccessPolicy::new(&[1, 2], &[]);
        assert!(p.is_allowed(ChatKind::Private, ChatId(1), UserId(1)));
        assert!(!p.is_allowed(ChatKind::Private, ChatId(3), UserId(3)));
        // Group list is empty: groups stay open regardless of owners.
        assert!(p.is_allowed(ChatKind::Group, ChatId(-100), UserId(3)));
    }

    #[test]
    fn group_checks_chat_membership_only() {
        let p = AccessPolicy::new(&[], &[-100]);
        assert!(p.is_allowed(ChatKind::Group, ChatId(-100), UserId(9)));
        assert!(!p.is_allowed(ChatKind::Group, ChatId(-200), UserId(9)));
        assert!(p.is_allowed(ChatKind::Private, ChatId(9), UserId(9)));
    }

    #[test]
    fn owner_requires_explicit_membership() {
        assert!(!AccessPolicy::default().is_owner(Some(UserId(1))));
        let p = AccessPolicy::new(&[1], &[]);
        assert!(p.is_owner(Some(UserId(1))));
        assert!(!p.is_owner(Some(UserId(2))));
        assert!(!p.is_owner(None));
    }

    #[test]
    fn denial_carries_notice_and_subject() {
        let p = AccessPolicy::new(&[1], &[-100]);

        let d = p.check(&chat(ChatKind::Private, 3), Some(&sender(3)));
        assert_eq!(
            d,
            AccessDecision::Denied {
                notice: PRIVATE_DENIED_NOTICE,
                subject: "user @alice (3)".to_string(),
            }
        );

        let d = p.check(&chat(ChatKind::Group, -200), Some(&sender(1)));
        assert_eq!(
            d,
            AccessDecision::Denied {
                notice: GROUP_DENIED_NOTICE,
                subject: "group Team (-200)".to_string(),
            }
        );

        assert_eq!(
            p.check(&chat(ChatKind::Private, 1), None),
            AccessDecision::Allowed
        );
    }
}
