//! Visibility and sharing rules for calendar events.
//!
//! Adding a share promotes a private event to shared. Removing a share reverts
//! the event to private once both share lists are empty, whatever its previous
//! visibility was. The two directions are not symmetric.

use super::event::{CalendarEvent, Visibility};

impl CalendarEvent {
    /// Whether `user_id` may see this event.
    pub fn can_user_view(&self, user_id: &str) -> bool {
        let is_creator = self.creator_user_id() == Some(user_id);
        match self.visibility {
            Visibility::Public => true,
            Visibility::Private => is_creator,
            Visibility::Shared => {
                is_creator || self.shared_with_user_ids.iter().any(|id| id == user_id)
            }
        }
    }

    /// Add a user to the share list. A user already on the list is left alone.
    /// A private event becomes shared; public and shared events keep their
    /// visibility.
    pub fn share_with_user(&mut self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        if self.shared_with_user_ids.contains(&user_id) {
            return;
        }
        self.shared_with_user_ids.push(user_id);
        self.promote_if_private();
        self.touch();
    }

    /// Add an external email address to the share list, with the same
    /// promotion rule as [`share_with_user`](Self::share_with_user).
    pub fn share_with_email(&mut self, email: impl Into<String>) {
        let email = email.into();
        if self.shared_with_emails.contains(&email) {
            return;
        }
        self.shared_with_emails.push(email);
        self.promote_if_private();
        self.touch();
    }

    /// Remove a user from the share list, then demote to private if nobody is
    /// left on either list.
    pub fn remove_shared_user(&mut self, user_id: &str) {
        let before = self.shared_with_user_ids.len();
        self.shared_with_user_ids.retain(|id| id != user_id);
        if self.shared_with_user_ids.len() != before {
            self.touch();
        }
        self.demote_if_unshared();
    }

    /// Remove an email address from the share list, then demote to private if
    /// nobody is left on either list.
    pub fn remove_shared_email(&mut self, email: &str) {
        let before = self.shared_with_emails.len();
        self.shared_with_emails.retain(|e| e != email);
        if self.shared_with_emails.len() != before {
            self.touch();
        }
        self.demote_if_unshared();
    }

    fn promote_if_private(&mut self) {
        if self.visibility == Visibility::Private {
            self.visibility = Visibility::Shared;
        }
    }

    fn demote_if_unshared(&mut self) {
        if self.shared_with_user_ids.is_empty() && self.shared_with_emails.is_empty() {
            self.visibility = Visibility::Private;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventPriority;

    fn owned_by(creator: &str, visibility: Visibility) -> CalendarEvent {
        let mut event = CalendarEvent::new("Planning", EventPriority::Standard);
        event.set_creator_user_id(Some(creator.to_string()));
        event.set_visibility(visibility);
        event
    }

    #[test]
    fn test_public_visible_to_anyone() {
        let event = owned_by("alice", Visibility::Public);
        assert!(event.can_user_view("alice"));
        assert!(event.can_user_view("someone-unrelated"));
    }

    #[test]
    fn test_private_visible_to_creator_only() {
        let mut event = owned_by("alice", Visibility::Private);
        // Direct list replacement leaves visibility alone.
        event.set_shared_with_user_ids(vec!["bob".to_string()]);
        assert_eq!(event.visibility(), Visibility::Private);

        assert!(event.can_user_view("alice"));
        assert!(!event.can_user_view("bob"));
        assert!(!event.can_user_view("carol"));
    }

    #[test]
    fn test_private_without_creator_visible_to_nobody() {
        let mut event = CalendarEvent::new("Orphan", EventPriority::Standard);
        event.set_visibility(Visibility::Private);
        assert!(!event.can_user_view("alice"));
        assert!(!event.can_user_view(""));
    }

    #[test]
    fn test_shared_visible_to_creator_and_share_list() {
        let mut event = owned_by("creator", Visibility::Shared);
        event.share_with_user("u1");

        assert!(event.can_user_view("creator"));
        assert!(event.can_user_view("u1"));
        assert!(!event.can_user_view("u2"));
    }

    #[test]
    fn test_shared_email_does_not_grant_user_view() {
        let mut event = owned_by("creator", Visibility::Shared);
        event.share_with_email("bob@example.com");
        assert!(!event.can_user_view("bob@example.com"));
    }

    #[test]
    fn test_share_with_user_is_idempotent() {
        let mut event = owned_by("alice", Visibility::Shared);
        event.share_with_user("u1");
        event.share_with_user("u1");

        assert_eq!(event.shared_with_user_ids(), ["u1".to_string()]);
    }

    #[test]
    fn test_share_with_user_promotes_private() {
        let mut event = owned_by("alice", Visibility::Private);
        event.share_with_user("bob");
        assert_eq!(event.visibility(), Visibility::Shared);
        assert!(event.can_user_view("bob"));
    }

    #[test]
    fn test_share_with_email_promotes_private() {
        let mut event = owned_by("alice", Visibility::Private);
        event.share_with_email("a@b.com");
        assert_eq!(event.visibility(), Visibility::Shared);
        assert_eq!(event.shared_with_emails(), ["a@b.com".to_string()]);
    }

    #[test]
    fn test_share_keeps_public_public() {
        let mut event = owned_by("alice", Visibility::Public);
        event.share_with_user("bob");
        event.share_with_email("c@d.com");
        assert_eq!(event.visibility(), Visibility::Public);
    }

    #[test]
    fn test_remove_last_user_demotes_to_private() {
        let mut event = owned_by("alice", Visibility::Shared);
        event.share_with_user("u1");

        event.remove_shared_user("u1");

        assert!(event.shared_with_user_ids().is_empty());
        assert_eq!(event.visibility(), Visibility::Private);
    }

    #[test]
    fn test_remove_user_keeps_shared_while_emails_remain() {
        let mut event = owned_by("alice", Visibility::Shared);
        event.share_with_user("u1");
        event.share_with_email("x@y.com");

        event.remove_shared_user("u1");
        assert_eq!(event.visibility(), Visibility::Shared);

        event.remove_shared_email("x@y.com");
        assert_eq!(event.visibility(), Visibility::Private);
    }

    #[test]
    fn test_remove_from_empty_lists_demotes_public_event() {
        // Removal always re-checks the lists, even for a public event.
        let mut event = owned_by("alice", Visibility::Public);
        event.remove_shared_user("nobody");
        assert_eq!(event.visibility(), Visibility::Private);
    }

    #[test]
    fn test_reshare_after_demotion_promotes_again() {
        let mut event = owned_by("alice", Visibility::Shared);
        event.share_with_user("u1");
        event.remove_shared_user("u1");
        event.share_with_user("u2");
        assert_eq!(event.visibility(), Visibility::Shared);
        assert!(event.can_user_view("u2"));
        assert!(!event.can_user_view("u1"));
    }
}
