//! Notification decisions. Pure functions: storage is reached only through the
//! predicates the caller passes in.

use crate::domain::model::{Message, MessageId, ScrapingResult};
use std::collections::HashSet;

/// 找出尚未通知過的訊息，保持原順序
pub fn find_new_messages<F>(result: &ScrapingResult, is_already_notified: F) -> Vec<Message>
where
    F: Fn(&MessageId) -> bool,
{
    result
        .messages
        .iter()
        .filter(|message| !is_already_notified(&message.id))
        .cloned()
        .collect()
}

pub fn should_send_general_notification(result: &ScrapingResult, already_sent: bool) -> bool {
    result.has_notification && !already_sent
}

pub fn extract_message_ids(result: &ScrapingResult) -> HashSet<MessageId> {
    result
        .messages
        .iter()
        .map(|message| message.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn message(id: &str) -> Message {
        Message {
            id: MessageId::new(id).unwrap(),
            title: format!("Title {}", id),
            sender: "Bob".to_string(),
            recipient: "Alice".to_string(),
            section: "membre".to_string(),
        }
    }

    #[test]
    fn test_find_new_messages_filters_by_id_and_keeps_order() {
        let result = ScrapingResult::new(vec![message("3"), message("1"), message("2")], false);
        let notified: HashSet<MessageId> = [MessageId::new("1").unwrap()].into_iter().collect();

        let new_messages = find_new_messages(&result, |id| notified.contains(id));

        let ids: Vec<&str> = new_messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[test]
    fn test_find_new_messages_is_idempotent_until_marked() {
        let result = ScrapingResult::new(vec![message("a"), message("b")], false);
        let ledger = RefCell::new(HashSet::new());

        let first = find_new_messages(&result, |id| ledger.borrow().contains(id));
        let second = find_new_messages(&result, |id| ledger.borrow().contains(id));
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);

        for message in &first {
            ledger.borrow_mut().insert(message.id.clone());
        }

        let third = find_new_messages(&result, |id| ledger.borrow().contains(id));
        assert!(third.is_empty());
    }

    #[test]
    fn test_should_send_general_notification() {
        let flagged = ScrapingResult::new(vec![], true);
        let quiet = ScrapingResult::new(vec![message("1")], false);

        assert!(should_send_general_notification(&flagged, false));
        assert!(!should_send_general_notification(&flagged, true));
        assert!(!should_send_general_notification(&quiet, false));
        assert!(!should_send_general_notification(&quiet, true));
    }

    #[test]
    fn test_extract_message_ids() {
        let result = ScrapingResult::new(vec![message("1"), message("2"), message("1")], false);
        let ids = extract_message_ids(&result);

        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&MessageId::new("1").unwrap()));
        assert!(ids.contains(&MessageId::new("2").unwrap()));
        assert!(extract_message_ids(&ScrapingResult::empty()).is_empty());
    }
}
