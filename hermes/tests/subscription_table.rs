use hermes::broker::{ConnectionId, SubscriptionTable};
use std::collections::HashSet;

fn set(sensors: &[&str]) -> HashSet<String> {
    sensors.iter().map(|sensor| sensor.to_string()).collect()
}

#[cfg(test)]
mod subscription_table_tests {
    use super::*;

    #[test]
    fn subscribe_twice_then_unsubscribe_once_removes() {
        let mut table = SubscriptionTable::new();
        let client = ConnectionId::new(1);

        assert!(table.insert(client, "S1".to_string()));
        assert!(!table.insert(client, "S1".to_string()));
        assert!(table.contains(client, "S1"));

        assert!(table.remove(client, "S1"));
        assert!(!table.contains(client, "S1"));
        assert_eq!(table.sensors(client), Some(&set(&[])));
    }

    #[test]
    fn removing_absent_sensor_is_a_no_op() {
        let mut table = SubscriptionTable::new();
        let client = ConnectionId::new(1);

        assert!(!table.remove(client, "S9"));
        assert!(table.is_empty());

        table.insert(client, "S1".to_string());
        assert!(!table.remove(client, "S9"));
        assert_eq!(table.sensors(client), Some(&set(&["S1"])));
    }

    #[test]
    fn replace_overwrites_previous_set() {
        let mut table = SubscriptionTable::new();
        let agent = ConnectionId::new(7);

        table.insert(agent, "OLD".to_string());
        table.replace(agent, ["S1".to_string(), "S2".to_string()]);
        assert_eq!(table.sensors(agent), Some(&set(&["S1", "S2"])));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn subscribers_exclude_sender_and_strangers() {
        let mut table = SubscriptionTable::new();
        let agent = ConnectionId::new(1);
        let first = ConnectionId::new(2);
        let second = ConnectionId::new(3);
        let stranger = ConnectionId::new(4);

        table.replace(agent, ["S1".to_string()]);
        table.insert(second, "S1".to_string());
        table.insert(first, "S1".to_string());
        table.insert(stranger, "S2".to_string());

        assert_eq!(table.subscribers("S1", agent), vec![first, second]);
        assert_eq!(table.subscribers("S3", agent), Vec::<ConnectionId>::new());
    }

    #[test]
    fn discard_drops_the_whole_entry() {
        let mut table = SubscriptionTable::new();
        let client = ConnectionId::new(1);
        table.insert(client, "S1".to_string());

        assert_eq!(table.discard(client), Some(set(&["S1"])));
        assert!(table.sensors(client).is_none());
        assert!(table.is_empty());
        assert_eq!(table.discard(client), None);
    }

    #[test]
    fn connection_ids_display_stably() {
        assert_eq!(ConnectionId::new(12).to_string(), "conn-12");
    }
}
