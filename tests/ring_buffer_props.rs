use proptest::prelude::*;
use ring_pipeline::RingBuffer;

proptest! {
    #[test]
    fn test_cursor_stays_within_capacity(
        capacity in 1usize..32,
        values in prop::collection::vec(any::<i64>(), 0..200)
    ) {
        let buffer = RingBuffer::new(capacity).unwrap();
        for v in values {
            buffer.push(v);
            // Property: cursor is always a valid slot index
            let cursor = buffer.write_cursor().unwrap();
            prop_assert!(cursor < capacity);
            prop_assert_eq!(buffer.capacity(), capacity);
        }
    }

    #[test]
    fn test_drain_yields_last_capacity_items(
        capacity in 1usize..32,
        values in prop::collection::vec(any::<i64>(), 1..200)
    ) {
        let buffer = RingBuffer::new(capacity).unwrap();
        for &v in &values {
            buffer.push(v);
        }

        // Property: the newest `capacity` pushes survive, oldest first
        let start = values.len().saturating_sub(capacity);
        prop_assert_eq!(buffer.drain_and_reset(), values[start..].to_vec());
        prop_assert!(buffer.drain_and_reset().is_empty());
    }
}
