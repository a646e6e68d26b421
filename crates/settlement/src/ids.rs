//! UUID-backed id generation.

use bet_core::IdGenerator;
use uuid::Uuid;

/// Random v4 UUIDs for new rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let ids = UuidIds;
        assert_ne!(ids.new_id(), ids.new_id());
    }
}
