// Random identities for persisted records.

use uuid::Uuid;

use super::traits::IdGenerator;

/// Mints v4 UUIDs, hyphenated.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
