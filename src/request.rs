use derive_more::Display;
use uuid::Uuid;

/// Request-scoped identifier threaded through logging and stored with each
/// upload row.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("{_0}")]
pub struct RequestId(u32);

impl RequestId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// First 32 bits of a random UUID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().as_fields().0)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for RequestId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}
