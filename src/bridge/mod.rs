mod in_memory_test;
mod traits;

pub use self::in_memory_test::{InMemoryBridge, InMemoryResponseBuilder, RecordedQuery};
pub use self::traits::{Credentials, NativeBridge, NativeConnection, NativeCursor};
