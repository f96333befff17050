use anyhow::Result;

pub const USERS_KEY: &str = "splitbill_users";
pub const SESSION_KEY: &str = "splitbill_session";
pub const BILLS_KEY: &str = "splitbill_bills";

/// String key/value storage with local-storage semantics.
///
/// Access is synchronous. Implementations guarantee atomicity of a single
/// call only; callers that read, modify and write back a value get no
/// protection against an interleaved writer.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}
