//! Cached resolution of the peer's handle field.

use crate::Error;
use jni::objects::JClass;
use jni::objects::JFieldID;
use jni::objects::JObject;
use jni::objects::JString;
use jni::sys::jfieldID;
use jni::JNIEnv;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;

/// Name of the `long` field a peer class carries its handle in.
pub const HANDLE_FIELD: &str = "objectHandle";

/// JNI signature of [HANDLE_FIELD].
pub const HANDLE_SIGNATURE: &str = "J";

/// The global [FieldTable] shared by all binder operations.
pub static FIELDS: Lazy<FieldTable> = Lazy::new(Default::default);

/// A resolved JNI field ID.
///
/// Field IDs stay valid in any thread for as long as the defining class is
/// loaded, which for bound peer classes is the process lifetime.
#[derive(Clone, Copy)]
pub struct FieldId(jfieldID);

unsafe impl Send for FieldId {}

impl FieldId {
    pub fn as_jni<'a>(self) -> JFieldID<'a> {
        self.0.into()
    }
}

/// Per-class cache of the resolved [HANDLE_FIELD] ID.
///
/// Binding, releasing and resolving all go through the same cache, so a
/// class is inspected exactly once. Classes that lack the field are cached
/// as misses; repeated lookups on them stay cheap and raise nothing.
#[derive(Default)]
pub struct FieldTable {
    table: Mutex<HashMap<String, Option<FieldId>>>,
}

impl FieldTable {
    /// Resolves the handle field of `peer`'s class, consulting the cache
    /// first.
    ///
    /// A class without the field yields [Error::FieldNotFound] and leaves
    /// no pending Java exception behind.
    pub fn lookup(&self, env: &JNIEnv, peer: JObject) -> Result<FieldId, Error> {
        let class = env.get_object_class(peer)?;
        let name = class_name(env, class)?;

        let mut table = self.table.lock().expect("Failed to lock the field table");
        if let Some(cached) = table.get(&name).copied() {
            return cached.ok_or(Error::FieldNotFound { class: name });
        }

        match env.get_field_id(class, HANDLE_FIELD, HANDLE_SIGNATURE) {
            Ok(id) => {
                let id = FieldId(id.into_inner());
                table.insert(name, Some(id));
                Ok(id)
            }
            Err(jni::errors::Error::JavaException) => {
                // Swallow the NoSuchFieldError the lookup raised
                env.exception_clear()?;
                log::debug!("Class `{}` has no `{}` field", name, HANDLE_FIELD);
                table.insert(name.clone(), None);
                Err(Error::FieldNotFound { class: name })
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn class_name(env: &JNIEnv, class: JClass) -> Result<String, jni::errors::Error> {
    let name = env
        .call_method(class, "getName", "()Ljava/lang/String;", &[])?
        .l()?;
    Ok(env.get_string(JString::from(name))?.into())
}
