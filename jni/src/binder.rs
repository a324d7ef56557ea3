//! Binding native objects to their Java peers.

use crate::meta::FIELDS;
use crate::Error;
use jni::objects::GlobalRef;
use jni::objects::JObject;
use jni::objects::JValue;
use jni::signature::JavaType;
use jni::signature::Primitive;
use jni::JNIEnv;
use std::any::Any;
use tether_runtime::registry::REGISTRY;
use tether_runtime::Handle;
use tether_runtime::HANDLE_NONE;

/// Live association between one native object and one Java peer.
///
/// Created by [bind]. The native object stays in the registry for exactly
/// as long as this guard is neither released nor dropped. Dropping a guard
/// without calling [release](Binding::release) still evicts the registry
/// entry, so a handle left behind in the peer's field can never resolve to
/// a dangling object; only the zeroing of the Java field is skipped.
pub struct Binding {
    handle: Handle,
    peer: Option<GlobalRef>,
}

impl Binding {
    /// The handle written into the peer's field.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Severs the association: zeroes the peer's handle field, drops the
    /// native object and the reference to the peer.
    ///
    /// Safe to call twice; the second call observes a cleared reference and
    /// does nothing. JNI failures while zeroing are logged and swallowed so
    /// release stays usable on teardown paths.
    pub fn release(&mut self, env: &JNIEnv) {
        if let Some(peer) = self.peer.take() {
            clear_field(env, peer.as_obj());
            REGISTRY.remove(self.handle);
        }
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        if self.peer.take().is_some() {
            log::warn!(
                "Binding {} dropped without release, evicting the native object",
                self.handle
            );
            REGISTRY.remove(self.handle);
        }
    }
}

/// Stores `native` in the registry and writes its fresh handle into
/// `peer`'s handle field.
///
/// The returned [Binding] owns the native object's registry entry and a
/// global reference to `peer`. If the field write or the reference fails,
/// the registry entry is rolled back.
pub fn bind<T: Any + Send>(env: &JNIEnv, peer: JObject, native: T) -> Result<Binding, Error> {
    let field = FIELDS.lookup(env, peer)?;
    let handle = REGISTRY.store(native);
    if let Err(err) = env.set_field_unchecked(peer, field.as_jni(), JValue::Long(handle)) {
        REGISTRY.remove(handle);
        return Err(err.into());
    }
    match env.new_global_ref(peer) {
        Ok(peer) => Ok(Binding {
            handle,
            peer: Some(peer),
        }),
        Err(err) => {
            REGISTRY.remove(handle);
            Err(err.into())
        }
    }
}

/// Recovers the handle bound to `peer`.
///
/// [None] when the peer's class has no handle field, the field holds the
/// cleared sentinel, or the handle is no longer alive in the registry. A
/// released peer therefore never resolves to a stale object.
pub fn resolve(env: &JNIEnv, peer: JObject) -> Option<Handle> {
    let field = match FIELDS.lookup(env, peer) {
        Ok(field) => field,
        Err(_) => return None,
    };
    let handle = read_field(env, peer, field);
    if handle == HANDLE_NONE || !REGISTRY.alive(handle) {
        None
    } else {
        Some(handle)
    }
}

/// Runs `action` on the native object bound to `peer`.
pub fn with_native<T: Any, R>(
    env: &JNIEnv,
    peer: JObject,
    action: impl FnOnce(&mut T) -> R,
) -> Option<R> {
    let handle = resolve(env, peer)?;
    REGISTRY.peek(handle, action)
}

/// Releases by peer alone, for calls arriving from the Java side where no
/// [Binding] guard is in scope.
///
/// Evicts the registry entry named by the peer's field and zeroes the
/// field. Idempotent and soft: an unbound or already released peer is left
/// as is.
pub fn release_peer(env: &JNIEnv, peer: JObject) {
    let field = match FIELDS.lookup(env, peer) {
        Ok(field) => field,
        Err(_) => return,
    };
    let handle = read_field(env, peer, field);
    if handle != HANDLE_NONE {
        REGISTRY.remove(handle);
        if let Err(err) = env.set_field_unchecked(peer, field.as_jni(), JValue::Long(HANDLE_NONE)) {
            log::warn!("Failed to clear the handle field: {}", err);
        }
    }
}

fn read_field(env: &JNIEnv, peer: JObject, field: crate::meta::FieldId) -> Handle {
    env.get_field_unchecked(peer, field.as_jni(), JavaType::Primitive(Primitive::Long))
        .and_then(|value| value.j())
        .unwrap_or(HANDLE_NONE)
}

fn clear_field(env: &JNIEnv, peer: JObject) {
    match FIELDS.lookup(env, peer) {
        Ok(field) => {
            if let Err(err) =
                env.set_field_unchecked(peer, field.as_jni(), JValue::Long(HANDLE_NONE))
            {
                log::warn!("Failed to clear the handle field: {}", err);
            }
        }
        Err(err) => log::warn!("Failed to clear the handle field: {}", err),
    }
}
