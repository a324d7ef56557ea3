//! JNI face of the tether registry.
//!
//! A Java peer class carries a `long` field named `objectHandle`. [bind]
//! writes a registry handle into it, [resolve] reads it back, and releasing
//! (from either side of the boundary) zeroes it and drops the native
//! object. Failures on the resolve path are soft: a missing field or a
//! cleared handle yields [None] and never raises into Java.

pub mod binder;
pub mod exports;
pub mod meta;

pub use binder::bind;
pub use binder::release_peer;
pub use binder::resolve;
pub use binder::with_native;
pub use binder::Binding;

use thiserror::Error;

/// Errors of the binder layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The peer class has no handle field.
    #[error("Class `{class}` has no `{field}` field", field = crate::meta::HANDLE_FIELD)]
    FieldNotFound { class: String },

    #[error(transparent)]
    Jni(#[from] jni::errors::Error),
}
