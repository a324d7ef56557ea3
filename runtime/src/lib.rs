//! Keeping native objects alive and addressable while a managed runtime
//! holds references to them.
//!
//! The managed side never sees a native address. It sees a [Handle] issued
//! by the [registry](registry::Registry), which stays valid until the
//! object is removed and can be probed for liveness at any time.

pub mod registry;

/// Opaque identifier of a native object stored in a [Registry](registry::Registry).
///
/// Sized to fit a Java `long` field. `0` is never issued; it is the value a
/// cleared handle field holds.
pub type Handle = i64;

/// The sentinel meaning "no binding".
pub const HANDLE_NONE: Handle = 0;
