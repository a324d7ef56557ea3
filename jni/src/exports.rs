//! Bridge functions for the Java peer base class `tether.NativeObject`.

use jni::objects::JObject;
use jni::JNIEnv;

#[no_mangle]
pub extern "C" fn Java_tether_NativeObject_release(env: JNIEnv, this: JObject) {
    crate::binder::release_peer(&env, this);
}

#[no_mangle]
pub extern "C" fn Java_tether_NativeObject_alive(env: JNIEnv, this: JObject) -> bool {
    crate::binder::resolve(&env, this).is_some()
}
