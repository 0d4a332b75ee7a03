//! Non-blocking delay between attempts.

use std::time::Duration;

/// Suspends the current task for `delay`.
///
/// On native targets this is `tokio::time::sleep`. On WASM targets the wait
/// is a promise resolved by the host's `setTimeout`.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) async fn sleep(delay: Duration) {
    tokio::time::sleep(delay).await;
}

#[cfg(target_arch = "wasm32")]
pub(crate) async fn sleep(delay: Duration) {
    use wasm_bindgen::{JsCast, JsValue};

    let millis = delay.as_millis().min(i32::MAX as u128) as i32;
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let set_timeout = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("setTimeout"))
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok());
        match set_timeout {
            Some(set_timeout) => {
                if set_timeout
                    .call2(&JsValue::NULL, &resolve, &JsValue::from(millis))
                    .is_err()
                {
                    let _ = resolve.call0(&JsValue::NULL);
                }
            }
            // No usable timer in this runtime: continue immediately.
            None => {
                let _ = resolve.call0(&JsValue::NULL);
            }
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}
