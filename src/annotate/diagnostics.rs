//! Developer diagnostics.
//!
//! Browser console on wasm32, `tracing` events everywhere else.

#[cfg(target_arch = "wasm32")]
pub fn debug(msg: &str) {
    web_sys::console::debug_1(&wasm_bindgen::JsValue::from_str(&format!("[kittmark] {}", msg)));
}

#[cfg(not(target_arch = "wasm32"))]
pub fn debug(msg: &str) {
    tracing::debug!(target: "kittmark", "{}", msg);
}

#[cfg(target_arch = "wasm32")]
pub fn warn(msg: &str) {
    web_sys::console::warn_1(&wasm_bindgen::JsValue::from_str(&format!("[kittmark] {}", msg)));
}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(msg: &str) {
    tracing::warn!(target: "kittmark", "{}", msg);
}

#[cfg(target_arch = "wasm32")]
pub fn error(msg: &str) {
    web_sys::console::error_1(&wasm_bindgen::JsValue::from_str(&format!("[kittmark] {}", msg)));
}

#[cfg(not(target_arch = "wasm32"))]
pub fn error(msg: &str) {
    tracing::error!(target: "kittmark", "{}", msg);
}
