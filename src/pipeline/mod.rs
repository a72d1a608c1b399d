pub mod fetch;
pub mod extraction;
pub mod sections;
pub mod classify;
pub mod processor; // fetch → extract → gate → segment → classify

use std::any::Any;

/// Readable text from a `catch_unwind` payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
