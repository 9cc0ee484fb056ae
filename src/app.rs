//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the book list, the
//! selection and the playback state.

mod model;

pub use model::*;
