//! Cover image storage.
//!
//! Incoming files are first written to a [`StagedImage`] (a named temporary file that
//! disappears on drop) and then pushed to an [`ImageStore`]. The batch helpers in
//! [`batch`] define what happens when only part of a batch succeeds.

pub mod batch;
pub mod error;
pub mod staged;
pub mod store;

pub use batch::{destroy_all, upload_all, DestroyReport};
pub use error::{MediaError, StageError};
pub use staged::StagedImage;
pub use store::{ImageStore, ObjectImageStore, StoredImage};
