//! Inspection stage: read the permission flags of a retrieved PDF.

pub mod error;
pub mod permissions;
pub mod validator;

pub use error::InspectionError;
pub use permissions::{can_print, PermissionFlag, PermissionSet};
pub use validator::PdfPermissionValidator;
