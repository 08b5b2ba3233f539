pub mod permission;

pub use permission::{get_current_user, require_permission, CurrentUser};
