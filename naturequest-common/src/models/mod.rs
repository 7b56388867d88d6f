// naturequest-common/src/models/mod.rs

pub mod user;
pub mod progress;
pub mod quiz;
pub mod challenge;

pub use user::*;
pub use progress::*;
pub use quiz::*;
pub use challenge::*;
