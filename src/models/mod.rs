pub mod alert;
pub mod enums;
pub mod patient;
pub mod physician;

pub use alert::*;
pub use enums::{EatingStatus, PainSeverity};
pub use patient::*;
pub use physician::*;
