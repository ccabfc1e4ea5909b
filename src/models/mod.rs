pub mod conversation;
pub mod enums;
pub mod record;
pub mod symptom;
pub mod vital_sign;

pub use conversation::*;
pub use record::*;
pub use symptom::*;
pub use vital_sign::*;
