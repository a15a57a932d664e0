pub mod csl;
pub mod identifier;
pub mod record;
pub mod reference;
pub mod result;

pub use csl::*;
pub use identifier::*;
pub use record::*;
pub use reference::*;
pub use result::*;
