pub mod discharge;
pub mod enums;
pub mod stage;

pub use discharge::*;
pub use enums::*;
pub use stage::*;
