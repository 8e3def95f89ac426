pub mod bill;
pub mod dispute;
pub mod enums;
pub mod line_item;

pub use bill::*;
pub use dispute::*;
pub use line_item::*;
