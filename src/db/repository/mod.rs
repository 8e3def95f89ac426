pub mod analysis;
pub mod bill;
pub mod line_item;

pub use analysis::*;
pub use bill::*;
pub use line_item::*;
