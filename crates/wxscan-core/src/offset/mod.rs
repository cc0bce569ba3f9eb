mod record;
mod table;

pub use record::*;
pub use table::*;
