pub mod criteria;
pub mod listing;

pub use criteria::*;
pub use listing::*;
