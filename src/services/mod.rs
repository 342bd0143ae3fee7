pub mod session;
pub mod wait;
pub mod workflow;

pub use session::*;
pub use wait::*;
pub use workflow::*;
