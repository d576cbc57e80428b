mod role;
mod session;

pub use role::*;
pub use session::*;
