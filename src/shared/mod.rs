pub mod errors;
pub mod retry;
pub mod shutdown;
pub mod time;
pub mod types;

pub use errors::*;
pub use retry::*;
pub use shutdown::*;
pub use types::*;
