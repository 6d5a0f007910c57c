pub use common;
pub use driver;
pub use session;
