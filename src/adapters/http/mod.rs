pub mod session;

pub use session::{HttpPage, SessionClient};
