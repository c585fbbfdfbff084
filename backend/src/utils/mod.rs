pub mod clock;
pub mod cookies;
pub mod jwt;
pub mod password;

pub use clock::*;
pub use jwt::*;
pub use password::*;
