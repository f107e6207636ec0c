pub mod challenge;
pub mod email;
pub mod wallet;

pub use challenge::issue_challenge;
pub use email::{login, signup};
pub use wallet::{link_wallet, verify_wallet};
