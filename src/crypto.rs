mod signing_key;
mod token;

pub use signing_key::*;
pub use token::*;
