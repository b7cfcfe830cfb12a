pub mod jwt;
pub mod middleware;
mod principal;

pub use principal::Principal;
