pub mod lead;
pub mod token;
pub mod user;
