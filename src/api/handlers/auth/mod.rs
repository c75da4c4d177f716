pub mod login;
pub mod me;
pub mod principal;
pub mod signup;
pub mod types;
