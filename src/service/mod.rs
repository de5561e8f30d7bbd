pub mod accounts;
pub mod validation;
