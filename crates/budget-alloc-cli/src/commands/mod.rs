pub mod allocation;
pub mod scenarios;
pub mod sensitivity;
