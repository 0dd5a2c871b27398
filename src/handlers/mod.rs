// src/handlers/mod.rs

pub mod bonus;
pub mod general;
pub mod inputs;
pub mod obligations;
pub mod payroll;
