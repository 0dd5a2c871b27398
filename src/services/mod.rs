// src/services/mod.rs

pub mod arrears;
pub mod batch;
pub mod bonus;
pub mod calculator;
pub mod loans;
