//! Rule queries

pub mod list_rules;
