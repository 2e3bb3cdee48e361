#![allow(dead_code)]
//! Helpers for running engine tests against a throwaway SQLite database.
pub mod mock_gateway;
pub mod prepare_env;
pub mod orders;
