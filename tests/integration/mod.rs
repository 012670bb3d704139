//! Integration tests module
//!
//! This module organizes all integration tests for the r-lessonaudio application.

// Import individual test modules
pub mod config_test;
pub mod lesson_test;
pub mod player_test;
