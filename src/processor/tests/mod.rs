//! Integration tests for the processor module
//!
//! Tests the complete preprocessing pipeline over temporary data directories.
