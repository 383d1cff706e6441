//! Test suite for gestion-sync
//!
//! This module organizes all tests
