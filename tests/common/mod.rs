//! Shared fixtures for criteria integration and property tests

#![allow(dead_code)]

pub mod fixtures;
