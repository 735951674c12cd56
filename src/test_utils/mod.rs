//! Shared test helpers: configs, fixtures, portal HTML and mock portals.

#![cfg(test)]

pub mod html;
pub mod mocks;
