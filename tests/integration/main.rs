//! Integration tests for Listing-Harvest
//!
//! These drive the orchestrator end to end against real repositories, with
//! scripted fetchers or wiremock servers standing in for the shop.

mod common;
mod notify_tests;
mod scrape_tests;
