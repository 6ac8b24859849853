pub mod account;
pub mod config;
pub mod db;
pub mod logging;
pub mod pricing;
pub mod reference;
pub mod report;
pub mod valuation;
