// src/lib.rs

pub mod config;
pub mod error;
pub mod logging;

pub mod services {
    pub mod backend;
    pub mod quote_provider;
    pub mod supabase;
    pub mod yahoo_finance;
}

pub mod models;
pub mod jobs;
