//! HTTP server and command line front end for the route planner

pub mod api;
pub mod config;
