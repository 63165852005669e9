//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the generation flow and session bookkeeping so route
//! handlers can stay focused on protocol translation.

pub mod generate;
