//!
//! src/lib.rs  Oct 2nd, 2026
//!
//! Turns a free text mood or theme into a grouped Spotify playlist:
//! suggestions from a chat model, resolution against the catalog,
//! shortfall top up, grouping into primary plus alternates
//!

pub mod config;
pub mod errors;
pub mod logging;

pub mod fetch;
pub mod provider;
pub mod types;

pub mod cache;
pub mod catalog;
pub mod suggest;

pub mod assemble;
pub mod batch;
pub mod events;
pub mod matcher;
pub mod pipeline;
pub mod shortfall;

pub mod persistent;
pub mod publish;

#[cfg(test)]
mod testing;
