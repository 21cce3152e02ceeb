//! Feed responder: watches a social feed and answers new items with
//! generated, keyword-bearing replies and quote comments.

pub mod cli;
pub mod composer;
pub mod config;
pub mod dedup;
pub mod error;
pub mod language;
pub mod llm;
pub mod monitor;
pub mod orchestrator;
pub mod sanitize;
pub mod stop;
pub mod surface;
pub mod timing;
