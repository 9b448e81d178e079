//! treescribe - Describe every directory of a project in one Markdown report
//!
//! Enumerates a project tree, labels leaf directories from path and content
//! heuristics, then merges child labels upward one depth level at a time.
//! The report is written incrementally so an interrupted run can be resumed.
//! Also ships a few skill-package helpers (host info, release fetcher,
//! package checker).

pub mod classifier;
pub mod cli;
pub mod config;
pub mod fetcher;
pub mod hostinfo;
pub mod orchestrator;
pub mod propagator;
pub mod report;
pub mod skillcheck;
pub mod util;
pub mod walker;
