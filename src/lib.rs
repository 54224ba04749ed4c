//! MedBridge - Translation-Aware Medical Chat Gateway
//!
//! A chat gateway that normalizes user input to English before it reaches
//! the medical language model, streams the English reply back to the caller,
//! translates the finished reply to Vietnamese with bilingual medical
//! terminology, and persists the full transcript.

pub mod chat;
pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod sanitize;
pub mod terms;
pub mod translate;
pub mod web;
