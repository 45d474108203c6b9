//! # pulse-core
//!
//! Foundation types for the pulse streaming-event client.
//!
//! This crate provides the shared vocabulary the streaming subsystem and its
//! dashboard consumers depend on:
//!
//! - **Branded IDs**: `SessionId`, `ResourceId` as newtypes for type safety
//! - **Feed events**: `FeedEvent` enum covering every event kind a live
//!   dashboard widget renders (token deltas, progress, discoveries, logs)
//! - **Errors**: `StreamError` hierarchy via `thiserror`
//! - **Rolling buffer**: fixed-capacity, insertion-ordered event history

#![deny(unsafe_code)]

pub mod buffer;
pub mod errors;
pub mod events;
pub mod ids;
