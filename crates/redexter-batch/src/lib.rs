//! redexter-batch: decrypt many files in order on a worker thread
//!
//! The initiator keeps a [`BatchHandle`]: it can cancel (honoured between
//! files), poll the progress percentage, and drain [`BatchEvent`]s from an
//! unbounded channel. Exactly one [`BatchEvent::Finished`] ends every batch.

pub mod job;
pub mod orchestrator;

pub use job::DecryptionJob;
pub use orchestrator::{
    percent, spawn, BatchEvent, BatchHandle, BatchOutcome, BatchStatus, EventFn, Orchestrator,
};
