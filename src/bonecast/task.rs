//! Deferred bone-cast work for an external task queue.

use std::sync::Arc;

use crate::node::NodeConfig;

use super::handle::ObjectHandle;
use super::service::BoneCast;
use super::source::MeshSource;

/// A unit of work accepted by the host's scheduler.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Anything that can run a job later, on some thread.
pub trait WorkQueue {
    fn submit(&self, job: Job);
}

/// Runs every job immediately on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineQueue;

impl WorkQueue for InlineQueue {
    fn submit(&self, job: Job) {
        job();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Make sure a fresh collider is cached (`BoneCast::get`).
    Ensure,
    /// Re-sample from the live mesh (`BoneCast::update`).
    Sample,
}

#[derive(Debug, Clone)]
pub struct BoneCastTask {
    pub handle: ObjectHandle,
    pub node: String,
    pub config: NodeConfig,
    pub kind: TaskKind,
}

impl BoneCastTask {
    pub fn ensure(handle: ObjectHandle, node: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            handle,
            node: node.into(),
            config,
            kind: TaskKind::Ensure,
        }
    }

    pub fn sample(handle: ObjectHandle, node: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            handle,
            node: node.into(),
            config,
            kind: TaskKind::Sample,
        }
    }

    /// Run now. Returns whether the cache holds usable geometry afterwards.
    pub fn run<S: MeshSource>(&self, bonecast: &BoneCast<S>) -> bool {
        match self.kind {
            TaskKind::Ensure => bonecast.get(self.handle, &self.node, &self.config).is_some(),
            TaskKind::Sample => bonecast.update(self.handle, &self.node, &self.config),
        }
    }

    /// Hand the task to `queue`.
    pub fn submit<S, Q>(self, bonecast: Arc<BoneCast<S>>, queue: &Q)
    where
        S: MeshSource + 'static,
        Q: WorkQueue + ?Sized,
    {
        queue.submit(Box::new(move || {
            if !self.run(&bonecast) {
                log::debug!(
                    "[bonecast] [{}] {:?} task for '{}' did not produce geometry",
                    self.handle,
                    self.kind,
                    self.node
                );
            }
        }));
    }
}
