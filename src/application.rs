//! The node services a transactor may consult

use crate::compliance::{ComplianceRegistry, ComplianceSnapshot};
use crate::config::Config;
use crate::error::Result;
use crate::fee::LOAD_BASE;
use crate::logging::Journal;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Queued client jobs above which limited callers are turned away
pub const MAX_JOB_QUEUE_CLIENTS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    Client,
    Transaction,
    Ledger,
}

/// Read-only view of the node's job scheduler
pub trait JobQueue: Send + Sync {
    /// Number of queued jobs of `job_type` or any more urgent type
    fn job_count_ge(&self, job_type: JobType) -> usize;
}

/// Scheduler that never has work queued
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleJobQueue;

impl JobQueue for IdleJobQueue {
    fn job_count_ge(&self, _job_type: JobType) -> usize {
        0
    }
}

/// Privilege of the submitting caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Guest,
    User,
    Identified,
    Admin,
}

impl Role {
    /// Exempt from load limits
    pub fn is_unlimited(self) -> bool {
        matches!(self, Role::Admin | Role::Identified)
    }
}

/// Local server load, as a multiple of `LOAD_BASE`
#[derive(Debug)]
pub struct FeeTrack {
    load_factor: AtomicU32,
}

impl FeeTrack {
    pub fn new() -> Self {
        Self {
            load_factor: AtomicU32::new(LOAD_BASE),
        }
    }

    pub fn load_factor(&self) -> u32 {
        self.load_factor.load(Ordering::Acquire)
    }

    /// Never drops below the unloaded base
    pub fn set_load_factor(&self, factor: u32) {
        self.load_factor
            .store(factor.max(LOAD_BASE), Ordering::Release);
    }

    pub fn is_loaded(&self) -> bool {
        self.load_factor() > LOAD_BASE
    }
}

impl Default for FeeTrack {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared node services handed to every pipeline context
pub struct Application {
    config: Config,
    compliance: ComplianceRegistry,
    job_queue: Arc<dyn JobQueue>,
    fee_track: FeeTrack,
    journal: Journal,
}

impl Application {
    /// Build from config; compliance lists are seeded from it
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let snapshot = ComplianceSnapshot::from_config(&config)?;
        Ok(Self {
            config,
            compliance: ComplianceRegistry::new(snapshot),
            job_queue: Arc::new(IdleJobQueue),
            fee_track: FeeTrack::new(),
            journal: Journal::default(),
        })
    }

    pub fn with_job_queue(mut self, job_queue: Arc<dyn JobQueue>) -> Self {
        self.job_queue = job_queue;
        self
    }

    /// Route every partition journal through `journal`'s sink
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn compliance(&self) -> &ComplianceRegistry {
        &self.compliance
    }

    pub fn fee_track(&self) -> &FeeTrack {
        &self.fee_track
    }

    pub fn job_queue(&self) -> &dyn JobQueue {
        self.job_queue.as_ref()
    }

    /// Journal for a named partition
    pub fn journal(&self, partition: &str) -> Journal {
        self.journal.partition(partition)
    }

    /// Whether a caller with `role` should be refused for load
    pub fn is_too_busy(&self, role: Role) -> bool {
        !role.is_unlimited()
            && self.job_queue.job_count_ge(JobType::Client) > MAX_JOB_QUEUE_CLIENTS
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.config)
            .field("load_factor", &self.fee_track.load_factor())
            .field("compliance_version", &self.compliance.snapshot().version)
            .finish()
    }
}
