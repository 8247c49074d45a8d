use crate::models::{JobApplication, JobStatus};

/// Aggregate counts over a job snapshot. Always derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub interviewing: usize,
    pub offers: usize,
    pub rejected: usize,
}

impl Stats {
    pub fn from_jobs(jobs: &[JobApplication]) -> Self {
        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count();
        Self {
            total: jobs.len(),
            active: jobs.iter().filter(|j| j.status.is_active()).count(),
            interviewing: count(JobStatus::Interviewing),
            offers: count(JobStatus::Offer),
            rejected: count(JobStatus::Rejected),
        }
    }

    /// Tile title and value, in display order.
    pub fn tiles(&self) -> [(&'static str, usize); 5] {
        [
            ("Total Applications", self.total),
            ("Active", self.active),
            ("Interviewing", self.interviewing),
            ("Offers", self.offers),
            ("Rejected", self.rejected),
        ]
    }
}
