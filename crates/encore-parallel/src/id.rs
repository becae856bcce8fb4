use crate::error::{ParallelError, ParallelResult};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct JobId(u64);

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<JobId> for u64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct JobIdGenerator {
    next_value: u64,
}

impl JobIdGenerator {
    pub fn new() -> Self {
        Self { next_value: 1 }
    }

    pub fn next(&mut self) -> ParallelResult<JobId> {
        let value = self.next_value;
        self.next_value = value
            .checked_add(1)
            .ok_or_else(|| ParallelError::Internal("job ID overflow".to_string()))?;
        Ok(JobId(value))
    }
}

impl Default for JobIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
