//! Size policy verdicts and deployment advice.

pub mod advice;
pub mod threshold;
