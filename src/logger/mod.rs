//! Activity logging: typed audit events written as append-only JSONL.

pub mod activity;
pub mod jsonl;
