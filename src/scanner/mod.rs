//! Asset scanner: directory walker, skip rules, size, extension, large-file
//! and unused-asset passes.

pub mod entry;
pub mod exclusion;
pub mod filter;
pub mod large;
pub mod references;
pub mod size;
pub mod walker;

#[cfg(test)]
mod test_properties;
