//! Container metadata cache and task/framework reconciliation

mod cache;
mod reconcile;

#[cfg(test)]
mod tests;

pub use cache::MetadataCache;
