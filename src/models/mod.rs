use uuid::Uuid;

pub mod product;
pub mod promotion;
pub mod combined;
pub mod item;

// Re-exports for convenience
pub use product::*;
pub use promotion::*;
pub use combined::*;
pub use item::*;

// Helper function to generate UUIDs in the format expected by the data source
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Deterministic id for derived records: the same key always yields the same id.
pub fn stable_id(key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
        .simple()
        .to_string()
}
