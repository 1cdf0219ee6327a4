//! Image storage delegated to an external object store.

mod object_storage;
mod supabase;

pub use object_storage::ObjectStorage;
pub use supabase::SupabaseStorage;

#[cfg(test)]
pub use object_storage::MockObjectStorage;
