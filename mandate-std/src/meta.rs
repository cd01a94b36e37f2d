//! Process-wide type metadata cache.
//!
//! Maps a concrete type to its full and shortened names. Entries are computed
//! lazily on first use and never change afterwards, so the cache is safe to
//! read and populate from any number of concurrent dispatches.

use dashmap::DashMap;
use std::{
    any::{TypeId, type_name},
    fmt,
    sync::{Arc, OnceLock},
};

/// Names of one concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    short_name: Box<str>,
}

impl TypeInfo {
    fn of<T: ?Sized + 'static>() -> Self {
        let name = type_name::<T>();
        Self {
            id: TypeId::of::<T>(),
            name,
            short_name: shorten(name).into_boxed_str(),
        }
    }

    /// The type's identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified name, e.g. `my_app::orders::PlaceOrder`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name with module paths stripped, e.g. `PlaceOrder`.
    pub fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name)
    }
}

fn cache() -> &'static DashMap<TypeId, Arc<TypeInfo>> {
    static CACHE: OnceLock<DashMap<TypeId, Arc<TypeInfo>>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

/// Metadata for `T`, computed on first request.
pub fn type_info<T: ?Sized + 'static>() -> Arc<TypeInfo> {
    let id = TypeId::of::<T>();
    if let Some(hit) = cache().get(&id) {
        return Arc::clone(hit.value());
    }
    let entry = cache()
        .entry(id)
        .or_insert_with(|| Arc::new(TypeInfo::of::<T>()));
    Arc::clone(entry.value())
}

fn shorten(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut path = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            path.push(ch);
        } else {
            out.push_str(last_segment(&path));
            path.clear();
            out.push(ch);
        }
    }
    out.push_str(last_segment(&path));
    out
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
