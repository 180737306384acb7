//! Hash map/set aliases using `rustc-hash`'s `FxHash`, matching the
//! teacher's `common::collections` convention — our IDs are small integers
//! supplied by the host, so we don't need DoS-resistant hashing.

pub type HashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;
pub type HashSet<T> = std::collections::HashSet<T, rustc_hash::FxBuildHasher>;
pub type BTreeMap<K, V> = std::collections::BTreeMap<K, V>;
