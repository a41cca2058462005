//! Common test utilities for integration tests.
//!
//! A small electronic-music genre hierarchy with multi-parent tags and
//! aliases, loaded into an in-memory or on-disk database.

#![allow(dead_code)]

use std::path::Path;

use tagtree_core::{StoreConfig, Tag, TagDatabase};

pub const BINDINGS: [&str; 2] = ["genre", "style"];

/// Sample tags in dependency order (parents before children).
pub fn sample_tags() -> Vec<Tag> {
    vec![
        Tag::top_level("Ambient").with_bindings(BINDINGS),
        Tag::top_level("Electronic").with_bindings(BINDINGS),
        Tag::top_level("Industrial & Noise").with_bindings(BINDINGS),
        Tag::child_of("Post-Industrial", ["Industrial & Noise"]).with_bindings(BINDINGS),
        Tag::child_of("Dark Ambient", ["Ambient", "Post-Industrial"])
            .with_bindings(BINDINGS)
            .with_aliases(["Ambient Industrial"]),
        Tag::child_of("Ritual Ambient", ["Dark Ambient"])
            .with_bindings(BINDINGS)
            .with_aliases(["Ritual Dark Ambient", "Dark Ritual Ambient"]),
        Tag::child_of("Space Ambient", ["Ambient", "Electronic"]).with_bindings(BINDINGS),
        Tag::child_of("Tribal Ambient", ["Ambient"])
            .with_bindings(BINDINGS)
            .with_aliases(["Ethnic Ambient", "Ethno Ambient"]),
    ]
}

/// Names of the sample tags, in insertion order.
pub fn sample_names() -> Vec<String> {
    sample_tags().into_iter().map(|t| t.name).collect()
}

pub fn sample_database() -> TagDatabase {
    let mut db = TagDatabase::new(StoreConfig::default());
    db.create(":memory:", false, None)
        .expect("Failed to create in-memory database");
    db.write_tags(sample_tags())
        .expect("Failed to write sample tags");
    db
}

pub fn sample_database_at(path: &Path) -> TagDatabase {
    let mut db = TagDatabase::new(StoreConfig::default());
    db.create(path, true, None)
        .expect("Failed to create database file");
    db.write_tags(sample_tags())
        .expect("Failed to write sample tags");
    db
}

/// Sorted tag names, for order-independent comparison.
pub fn names<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> Vec<String> {
    let mut names: Vec<String> = tags.into_iter().map(|t| t.name.clone()).collect();
    names.sort();
    names
}

/// The sample hierarchy as an exported template.
pub const SAMPLE_TEMPLATE: &str = "\
Ambient
    Ambient::genre
    Ambient::style
    Dark Ambient
        Dark Ambient::genre
        Dark Ambient::style
        Ritual Ambient::genre
        Ritual Ambient::style
    Space Ambient::genre
    Space Ambient::style
    Tribal Ambient::genre
    Tribal Ambient::style
Electronic
    Electronic::genre
    Electronic::style
    Space Ambient::genre
    Space Ambient::style
Industrial & Noise
    Industrial & Noise::genre
    Industrial & Noise::style
    Post-Industrial
        Post-Industrial::genre
        Post-Industrial::style
        Dark Ambient
            Dark Ambient::genre
            Dark Ambient::style
            Ritual Ambient::genre
            Ritual Ambient::style
";
