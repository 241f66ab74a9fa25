//! Exercise catalog registration
//!
//! The registry is the catalog boundary: exercise sets distributed by
//! the definition service are validated and stored here before any
//! environment is built from them. Registration is fail-fast like the
//! rest of the crate; a bad tag mid-set leaves the earlier entries
//! registered.

use crate::error::{Error, Result};
use crate::spec::{Category, ExerciseSpec};
use crate::tag::Tag;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info};

/// Observer notified synchronously after each registration.
///
/// Listeners are attached at construction and run in attachment order;
/// the first failing listener aborts the remaining notifications and
/// its error is surfaced to the registering caller. The registration
/// itself is not undone.
pub trait RegistryListener: Send + Sync {
    fn exercise_registered(&self, spec: &ExerciseSpec) -> Result<()>;
}

/// A registered exercise with its registration metadata.
#[derive(Clone, Debug)]
pub struct RegisteredExercise {
    pub spec: ExerciseSpec,
    pub registered_at: DateTime<Utc>,
}

/// In-memory exercise catalog, iteration in registration order.
pub struct ExerciseRegistry {
    exercises: RwLock<IndexMap<Tag, RegisteredExercise>>,
    categories: RwLock<IndexMap<Tag, String>>,
    listeners: Vec<Box<dyn RegistryListener>>,
}

impl ExerciseRegistry {
    pub fn new() -> Self {
        Self {
            exercises: RwLock::new(IndexMap::new()),
            categories: RwLock::new(IndexMap::new()),
            listeners: Vec::new(),
        }
    }

    /// Attach a listener. Must happen before the registry is shared.
    pub fn with_listener(mut self, listener: Box<dyn RegistryListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Register a set of exercises.
    ///
    /// Fails with [`Error::MissingTags`] on an empty set,
    /// [`Error::UnknownTag`] on a malformed tag and
    /// [`Error::DuplicateTag`] on a tag already present.
    pub fn register<I>(&self, specs: I) -> Result<()>
    where
        I: IntoIterator<Item = ExerciseSpec>,
    {
        let specs: Vec<ExerciseSpec> = specs.into_iter().collect();
        if specs.is_empty() {
            return Err(Error::MissingTags);
        }

        for spec in specs {
            let tag = Tag::new(spec.tag.as_str())?;
            {
                let mut exercises = self.exercises.write();
                if exercises.contains_key(&tag) {
                    return Err(Error::DuplicateTag(tag));
                }
                exercises.insert(
                    tag.clone(),
                    RegisteredExercise {
                        spec: spec.clone(),
                        registered_at: Utc::now(),
                    },
                );
            }

            for listener in &self.listeners {
                listener.exercise_registered(&spec)?;
            }

            debug!(%tag, "exercise registered");
        }

        info!(total = self.count(), "exercise catalog updated");
        Ok(())
    }

    /// Register the companion category listing.
    pub fn register_categories<I>(&self, categories: I) -> Result<()>
    where
        I: IntoIterator<Item = Category>,
    {
        for category in categories {
            let tag = Tag::new(category.tag.as_str())?;
            let mut listing = self.categories.write();
            if listing.contains_key(&tag) {
                return Err(Error::DuplicateTag(tag));
            }
            listing.insert(tag, category.name);
        }
        Ok(())
    }

    /// Look up one exercise by tag.
    pub fn get(&self, tag: &str) -> Result<ExerciseSpec> {
        let wanted = Tag::new(tag)?;
        self.exercises
            .read()
            .get(&wanted)
            .map(|entry| entry.spec.clone())
            .ok_or_else(|| Error::UnknownTag(tag.to_string()))
    }

    /// Resolve a selection of tags into specs, in the order given.
    pub fn get_by_tags(&self, tags: &[Tag]) -> Result<Vec<ExerciseSpec>> {
        let exercises = self.exercises.read();
        tags.iter()
            .map(|tag| {
                exercises
                    .get(tag)
                    .map(|entry| entry.spec.clone())
                    .ok_or_else(|| Error::UnknownTag(tag.to_string()))
            })
            .collect()
    }

    /// All registered exercises, in registration order.
    pub fn list(&self) -> Vec<ExerciseSpec> {
        self.exercises
            .read()
            .values()
            .map(|entry| entry.spec.clone())
            .collect()
    }

    /// Display name for a category tag.
    pub fn category_name(&self, tag: &Tag) -> Option<String> {
        self.categories.read().get(tag).cloned()
    }

    pub fn count(&self) -> usize {
        self.exercises.read().len()
    }
}

impl Default for ExerciseRegistry {
    fn default() -> Self {
        Self::new()
    }
}
