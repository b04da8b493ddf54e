//! Database initialization, table definitions and the persistence client
//!
//! This module owns the embedded redb database. Documents are stored as JSON
//! strings keyed by their application-generated id, the same layout for every
//! collection. [`Store`] is the only way handlers touch the database: it is
//! built once at startup, cloned into [`AppState`] and closed on shutdown.
//!
//! Every operation that writes more than one document runs inside a single
//! write transaction, so a cascade delete or a reorder either fully commits or
//! leaves the database untouched.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, Table, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::model::{Admin, Chapter, Course, SweepReport, UpdateChapterRequest, UpdateCourseRequest};
use crate::upload::ObjectStore;

/// Admin accounts
///
/// Key: admin id (UUID string)
/// Value: JSON-serialized [`Admin`]
pub const TABLE_ADMINS: TableDefinition<&str, &str> = TableDefinition::new("admins_v1");

/// Courses
///
/// Key: course id (UUID string)
/// Value: JSON-serialized [`Course`]
pub const TABLE_COURSES: TableDefinition<&str, &str> = TableDefinition::new("courses_v1");

/// Chapters of every course
///
/// Key: chapter id (UUID string)
/// Value: JSON-serialized [`Chapter`]
pub const TABLE_CHAPTERS: TableDefinition<&str, &str> = TableDefinition::new("chapters_v1");

/// Index table for listing the chapters of one course
///
/// Key: Composite key in format "{course_id}:{chapter_id}"
/// Value: empty string
///
/// A range query from "{course_id}:" to "{course_id}:{" returns every chapter
/// of the course without scanning the chapters table.
pub const TABLE_COURSE_CHAPTERS: TableDefinition<&str, &str> =
    TableDefinition::new("course_chapters_v1");

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Persistence client
    pub store: Store,

    /// Object storage used for chapter audio uploads
    pub uploads: Arc<dyn ObjectStore>,

    /// Largest accepted multipart upload body, in bytes
    pub max_upload_bytes: usize,
}

/// Errors raised by the persistence client
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    #[error("corrupt document: {0}")]
    Codec(#[from] serde_json::Error),
}

macro_rules! impl_from_redb {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for StoreError {
                fn from(err: $err) -> Self {
                    StoreError::Database(err.into())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Outcome of a reorder request
#[derive(Debug, Clone, PartialEq)]
pub enum ReorderOutcome {
    /// Orders were rewritten; chapters are returned in their new order
    Applied(Vec<Chapter>),
    /// The course does not exist
    CourseNotFound,
    /// The given ids are not an exact permutation of the course's chapters
    Mismatch { expected: usize, received: usize },
}

/// Initializes the embedded database and creates required tables
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "data.db")
///
/// # Example
///
/// ```no_run
/// # use course_admin::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_ADMINS)?;
        write_txn.open_table(TABLE_COURSES)?;
        write_txn.open_table(TABLE_CHAPTERS)?;
        write_txn.open_table(TABLE_COURSE_CHAPTERS)?;
    }
    write_txn.commit()?;

    Ok(db)
}

fn load<T, R>(table: &R, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    match table.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}

fn load_all<T, R>(table: &R) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    let mut docs = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        docs.push(serde_json::from_str(value.value())?);
    }
    Ok(docs)
}

fn save<T: Serialize>(
    table: &mut Table<'_, &'static str, &'static str>,
    key: &str,
    doc: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(doc)?;
    table.insert(key, json.as_str())?;
    Ok(())
}

fn index_key(course_id: &str, chapter_id: &str) -> String {
    format!("{}:{}", course_id, chapter_id)
}

/// Ids of every chapter indexed under `course_id`, in key order
fn chapter_ids_of<R>(index: &R, course_id: &str) -> Result<Vec<String>, StoreError>
where
    R: ReadableTable<&'static str, &'static str>,
{
    // '{' sorts right after ':' so this bounds exactly the "{course_id}:" prefix
    let start_key = format!("{}:", course_id);
    let end_key = format!("{}:{{", course_id);

    let mut ids = Vec::new();
    for entry in index.range(start_key.as_str()..end_key.as_str())? {
        let (key, _) = entry?;
        if let Some((_, chapter_id)) = key.value().split_once(':') {
            ids.push(chapter_id.to_string());
        }
    }
    Ok(ids)
}

/// Loads a course's chapters sorted by `order`
fn chapters_of<C, I>(chapters: &C, index: &I, course_id: &str) -> Result<Vec<Chapter>, StoreError>
where
    C: ReadableTable<&'static str, &'static str>,
    I: ReadableTable<&'static str, &'static str>,
{
    let mut list = Vec::new();
    for id in chapter_ids_of(index, course_id)? {
        if let Some(chapter) = load::<Chapter, _>(chapters, &id)? {
            list.push(chapter);
        }
    }
    list.sort_by_key(|chapter| chapter.order);
    Ok(list)
}

/// Renumbers a course's chapters to `1..N` and rewrites its `chaptersCount`
///
/// Returns the number of chapters left. A missing course only skips the count.
fn compact_course(
    chapters: &mut Table<'_, &'static str, &'static str>,
    index: &Table<'_, &'static str, &'static str>,
    courses: &mut Table<'_, &'static str, &'static str>,
    course_id: &str,
) -> Result<usize, StoreError> {
    let remaining = chapters_of(&*chapters, index, course_id)?;
    for (position, mut sibling) in remaining.iter().cloned().enumerate() {
        let order = position as u32 + 1;
        if sibling.order != order {
            sibling.order = order;
            save(chapters, &sibling.id, &sibling)?;
        }
    }

    if let Some(mut course) = load::<Course, _>(&*courses, course_id)? {
        course.chapters_count = remaining.len() as u32;
        save(courses, &course.id, &course)?;
    }
    Ok(remaining.len())
}

/// Persistence client over the embedded database
///
/// Cheap to clone; all clones share one [`Database`].
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Opens (or creates) the database file and its tables
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        let db = init_db(db_path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Releases this handle only
    ///
    /// Other clones keep the database open; the file is closed when the
    /// last one is dropped. Stop every task holding a clone before calling
    /// this on shutdown.
    pub fn close(self) {
        let remaining = Arc::strong_count(&self.db) - 1;
        tracing::debug!(remaining, "closing store handle");
    }

    // ---------------------------------------------------------------- admins

    pub fn list_admins(&self) -> Result<Vec<Admin>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_ADMINS)?;
        load_all(&table)
    }

    pub fn insert_admin(&self, admin: &Admin) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_ADMINS)?;
            save(&mut table, &admin.id, admin)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // --------------------------------------------------------------- courses

    pub fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_COURSES)?;
        load_all(&table)
    }

    pub fn get_course(&self, id: &str) -> Result<Option<Course>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_COURSES)?;
        load(&table, id)
    }

    pub fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_COURSES)?;
            save(&mut table, &course.id, course)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Applies a partial update; `None` when the course does not exist
    pub fn update_course(
        &self,
        id: &str,
        update: UpdateCourseRequest,
    ) -> Result<Option<Course>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(TABLE_COURSES)?;
            match load::<Course, _>(&table, id)? {
                Some(mut course) => {
                    update.apply(&mut course);
                    save(&mut table, id, &course)?;
                    Some(course)
                }
                None => None,
            }
        };

        if updated.is_some() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(updated)
    }

    /// Deletes a course and cascades to all of its chapters
    ///
    /// Returns the number of chapters removed, or `None` when the course does
    /// not exist. Both steps share one write transaction.
    pub fn delete_course(&self, id: &str) -> Result<Option<usize>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut courses = write_txn.open_table(TABLE_COURSES)?;
            // Nothing to cascade when the course is already gone
            if courses.remove(id)?.is_none() {
                None
            } else {
                let mut chapters = write_txn.open_table(TABLE_CHAPTERS)?;
                let mut index = write_txn.open_table(TABLE_COURSE_CHAPTERS)?;

                // Cascade to every chapter indexed under the course
                let chapter_ids = chapter_ids_of(&index, id)?;
                for chapter_id in &chapter_ids {
                    chapters.remove(chapter_id.as_str())?;
                    index.remove(index_key(id, chapter_id).as_str())?;
                }
                Some(chapter_ids.len())
            }
        };

        match removed {
            Some(_) => write_txn.commit()?,
            None => write_txn.abort()?,
        }
        Ok(removed)
    }

    // -------------------------------------------------------------- chapters

    /// Chapters of a course sorted by `order`; `None` when the course does not exist
    pub fn list_chapters(&self, course_id: &str) -> Result<Option<Vec<Chapter>>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let courses = read_txn.open_table(TABLE_COURSES)?;
        if courses.get(course_id)?.is_none() {
            return Ok(None);
        }

        let chapters = read_txn.open_table(TABLE_CHAPTERS)?;
        let index = read_txn.open_table(TABLE_COURSE_CHAPTERS)?;
        Ok(Some(chapters_of(&chapters, &index, course_id)?))
    }

    pub fn get_chapter(&self, id: &str) -> Result<Option<Chapter>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_CHAPTERS)?;
        load(&table, id)
    }

    /// Appends a chapter to its course
    ///
    /// The chapter's `order` is overwritten with `count + 1` and the course's
    /// `chaptersCount` is bumped in the same transaction. Returns `None`
    /// without writing anything when `chapter.course_id` does not exist.
    pub fn insert_chapter(&self, mut chapter: Chapter) -> Result<Option<Chapter>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut courses = write_txn.open_table(TABLE_COURSES)?;
            match load::<Course, _>(&courses, &chapter.course_id)? {
                Some(mut course) => {
                    let mut chapters = write_txn.open_table(TABLE_CHAPTERS)?;
                    let mut index = write_txn.open_table(TABLE_COURSE_CHAPTERS)?;

                    // Append after the current last position
                    let count = chapter_ids_of(&index, &course.id)?.len() as u32;
                    chapter.order = count + 1;

                    // Store the document and index it under its course
                    save(&mut chapters, &chapter.id, &chapter)?;
                    index.insert(index_key(&course.id, &chapter.id).as_str(), "")?;

                    // Keep the cached count in step
                    course.chapters_count = count + 1;
                    save(&mut courses, &course.id, &course)?;
                    Some(chapter)
                }
                None => None,
            }
        };

        if inserted.is_some() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(inserted)
    }

    pub fn update_chapter(
        &self,
        id: &str,
        update: UpdateChapterRequest,
    ) -> Result<Option<Chapter>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(TABLE_CHAPTERS)?;
            match load::<Chapter, _>(&table, id)? {
                Some(mut chapter) => {
                    update.apply(&mut chapter);
                    save(&mut table, id, &chapter)?;
                    Some(chapter)
                }
                None => None,
            }
        };

        if updated.is_some() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(updated)
    }

    /// Deletes one chapter and renumbers the rest of its course to `1..N`
    pub fn delete_chapter(&self, id: &str) -> Result<Option<Chapter>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut chapters = write_txn.open_table(TABLE_CHAPTERS)?;
            match load::<Chapter, _>(&chapters, id)? {
                Some(chapter) => {
                    let mut index = write_txn.open_table(TABLE_COURSE_CHAPTERS)?;
                    let mut courses = write_txn.open_table(TABLE_COURSES)?;

                    // Drop the document and its index entry
                    chapters.remove(id)?;
                    index.remove(index_key(&chapter.course_id, id).as_str())?;

                    // Close the gap and refresh the course's count
                    compact_course(&mut chapters, &index, &mut courses, &chapter.course_id)?;
                    Some(chapter)
                }
                None => None,
            }
        };

        if removed.is_some() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(removed)
    }

    /// Sets each chapter's `order` to its 1-based position in `chapter_ids`
    ///
    /// The ids must be an exact permutation of the course's chapters: no
    /// missing, extra, unknown or repeated ids. Anything else is reported as
    /// [`ReorderOutcome::Mismatch`] and nothing is written.
    pub fn reorder_chapters(
        &self,
        course_id: &str,
        chapter_ids: &[String],
    ) -> Result<ReorderOutcome, StoreError> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let courses = write_txn.open_table(TABLE_COURSES)?;
            if courses.get(course_id)?.is_none() {
                ReorderOutcome::CourseNotFound
            } else {
                let mut chapters = write_txn.open_table(TABLE_CHAPTERS)?;
                let index = write_txn.open_table(TABLE_COURSE_CHAPTERS)?;

                // The request must name every chapter of the course exactly once
                let existing: HashSet<String> = chapter_ids_of(&index, course_id)?.into_iter().collect();
                let requested: HashSet<&String> = chapter_ids.iter().collect();
                let is_permutation = requested.len() == chapter_ids.len()
                    && chapter_ids.len() == existing.len()
                    && chapter_ids.iter().all(|id| existing.contains(id));

                if !is_permutation {
                    ReorderOutcome::Mismatch {
                        expected: existing.len(),
                        received: chapter_ids.len(),
                    }
                } else {
                    // Positions are 1-based in request order
                    let mut reordered = Vec::with_capacity(chapter_ids.len());
                    for (position, id) in chapter_ids.iter().enumerate() {
                        if let Some(mut chapter) = load::<Chapter, _>(&chapters, id)? {
                            chapter.order = position as u32 + 1;
                            save(&mut chapters, id, &chapter)?;
                            reordered.push(chapter);
                        }
                    }
                    ReorderOutcome::Applied(reordered)
                }
            }
        };

        match outcome {
            ReorderOutcome::Applied(_) => write_txn.commit()?,
            _ => write_txn.abort()?,
        }
        Ok(outcome)
    }

    // ----------------------------------------------------------- maintenance

    /// Removes chapters whose course is gone and index entries whose chapter is gone
    pub fn sweep_orphans(&self) -> Result<SweepReport, StoreError> {
        let write_txn = self.db.begin_write()?;
        let report = {
            let mut courses = write_txn.open_table(TABLE_COURSES)?;
            let mut chapters = write_txn.open_table(TABLE_CHAPTERS)?;
            let mut index = write_txn.open_table(TABLE_COURSE_CHAPTERS)?;

            let mut course_ids = HashSet::new();
            for entry in courses.iter()? {
                let (key, _) = entry?;
                course_ids.insert(key.value().to_string());
            }

            let orphans: Vec<Chapter> = load_all::<Chapter, _>(&chapters)?
                .into_iter()
                .filter(|chapter| !course_ids.contains(&chapter.course_id))
                .collect();
            for chapter in &orphans {
                chapters.remove(chapter.id.as_str())?;
                index.remove(index_key(&chapter.course_id, &chapter.id).as_str())?;
            }

            // Index entries pointing at chapters that no longer exist
            let mut dangling = Vec::new();
            for entry in index.iter()? {
                let (key, _) = entry?;
                let key = key.value();
                let chapter_id = key.split_once(':').map(|(_, id)| id).unwrap_or(key);
                if chapters.get(chapter_id)?.is_none() {
                    dangling.push(key.to_string());
                }
            }

            let mut touched = BTreeSet::new();
            for key in &dangling {
                index.remove(key.as_str())?;
                if let Some((course_id, _)) = key.split_once(':') {
                    if course_ids.contains(course_id) {
                        touched.insert(course_id.to_string());
                    }
                }
            }

            // Surviving chapters of those courses get contiguous orders again
            for course_id in &touched {
                compact_course(&mut chapters, &index, &mut courses, course_id)?;
            }

            SweepReport {
                orphan_chapters: orphans.len(),
                dangling_index_entries: dangling.len(),
            }
        };

        write_txn.commit()?;
        Ok(report)
    }
}
