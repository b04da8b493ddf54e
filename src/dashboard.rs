//! Local view state for the dashboard
//!
//! Each board holds the entities the user is looking at and keeps them in
//! step with the server. Boards fetch on construction. Create and delete are
//! pessimistic: the local list changes only once the server has answered.
//! Moving a chapter is optimistic: the local order changes first and is
//! restored from the server if the reorder request fails.

use std::fmt;

use crate::client::{ApiClient, AudioFile, ClientError};
use crate::model::{
    AdminResponse, Chapter, ChapterStatus, Course, CourseStatus, CreateAdminRequest,
    CreateChapterRequest, CreateCourseRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Swaps the chapter `id` with its neighbour and renumbers `order` to `1..N`
///
/// Returns `None` when `id` is unknown or already at the edge it would move past.
pub fn swap_adjacent(chapters: &[Chapter], id: &str, direction: Direction) -> Option<Vec<Chapter>> {
    let index = chapters.iter().position(|chapter| chapter.id == id)?;
    let target = match direction {
        Direction::Up => index.checked_sub(1)?,
        Direction::Down if index + 1 < chapters.len() => index + 1,
        Direction::Down => return None,
    };

    let mut reordered = chapters.to_vec();
    reordered.swap(index, target);
    for (position, chapter) in reordered.iter_mut().enumerate() {
        chapter.order = position as u32 + 1;
    }
    Some(reordered)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn course_status(status: CourseStatus) -> &'static str {
    match status {
        CourseStatus::Published => "Published",
        CourseStatus::Draft => "Draft",
        CourseStatus::Archived => "Archived",
    }
}

fn chapter_status(status: ChapterStatus) -> &'static str {
    match status {
        ChapterStatus::Complete => "Complete",
        ChapterStatus::InProgress => "In Progress",
        ChapterStatus::Pending => "Pending",
    }
}

/// All courses
pub struct CourseBoard {
    courses: Vec<Course>,
}

impl CourseBoard {
    pub async fn load(client: &ApiClient) -> Result<Self, ClientError> {
        Ok(Self {
            courses: client.list_courses().await?,
        })
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub async fn add(
        &mut self,
        client: &ApiClient,
        course: &CreateCourseRequest,
    ) -> Result<&Course, ClientError> {
        let created = client.create_course(course).await?;
        self.courses.push(created);
        Ok(&self.courses[self.courses.len() - 1])
    }

    pub async fn remove(&mut self, client: &ApiClient, id: &str) -> Result<(), ClientError> {
        client.delete_course(id).await?;
        self.courses.retain(|course| course.id != id);
        Ok(())
    }
}

impl fmt::Display for CourseBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.courses.is_empty() {
            return writeln!(f, "No courses yet.");
        }
        writeln!(
            f,
            "{:<36}  {:<28}  {:<20}  {:>8}  {:<9}",
            "ID", "TITLE", "LANGUAGE", "CHAPTERS", "STATUS"
        )?;
        for course in &self.courses {
            let language = if course.dialect.is_empty() {
                course.language.clone()
            } else {
                format!("{} ({})", course.language, course.dialect)
            };
            writeln!(
                f,
                "{:<36}  {:<28}  {:<20}  {:>8}  {:<9}",
                course.id,
                truncate(&course.title, 28),
                truncate(&language, 20),
                course.chapters_count,
                course_status(course.status)
            )?;
        }
        Ok(())
    }
}

/// Chapters of one course, kept sorted by `order`
pub struct ChapterBoard {
    course_id: String,
    chapters: Vec<Chapter>,
}

impl ChapterBoard {
    pub async fn load(client: &ApiClient, course_id: &str) -> Result<Self, ClientError> {
        let mut board = Self {
            course_id: course_id.to_string(),
            chapters: Vec::new(),
        };
        board.refresh(client).await?;
        Ok(board)
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn ids(&self) -> Vec<String> {
        self.chapters.iter().map(|chapter| chapter.id.clone()).collect()
    }

    pub async fn refresh(&mut self, client: &ApiClient) -> Result<(), ClientError> {
        self.chapters = client.list_chapters(&self.course_id).await?;
        Ok(())
    }

    /// Creates a chapter, uploading its audio in the same request when given
    pub async fn add(
        &mut self,
        client: &ApiClient,
        chapter: &CreateChapterRequest,
        audio: Option<AudioFile>,
    ) -> Result<&Chapter, ClientError> {
        let created = match audio {
            Some(audio) => {
                client
                    .create_chapter_with_audio(&self.course_id, chapter, audio)
                    .await?
            }
            None => client.create_chapter(&self.course_id, chapter).await?,
        };
        self.chapters.push(created);
        Ok(&self.chapters[self.chapters.len() - 1])
    }

    /// Deletes a chapter and closes the gap locally the way the server does
    pub async fn remove(&mut self, client: &ApiClient, id: &str) -> Result<(), ClientError> {
        client.delete_chapter(id).await?;
        self.chapters.retain(|chapter| chapter.id != id);
        for (position, chapter) in self.chapters.iter_mut().enumerate() {
            chapter.order = position as u32 + 1;
        }
        Ok(())
    }

    /// Moves a chapter one position up or down
    ///
    /// Returns `Ok(false)` when the move is not possible (first chapter up,
    /// last chapter down, unknown id). On a failed request the board is
    /// reloaded from the server and the request error is returned.
    pub async fn shift(
        &mut self,
        client: &ApiClient,
        id: &str,
        direction: Direction,
    ) -> Result<bool, ClientError> {
        let Some(reordered) = swap_adjacent(&self.chapters, id, direction) else {
            return Ok(false);
        };
        self.chapters = reordered;

        match client.reorder_chapters(&self.course_id, &self.ids()).await {
            Ok(_) => Ok(true),
            Err(err) => {
                tracing::warn!(course_id = %self.course_id, error = %err, "reorder failed, reloading chapters");
                if let Err(reload) = self.refresh(client).await {
                    tracing::error!(course_id = %self.course_id, error = %reload, "could not reload chapters");
                    self.chapters.clear();
                }
                Err(err)
            }
        }
    }
}

impl fmt::Display for ChapterBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.chapters.is_empty() {
            return writeln!(f, "No chapters yet.");
        }
        writeln!(
            f,
            "{:>5}  {:<36}  {:<28}  {:<5}  {:<11}",
            "ORDER", "ID", "NAME", "AUDIO", "STATUS"
        )?;
        for chapter in &self.chapters {
            writeln!(
                f,
                "{:>5}  {:<36}  {:<28}  {:<5}  {:<11}",
                chapter.order,
                chapter.id,
                truncate(&chapter.name, 28),
                if chapter.audio_file.is_some() { "yes" } else { "no" },
                chapter_status(chapter.status)
            )?;
        }
        Ok(())
    }
}

/// Admin accounts; passwords are never shown
pub struct AdminBoard {
    admins: Vec<AdminResponse>,
}

impl AdminBoard {
    pub async fn load(client: &ApiClient) -> Result<Self, ClientError> {
        let admins = client
            .list_admins()
            .await?
            .into_iter()
            .map(AdminResponse::from)
            .collect();
        Ok(Self { admins })
    }

    pub fn admins(&self) -> &[AdminResponse] {
        &self.admins
    }

    pub async fn add(
        &mut self,
        client: &ApiClient,
        admin: &CreateAdminRequest,
    ) -> Result<&AdminResponse, ClientError> {
        let created = client.create_admin(admin).await?;
        self.admins.push(created);
        Ok(&self.admins[self.admins.len() - 1])
    }
}

impl fmt::Display for AdminBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.admins.is_empty() {
            return writeln!(f, "No admins yet.");
        }
        writeln!(f, "{:<36}  {:<20}  {:<28}  {:<10}  {:<10}", "ID", "NAME", "EMAIL", "ROLE", "CREATED")?;
        for admin in &self.admins {
            writeln!(
                f,
                "{:<36}  {:<20}  {:<28}  {:<10}  {:<10}",
                admin.id,
                truncate(&admin.name, 20),
                truncate(&admin.email, 28),
                truncate(&admin.role, 10),
                admin.created_at
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapters(ids: &[&str]) -> Vec<Chapter> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Chapter {
                id: id.to_string(),
                course_id: "c1".into(),
                name: id.to_uppercase(),
                description: String::new(),
                content: String::new(),
                audio_file: None,
                order: i as u32 + 1,
                status: ChapterStatus::Pending,
            })
            .collect()
    }

    fn ids_and_orders(list: &[Chapter]) -> Vec<(&str, u32)> {
        list.iter().map(|c| (c.id.as_str(), c.order)).collect()
    }

    #[test]
    fn moving_up_swaps_with_previous() {
        let moved = swap_adjacent(&chapters(&["a", "b", "c"]), "c", Direction::Up).unwrap();
        assert_eq!(ids_and_orders(&moved), vec![("a", 1), ("c", 2), ("b", 3)]);
    }

    #[test]
    fn moving_down_swaps_with_next() {
        let moved = swap_adjacent(&chapters(&["a", "b", "c"]), "a", Direction::Down).unwrap();
        assert_eq!(ids_and_orders(&moved), vec![("b", 1), ("a", 2), ("c", 3)]);
    }

    #[test]
    fn edges_and_unknown_ids_do_not_move() {
        let list = chapters(&["a", "b"]);
        assert!(swap_adjacent(&list, "a", Direction::Up).is_none());
        assert!(swap_adjacent(&list, "b", Direction::Down).is_none());
        assert!(swap_adjacent(&list, "zzz", Direction::Up).is_none());
    }

    #[test]
    fn truncates_long_text() {
        assert_eq!(truncate("Greetings", 20), "Greetings");
        assert_eq!(truncate("Greetings and farewells", 10), "Greetings…");
    }
}
