//! Terminal dashboard for the course administration API
//!
//! # Usage
//!
//! ```bash
//! # List courses
//! dashboard courses list
//!
//! # Create a course
//! dashboard courses add -t "Spanish for Beginners" -l Spanish -d "Latin American"
//!
//! # Add a chapter with an audio file, then move it up one position
//! dashboard chapters add <course-id> -n Greetings --audio hola.mp3
//! dashboard chapters up <course-id> <chapter-id>
//!
//! # Create an admin
//! dashboard admins add -n A -e a@x.com -p secret -r editor
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use course_admin::client::{ApiClient, AudioFile};
use course_admin::dashboard::{AdminBoard, ChapterBoard, CourseBoard, Direction};
use course_admin::model::{CreateAdminRequest, CreateChapterRequest, CreateCourseRequest};

#[derive(Parser)]
#[command(name = "dashboard")]
#[command(author, version, about = "Manage courses, chapters and admins")]
struct Cli {
    /// Base URL of the course-admin server
    #[arg(long, env = "DASHBOARD_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage courses
    Courses {
        #[command(subcommand)]
        action: CourseAction,
    },
    /// Manage the chapters of a course
    Chapters {
        #[command(subcommand)]
        action: ChapterAction,
    },
    /// Manage admin accounts
    Admins {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Remove chapters whose course no longer exists
    Sweep,
}

#[derive(Subcommand)]
enum CourseAction {
    /// List all courses
    List,
    /// Create a course
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        language: String,
        #[arg(short, long, default_value = "")]
        dialect: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete a course and all of its chapters
    Delete { id: String },
}

#[derive(Subcommand)]
enum ChapterAction {
    /// List the chapters of a course in order
    List { course_id: String },
    /// Append a chapter, optionally uploading an audio file
    Add {
        course_id: String,
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Read the chapter content from this file
        #[arg(long)]
        content_file: Option<PathBuf>,
        /// Audio file to upload
        #[arg(long)]
        audio: Option<PathBuf>,
    },
    /// Delete a chapter
    Delete { course_id: String, chapter_id: String },
    /// Move a chapter one position up
    Up { course_id: String, chapter_id: String },
    /// Move a chapter one position down
    Down { course_id: String, chapter_id: String },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List admin accounts
    List,
    /// Create an admin account
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long, default_value = "editor")]
        role: String,
    },
}

fn audio_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

async fn read_audio(path: &Path) -> anyhow::Result<AudioFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    Ok(AudioFile {
        file_name,
        content_type: audio_content_type(path).to_string(),
        bytes,
    })
}

async fn shift(client: &ApiClient, course_id: &str, chapter_id: &str, direction: Direction) -> anyhow::Result<()> {
    let mut board = ChapterBoard::load(client, course_id).await?;
    match board.shift(client, chapter_id, direction).await {
        Ok(true) => println!("Chapter order updated"),
        Ok(false) => println!("Chapter is already at the edge, nothing to move"),
        Err(err) => {
            print!("{}", board);
            return Err(err).context("failed to reorder chapters");
        }
    }
    print!("{}", board);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = ApiClient::new(cli.api_url);

    match cli.command {
        Commands::Courses { action } => match action {
            CourseAction::List => print!("{}", CourseBoard::load(&client).await?),
            CourseAction::Add {
                title,
                language,
                dialect,
                description,
            } => {
                let mut board = CourseBoard::load(&client).await?;
                let request = CreateCourseRequest {
                    title,
                    description,
                    language,
                    dialect,
                    status: None,
                };
                let created = board.add(&client, &request).await?;
                println!("Course created: {}", created.id);
                print!("{}", board);
            }
            CourseAction::Delete { id } => {
                let mut board = CourseBoard::load(&client).await?;
                board.remove(&client, &id).await?;
                println!("Course and its chapters deleted");
                print!("{}", board);
            }
        },
        Commands::Chapters { action } => match action {
            ChapterAction::List { course_id } => {
                let course = client.get_course(&course_id).await?;
                println!("{} - {} ({})", course.title, course.language, course.dialect);
                print!("{}", ChapterBoard::load(&client, &course_id).await?);
            }
            ChapterAction::Add {
                course_id,
                name,
                description,
                content_file,
                audio,
            } => {
                let content = match content_file {
                    Some(path) => tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("failed to read {}", path.display()))?,
                    None => String::new(),
                };
                let audio = match audio {
                    Some(path) => Some(read_audio(&path).await?),
                    None => None,
                };

                let mut board = ChapterBoard::load(&client, &course_id).await?;
                let request = CreateChapterRequest {
                    name,
                    description,
                    content,
                    audio_file: None,
                };
                let created = board.add(&client, &request, audio).await?;
                println!("Chapter created: {} (order {})", created.id, created.order);
                print!("{}", board);
            }
            ChapterAction::Delete {
                course_id,
                chapter_id,
            } => {
                let mut board = ChapterBoard::load(&client, &course_id).await?;
                board.remove(&client, &chapter_id).await?;
                println!("Chapter deleted");
                print!("{}", board);
            }
            ChapterAction::Up {
                course_id,
                chapter_id,
            } => shift(&client, &course_id, &chapter_id, Direction::Up).await?,
            ChapterAction::Down {
                course_id,
                chapter_id,
            } => shift(&client, &course_id, &chapter_id, Direction::Down).await?,
        },
        Commands::Admins { action } => match action {
            AdminAction::List => print!("{}", AdminBoard::load(&client).await?),
            AdminAction::Add {
                name,
                email,
                password,
                role,
            } => {
                let mut board = AdminBoard::load(&client).await?;
                let request = CreateAdminRequest {
                    name,
                    email,
                    password,
                    role,
                };
                let created = board.add(&client, &request).await?;
                println!("Admin created: {}", created.id);
                print!("{}", board);
            }
        },
        Commands::Sweep => {
            let report = client.sweep_orphans().await?;
            println!(
                "Removed {} orphan chapters and {} dangling index entries",
                report.orphan_chapters, report.dangling_index_entries
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
