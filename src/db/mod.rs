mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User operations
    // ============================================================

    /// Insert a user. Returns `None` when the email is already registered.
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?",
            [email],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Ok(None);
        }

        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
            (id.to_string(), email, password_hash, Utc::now().to_rfc3339()),
        )?;

        Ok(Some(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        }))
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                "SELECT id, email, password_hash FROM users WHERE id = ?",
                [id.to_string()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                "SELECT id, email, password_hash FROM users WHERE email = ?",
                [email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    // ============================================================
    // Project operations
    // ============================================================

    /// Create a project and all of its sections in one transaction.
    ///
    /// Section content must already be generated; nothing is written if any
    /// insert fails.
    pub fn create_project(
        &self,
        owner_id: Uuid,
        input: &CreateProjectInput,
        sections: Vec<NewSection>,
    ) -> Result<ProjectWithSections> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        tx.execute(
            "INSERT INTO projects (id, owner_id, name, document_type, main_topic, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                owner_id.to_string(),
                &input.name,
                input.document_type.as_str(),
                &input.main_topic,
                now.to_rfc3339(),
            ),
        )?;

        let mut created = Vec::with_capacity(sections.len());
        for section in sections {
            let section_id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO sections (id, project_id, order_index, title, content, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    section_id.to_string(),
                    id.to_string(),
                    section.order_index,
                    &section.title,
                    &section.content,
                    now.to_rfc3339(),
                ),
            )?;

            created.push(Section {
                id: section_id,
                project_id: id,
                order_index: section.order_index,
                title: section.title,
                content: Some(section.content),
                likes: 0,
                dislikes: 0,
                comments: Vec::new(),
            });
        }

        tx.commit()?;

        // Match the read path's ordering
        created.sort_by_key(|s| s.order_index);

        Ok(ProjectWithSections {
            project: Project {
                id,
                owner_id,
                name: input.name.clone(),
                document_type: input.document_type,
                main_topic: input.main_topic.clone(),
                created_at: now,
            },
            sections: created,
        })
    }

    pub fn get_projects(&self, owner_id: Uuid) -> Result<Vec<ProjectWithSections>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, name, document_type, main_topic, created_at
             FROM projects WHERE owner_id = ? ORDER BY created_at, rowid",
        )?;

        let projects = stmt
            .query_map([owner_id.to_string()], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        projects
            .into_iter()
            .map(|project| {
                let sections = load_sections(&conn, project.id)?;
                Ok(ProjectWithSections { project, sections })
            })
            .collect()
    }

    pub fn get_project(&self, owner_id: Uuid, id: Uuid) -> Result<Option<ProjectWithSections>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let project = conn
            .query_row(
                "SELECT id, owner_id, name, document_type, main_topic, created_at
                 FROM projects WHERE id = ? AND owner_id = ?",
                [id.to_string(), owner_id.to_string()],
                project_from_row,
            )
            .optional()?;

        match project {
            Some(project) => {
                let sections = load_sections(&conn, project.id)?;
                Ok(Some(ProjectWithSections { project, sections }))
            }
            None => Ok(None),
        }
    }

    pub fn delete_project(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM projects WHERE id = ? AND owner_id = ?",
            [id.to_string(), owner_id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Section operations
    // ============================================================

    /// Load a section owned (through its project) by `owner_id`.
    pub fn get_section(&self, owner_id: Uuid, id: Uuid) -> Result<Option<SectionContext>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let found = conn
            .query_row(
                "SELECT s.id, s.project_id, s.order_index, s.title, s.content, s.likes, s.dislikes,
                        p.main_topic
                 FROM sections s JOIN projects p ON p.id = s.project_id
                 WHERE s.id = ? AND p.owner_id = ?",
                [id.to_string(), owner_id.to_string()],
                |row| Ok((section_from_row(row)?, row.get::<_, String>(7)?)),
            )
            .optional()?;

        match found {
            Some((mut section, main_topic)) => {
                section.comments = load_comments(&conn, section.id)?;
                Ok(Some(SectionContext {
                    section,
                    main_topic,
                }))
            }
            None => Ok(None),
        }
    }

    /// Record a refinement and make its output the section's current content.
    ///
    /// Both writes share one transaction so the latest refinement's
    /// `new_content` always matches the section.
    pub fn apply_refinement(
        &self,
        section_id: Uuid,
        prompt: &str,
        old_content: &str,
        new_content: &str,
    ) -> Result<Option<Section>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE sections SET content = ? WHERE id = ?",
            (new_content, section_id.to_string()),
        )?;
        if rows == 0 {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO refinements (id, section_id, prompt, old_content, new_content, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                section_id.to_string(),
                prompt,
                old_content,
                new_content,
                Utc::now().to_rfc3339(),
            ),
        )?;

        tx.commit()?;

        let mut section = conn.query_row(
            "SELECT id, project_id, order_index, title, content, likes, dislikes
             FROM sections WHERE id = ?",
            [section_id.to_string()],
            section_from_row,
        )?;
        section.comments = load_comments(&conn, section_id)?;

        Ok(Some(section))
    }

    pub fn get_refinements(&self, section_id: Uuid) -> Result<Vec<Refinement>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, section_id, prompt, old_content, new_content, created_at
             FROM refinements WHERE section_id = ? ORDER BY created_at, rowid",
        )?;

        let refinements = stmt
            .query_map([section_id.to_string()], |row| {
                Ok(Refinement {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    section_id: parse_uuid(row.get::<_, String>(1)?),
                    prompt: row.get(2)?,
                    old_content: row.get(3)?,
                    new_content: row.get(4)?,
                    created_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(refinements)
    }

    // ============================================================
    // Feedback operations
    // ============================================================

    pub fn record_feedback(&self, section_id: Uuid, is_like: bool) -> Result<FeedbackResult> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO feedbacks (id, section_id, is_like, created_at) VALUES (?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                section_id.to_string(),
                if is_like { 1 } else { 0 },
                Utc::now().to_rfc3339(),
            ),
        )?;

        let counter = if is_like {
            "UPDATE sections SET likes = likes + 1 WHERE id = ?"
        } else {
            "UPDATE sections SET dislikes = dislikes + 1 WHERE id = ?"
        };
        tx.execute(counter, [section_id.to_string()])?;

        let (likes, dislikes): (i64, i64) = tx.query_row(
            "SELECT likes, dislikes FROM sections WHERE id = ?",
            [section_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        tx.commit()?;

        Ok(FeedbackResult {
            ok: true,
            likes,
            dislikes,
        })
    }

    pub fn get_feedback(&self, section_id: Uuid) -> Result<Vec<Feedback>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, section_id, is_like, created_at
             FROM feedbacks WHERE section_id = ? ORDER BY created_at, rowid",
        )?;

        let feedback = stmt
            .query_map([section_id.to_string()], |row| {
                Ok(Feedback {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    section_id: parse_uuid(row.get::<_, String>(1)?),
                    is_like: row.get::<_, i32>(2)? != 0,
                    created_at: parse_datetime(row.get::<_, String>(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(feedback)
    }

    // ============================================================
    // Comment operations
    // ============================================================

    pub fn add_comment(&self, section_id: Uuid, text: &str) -> Result<Comment> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO comments (id, section_id, text, created_at) VALUES (?, ?, ?, ?)",
            (id.to_string(), section_id.to_string(), text, now.to_rfc3339()),
        )?;

        Ok(Comment {
            id,
            section_id,
            text: text.to_string(),
            created_at: now,
        })
    }

    pub fn get_comments(&self, section_id: Uuid) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        load_comments(&conn, section_id)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// Platform data directory location used when no path is configured.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "docforge")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("docforge.db"))
}

fn load_sections(conn: &Connection, project_id: Uuid) -> Result<Vec<Section>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, order_index, title, content, likes, dislikes
         FROM sections WHERE project_id = ? ORDER BY order_index, rowid",
    )?;

    let mut sections = stmt
        .query_map([project_id.to_string()], section_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for section in &mut sections {
        section.comments = load_comments(conn, section.id)?;
    }

    Ok(sections)
}

fn load_comments(conn: &Connection, section_id: Uuid) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT id, section_id, text, created_at
         FROM comments WHERE section_id = ? ORDER BY created_at, rowid",
    )?;

    let comments = stmt
        .query_map([section_id.to_string()], |row| {
            Ok(Comment {
                id: parse_uuid(row.get::<_, String>(0)?),
                section_id: parse_uuid(row.get::<_, String>(1)?),
                text: row.get(2)?,
                created_at: parse_datetime(row.get::<_, String>(3)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(comments)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(row.get::<_, String>(0)?),
        email: row.get(1)?,
        password_hash: row.get(2)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        owner_id: parse_uuid(row.get::<_, String>(1)?),
        name: row.get(2)?,
        document_type: DocumentType::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(DocumentType::Docx),
        main_topic: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

/// Expects columns `id, project_id, order_index, title, content, likes, dislikes`
/// in that order. Comments are loaded separately.
fn section_from_row(row: &Row<'_>) -> rusqlite::Result<Section> {
    Ok(Section {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        order_index: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        likes: row.get(5)?,
        dislikes: row.get(6)?,
        comments: Vec::new(),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
