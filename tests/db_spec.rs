use docforge::db::Database;
use docforge::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn create_test_user(db: &Database, email: &str) -> User {
    db.create_user(email, "salt$hash")
        .expect("Failed to create user")
        .expect("Email already taken")
}

fn create_test_project(db: &Database, owner: &User, titles: &[(i64, &str)]) -> ProjectWithSections {
    let input = CreateProjectInput {
        name: "Test Project".to_string(),
        document_type: DocumentType::Pptx,
        main_topic: "Ocean Currents".to_string(),
        sections: Vec::new(),
    };
    let sections = titles
        .iter()
        .map(|(order_index, title)| NewSection {
            order_index: *order_index,
            title: title.to_string(),
            content: format!("Draft of {}", title),
        })
        .collect();

    db.create_project(owner.id, &input, sections)
        .expect("Failed to create project")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let owner = create_test_user(&db, "owner@example.com");
    }

    describe "users" {
        it "finds a user by email" {
            let found = db.get_user_by_email("owner@example.com").expect("Query failed");
            assert_eq!(found.map(|u| u.id), Some(owner.id));
        }

        it "refuses a duplicate email" {
            let second = db.create_user("owner@example.com", "other$hash").expect("Query failed");
            assert!(second.is_none());
        }

        it "returns None for an unknown id" {
            assert!(db.get_user(Uuid::new_v4()).expect("Query failed").is_none());
        }
    }

    describe "projects" {
        describe "create_project" {
            it "stores the project with its sections" {
                let project = create_test_project(&db, &owner, &[(1, "Gulf Stream")]);

                assert_eq!(project.project.owner_id, owner.id);
                assert_eq!(project.project.document_type, DocumentType::Pptx);
                assert_eq!(project.sections.len(), 1);
                assert_eq!(project.sections[0].content.as_deref(), Some("Draft of Gulf Stream"));
            }

            it "allows a project without sections" {
                let project = create_test_project(&db, &owner, &[]);
                assert!(project.sections.is_empty());
            }
        }

        describe "get_project" {
            it "orders sections by order_index" {
                let created = create_test_project(&db, &owner, &[(2, "B"), (0, "Z"), (1, "A")]);

                let project = db.get_project(owner.id, created.project.id)
                    .expect("Query failed")
                    .expect("Project missing");

                let indexes: Vec<i64> = project.sections.iter().map(|s| s.order_index).collect();
                assert_eq!(indexes, vec![0, 1, 2]);
            }

            it "hides projects owned by someone else" {
                let created = create_test_project(&db, &owner, &[(1, "A")]);
                let other = create_test_user(&db, "other@example.com");

                let found = db.get_project(other.id, created.project.id).expect("Query failed");
                assert!(found.is_none());
            }
        }

        describe "get_projects" {
            it "returns only the owner's projects" {
                create_test_project(&db, &owner, &[(1, "A")]);
                create_test_project(&db, &owner, &[(1, "B")]);
                let other = create_test_user(&db, "other@example.com");
                create_test_project(&db, &other, &[(1, "C")]);

                let projects = db.get_projects(owner.id).expect("Query failed");
                assert_eq!(projects.len(), 2);
                assert!(projects.iter().all(|p| p.project.owner_id == owner.id));
            }
        }

        describe "delete_project" {
            it "cascades to sections and their history" {
                let project = create_test_project(&db, &owner, &[(1, "A")]);
                let section_id = project.sections[0].id;
                db.apply_refinement(section_id, "shorter", "Draft of A", "A").expect("Refine failed");
                db.add_comment(section_id, "note").expect("Comment failed");
                db.record_feedback(section_id, true).expect("Feedback failed");

                let deleted = db.delete_project(owner.id, project.project.id).expect("Delete failed");

                assert!(deleted);
                assert!(db.get_section(owner.id, section_id).expect("Query failed").is_none());
                assert!(db.get_refinements(section_id).expect("Query failed").is_empty());
                assert!(db.get_comments(section_id).expect("Query failed").is_empty());
                assert!(db.get_feedback(section_id).expect("Query failed").is_empty());
            }

            it "does not delete another user's project" {
                let project = create_test_project(&db, &owner, &[(1, "A")]);
                let other = create_test_user(&db, "other@example.com");

                let deleted = db.delete_project(other.id, project.project.id).expect("Delete failed");

                assert!(!deleted);
                assert!(db.get_project(owner.id, project.project.id).expect("Query failed").is_some());
            }
        }
    }

    describe "sections" {
        it "loads a section with its project's main topic" {
            let project = create_test_project(&db, &owner, &[(1, "Gulf Stream")]);

            let ctx = db.get_section(owner.id, project.sections[0].id)
                .expect("Query failed")
                .expect("Section missing");

            assert_eq!(ctx.main_topic, "Ocean Currents");
            assert_eq!(ctx.section.title, "Gulf Stream");
        }

        it "hides sections of other users' projects" {
            let project = create_test_project(&db, &owner, &[(1, "A")]);
            let other = create_test_user(&db, "other@example.com");

            let ctx = db.get_section(other.id, project.sections[0].id).expect("Query failed");
            assert!(ctx.is_none());
        }
    }

    describe "refinements" {
        it "replaces content and records the change" {
            let project = create_test_project(&db, &owner, &[(1, "A")]);
            let section_id = project.sections[0].id;

            let section = db.apply_refinement(section_id, "shorter", "Draft of A", "Short A")
                .expect("Refine failed")
                .expect("Section missing");

            assert_eq!(section.content.as_deref(), Some("Short A"));
            let history = db.get_refinements(section_id).expect("Query failed");
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].prompt, "shorter");
            assert_eq!(history[0].old_content.as_deref(), Some("Draft of A"));
            assert_eq!(history[0].new_content.as_deref(), Some("Short A"));
        }

        it "keeps the history as a chain" {
            let project = create_test_project(&db, &owner, &[(1, "A")]);
            let section_id = project.sections[0].id;
            db.apply_refinement(section_id, "one", "Draft of A", "v1").expect("Refine failed");
            db.apply_refinement(section_id, "two", "v1", "v2").expect("Refine failed");
            db.apply_refinement(section_id, "three", "v2", "v3").expect("Refine failed");

            let history = db.get_refinements(section_id).expect("Query failed");
            let prompts: Vec<&str> = history.iter().map(|r| r.prompt.as_str()).collect();
            assert_eq!(prompts, vec!["one", "two", "three"]);
            for pair in history.windows(2) {
                assert_eq!(pair[1].old_content, pair[0].new_content);
            }

            let ctx = db.get_section(owner.id, section_id).expect("Query failed").expect("Section missing");
            assert_eq!(ctx.section.content, history[2].new_content);
        }

        it "returns None for a missing section and records nothing" {
            let missing = Uuid::new_v4();

            let result = db.apply_refinement(missing, "shorter", "", "x").expect("Refine failed");

            assert!(result.is_none());
            assert!(db.get_refinements(missing).expect("Query failed").is_empty());
        }
    }

    describe "feedback" {
        it "stores each vote and keeps counters in step" {
            let project = create_test_project(&db, &owner, &[(1, "A")]);
            let section_id = project.sections[0].id;

            db.record_feedback(section_id, true).expect("Feedback failed");
            db.record_feedback(section_id, false).expect("Feedback failed");
            let result = db.record_feedback(section_id, true).expect("Feedback failed");

            assert!(result.ok);
            assert_eq!((result.likes, result.dislikes), (2, 1));

            let votes = db.get_feedback(section_id).expect("Query failed");
            let likes = votes.iter().filter(|f| f.is_like).count();
            assert_eq!(votes.len(), 3);
            assert_eq!(likes, 2);
        }
    }

    describe "comments" {
        it "lists comments oldest first" {
            let project = create_test_project(&db, &owner, &[(1, "A")]);
            let section_id = project.sections[0].id;
            db.add_comment(section_id, "first").expect("Comment failed");
            db.add_comment(section_id, "second").expect("Comment failed");

            let comments = db.get_comments(section_id).expect("Query failed");
            let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
            assert_eq!(texts, vec!["first", "second"]);
        }

        it "includes comments when loading a project" {
            let project = create_test_project(&db, &owner, &[(1, "A")]);
            db.add_comment(project.sections[0].id, "check numbers").expect("Comment failed");

            let loaded = db.get_project(owner.id, project.project.id)
                .expect("Query failed")
                .expect("Project missing");
            assert_eq!(loaded.sections[0].comments.len(), 1);
        }
    }

    describe "file-backed database" {
        it "persists across reopen" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("nested").join("docforge.db");

            let first = Database::open(path.clone()).expect("Failed to open");
            first.migrate().expect("Failed to migrate");
            let user = create_test_user(&first, "persist@example.com");
            create_test_project(&first, &user, &[(1, "A")]);
            drop(first);

            let second = Database::open(path).expect("Failed to reopen");
            second.migrate().expect("Failed to migrate again");
            let projects = second.get_projects(user.id).expect("Query failed");
            assert_eq!(projects.len(), 1);
        }
    }
}
