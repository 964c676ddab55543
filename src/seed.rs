// src/seed.rs

//! Demo catalogue and account written into an empty store on startup.

use crate::{
    error::AppError,
    models::{exam::Exam, question::Question, user::User},
    store::RecordStore,
    utils::hash::hash_password,
};

pub const DEMO_USER_ID: &str = "1234567890";
pub const DEMO_USER_EMAIL: &str = "test@example.com";
pub const DEMO_USER_PASSWORD: &str = "password123";

fn q(id: i64, text: &str, options: [&str; 4], correct_answer: usize, category: &str) -> Question {
    Question {
        id,
        text: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer,
        category: category.to_string(),
    }
}

/// The three certification exams offered out of the box.
pub fn demo_exams() -> Vec<Exam> {
    vec![
        Exam {
            id: "exam-001".to_string(),
            title: "ORACLE APEX".to_string(),
            description: "Certification exam for Oracle APEX application development".to_string(),
            duration: 60,
            total_questions: 5,
            passing_score: 70,
            questions: vec![
                q(
                    1,
                    "Which language is used to write server-side logic in Oracle APEX?",
                    ["Java", "PL/SQL", "C#", "Python"],
                    1,
                    "Fundamentals",
                ),
                q(
                    2,
                    "What holds the state of a page item between requests?",
                    ["Session state", "Cookies only", "Browser cache", "Local storage"],
                    0,
                    "Fundamentals",
                ),
                q(
                    3,
                    "Which component displays editable tabular data?",
                    ["Classic Report", "Chart", "Interactive Grid", "Card Region"],
                    2,
                    "Components",
                ),
                q(
                    4,
                    "Dynamic Actions are primarily used to...",
                    [
                        "Define database tables",
                        "Add client-side behavior declaratively",
                        "Schedule background jobs",
                        "Manage workspace users",
                    ],
                    1,
                    "Components",
                ),
                q(
                    5,
                    "Where are APEX applications stored?",
                    [
                        "Flat files on the web server",
                        "An Oracle Database schema",
                        "A Git repository",
                        "The browser",
                    ],
                    1,
                    "Architecture",
                ),
            ],
        },
        Exam {
            id: "exam-002".to_string(),
            title: "Node.js Development".to_string(),
            description: "Certification exam for Node.js application development".to_string(),
            duration: 60,
            total_questions: 5,
            passing_score: 70,
            questions: vec![
                q(
                    1,
                    "Which module is used to create an HTTP server?",
                    ["fs", "http", "path", "os"],
                    1,
                    "Core Modules",
                ),
                q(
                    2,
                    "What runs callbacks once the call stack is empty?",
                    ["The event loop", "The garbage collector", "The JIT", "The linker"],
                    0,
                    "Runtime",
                ),
                q(
                    3,
                    "Which file lists a project's dependencies?",
                    ["index.js", "node_modules", "package.json", ".npmrc"],
                    2,
                    "Tooling",
                ),
                q(
                    4,
                    "Which keyword pauses an async function until a promise settles?",
                    ["yield", "defer", "await", "then"],
                    2,
                    "Async",
                ),
                q(
                    5,
                    "How do you read an environment variable?",
                    ["process.env.NAME", "os.env.NAME", "global.NAME", "require('env').NAME"],
                    0,
                    "Runtime",
                ),
            ],
        },
        Exam {
            id: "exam-003".to_string(),
            title: "React Framework".to_string(),
            description: "Certification exam for React.js front-end development".to_string(),
            duration: 60,
            total_questions: 5,
            passing_score: 70,
            questions: vec![
                q(
                    1,
                    "Which hook stores local component state?",
                    ["useEffect", "useState", "useMemo", "useRef"],
                    1,
                    "Hooks",
                ),
                q(
                    2,
                    "What must every element in a rendered list have?",
                    ["An id attribute", "A unique key prop", "A ref", "A className"],
                    1,
                    "Rendering",
                ),
                q(
                    3,
                    "Props are...",
                    [
                        "Mutable by the child",
                        "Read-only inputs to a component",
                        "Global variables",
                        "CSS rules",
                    ],
                    1,
                    "Components",
                ),
                q(
                    4,
                    "Which hook runs side effects after render?",
                    ["useEffect", "useReducer", "useContext", "useId"],
                    0,
                    "Hooks",
                ),
                q(
                    5,
                    "JSX compiles to calls of...",
                    ["document.createElement", "React.createElement / jsx()", "innerHTML", "eval"],
                    1,
                    "Rendering",
                ),
            ],
        },
    ]
}

/// Seeds exams and a demo account into an empty store. Existing data is
/// never touched.
pub async fn seed_demo_data(store: &dyn RecordStore) -> Result<(), AppError> {
    if store.list_exams().await?.is_empty() {
        for exam in demo_exams() {
            tracing::info!("Seeding exam {} ({})", exam.id, exam.title);
            store.insert_exam(&exam).await?;
        }
    }

    if store.list_users().await?.is_empty() {
        tracing::info!("Seeding demo user {}", DEMO_USER_EMAIL);
        store
            .insert_user(&User {
                id: DEMO_USER_ID.to_string(),
                email: DEMO_USER_EMAIL.to_string(),
                name: "Test User".to_string(),
                preferred_field: Some("apex".to_string()),
                password: Some(hash_password(DEMO_USER_PASSWORD)?),
                assigned_exam_id: None,
            })
            .await?;
    }

    Ok(())
}
