mod common;

use coach_programs::domain::entities::{MoveDirection, NewBlueprint, NewSection, SectionKind};
use coach_programs::domain::repositories::CurriculumRepository;
use coach_programs::error::AppError;
use coach_programs::infrastructure::persistence::PgCurriculumRepository;
use sqlx::PgPool;
use std::sync::Arc;

fn section(blueprint_id: i64, title: &str) -> NewSection {
    NewSection {
        blueprint_id,
        kind: SectionKind::Workout,
        title: title.to_string(),
        body: None,
        routine_block_id: None,
    }
}

async fn setup(pool: &PgPool) -> i64 {
    let coach = common::create_profile(pool, "coach@example.com", "coach").await;
    common::create_program(pool, coach, "engine", 0, None, "draft").await
}

#[sqlx::test]
async fn test_create_day_and_duplicate_number(pool: PgPool) {
    let program = setup(&pool).await;
    let repo = PgCurriculumRepository::new(Arc::new(pool));

    let day = repo
        .create_day(NewBlueprint {
            program_id: program,
            day_number: 3,
            title: "Intervals".to_string(),
            notes: None,
            is_rest_day: false,
        })
        .await
        .unwrap();

    assert_eq!(day.day_number, 3);
    assert_eq!(repo.last_day_number(program).await.unwrap(), Some(3));
    assert_eq!(repo.count_days(program).await.unwrap(), 1);

    let duplicate = repo
        .create_day(NewBlueprint {
            program_id: program,
            day_number: 3,
            title: "Again".to_string(),
            notes: None,
            is_rest_day: true,
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict { .. })));
}

#[sqlx::test]
async fn test_empty_plan_has_no_last_day(pool: PgPool) {
    let program = setup(&pool).await;
    let repo = PgCurriculumRepository::new(Arc::new(pool));

    assert_eq!(repo.last_day_number(program).await.unwrap(), None);
    assert!(repo.list_days(program).await.unwrap().is_empty());
}

#[sqlx::test]
async fn test_sections_append_in_order(pool: PgPool) {
    let program = setup(&pool).await;
    let day = common::create_day(&pool, program, 1, "Intervals").await;
    let repo = PgCurriculumRepository::new(Arc::new(pool));

    let first = repo.add_section(section(day, "Warm-up row")).await.unwrap();
    let second = repo.add_section(section(day, "Main set")).await.unwrap();

    assert_eq!(first.position, 1);
    assert_eq!(second.position, 2);
}

#[sqlx::test]
async fn test_delete_section_compacts_positions(pool: PgPool) {
    let program = setup(&pool).await;
    let day = common::create_day(&pool, program, 1, "Intervals").await;
    let repo = PgCurriculumRepository::new(Arc::new(pool));

    let a = repo.add_section(section(day, "A")).await.unwrap();
    repo.add_section(section(day, "B")).await.unwrap();
    repo.add_section(section(day, "C")).await.unwrap();

    assert!(repo.delete_section(a.id).await.unwrap());

    let sections = repo.list_sections(day).await.unwrap();
    let layout: Vec<(String, i32)> = sections.into_iter().map(|s| (s.title, s.position)).collect();
    assert_eq!(layout, vec![("B".to_string(), 1), ("C".to_string(), 2)]);
}

#[sqlx::test]
async fn test_move_section_swaps_neighbours(pool: PgPool) {
    let program = setup(&pool).await;
    let day = common::create_day(&pool, program, 1, "Intervals").await;
    let repo = PgCurriculumRepository::new(Arc::new(pool));

    let a = repo.add_section(section(day, "A")).await.unwrap();
    let b = repo.add_section(section(day, "B")).await.unwrap();

    assert!(repo.move_section(b.id, MoveDirection::Up).await.unwrap());
    let titles: Vec<String> = repo
        .list_sections(day)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["B", "A"]);

    // Already at the bottom after the swap.
    assert!(!repo.move_section(a.id, MoveDirection::Down).await.unwrap());
}

#[sqlx::test]
async fn test_copy_day_copies_sections(pool: PgPool) {
    let program = setup(&pool).await;
    let day = common::create_day(&pool, program, 1, "Intervals").await;
    let repo = PgCurriculumRepository::new(Arc::new(pool));
    repo.add_section(section(day, "A")).await.unwrap();
    repo.add_section(section(day, "B")).await.unwrap();

    let copy = repo.copy_day(day, 8).await.unwrap();

    assert_eq!(copy.day_number, 8);
    assert_eq!(copy.title, "Intervals");
    let titles: Vec<String> = repo
        .list_sections(copy.id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["A", "B"]);

    let taken = repo.copy_day(day, 8).await;
    assert!(matches!(taken, Err(AppError::Conflict { .. })));
}

#[sqlx::test]
async fn test_delete_day_cascades(pool: PgPool) {
    let program = setup(&pool).await;
    let day = common::create_day(&pool, program, 1, "Intervals").await;
    let repo = PgCurriculumRepository::new(Arc::new(pool.clone()));
    repo.add_section(section(day, "A")).await.unwrap();

    assert!(repo.delete_day(day).await.unwrap());

    let sections: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sections")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(sections, 0);
    assert!(repo.find_day(day).await.unwrap().is_none());
}
