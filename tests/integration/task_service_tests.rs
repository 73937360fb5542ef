use toachieve_app_lib::db::DbPool;
use toachieve_app_lib::error::AppError;
use toachieve_app_lib::models::task::{
    SortOrder, TaskCreateInput, TaskListQuery, TaskPriority, TaskSortKey, TaskUpdateInput,
};
use toachieve_app_lib::models::user::{CurrentUser, UserRole};
use toachieve_app_lib::services::task_service::{TaskService, DEFAULT_CATEGORY};
use tempfile::tempdir;

fn user() -> CurrentUser {
    CurrentUser::new("alice", UserRole::User)
}

#[test]
fn task_crud_flow() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("integration.sqlite")).expect("db pool");
    let service = TaskService::new(pool.clone());
    let user = user();

    // create
    let created = service
        .create_task(
            &user,
            TaskCreateInput {
                title: "  Integration Task  ".into(),
                priority: Some("High".into()),
                deadline: Some("2024-06-01T12:00:00+02:00".into()),
                ..Default::default()
            },
        )
        .expect("create task");
    assert!(!created.id.is_empty());
    assert_eq!(created.title, "Integration Task");
    assert_eq!(created.owner_id, "alice");
    assert_eq!(created.category, DEFAULT_CATEGORY);
    assert_eq!(created.priority, TaskPriority::High);
    assert_eq!(
        created.deadline.map(|due| due.to_rfc3339()),
        Some("2024-06-01T10:00:00+00:00".to_string())
    );
    assert!(!created.completed);
    assert!(created.completed_at.is_none());

    // read back from storage
    let fetched = service.get_task(&user, &created.id).expect("get task");
    assert_eq!(fetched, created);

    // update
    let updated = service
        .update_task(
            &user,
            &created.id,
            TaskUpdateInput {
                completed: Some(true),
                description: Some(Some("wrapped up".into())),
                estimated_time: Some(Some(1.5)),
                ..Default::default()
            },
        )
        .expect("update task");
    assert!(updated.completed);
    assert!(updated.completed_at.is_some());
    assert_eq!(updated.description.as_deref(), Some("wrapped up"));
    assert!(updated.is_planned());
    assert!(updated.updated_at >= created.updated_at);

    // clear the deadline
    let cleared = service
        .update_task(
            &user,
            &created.id,
            TaskUpdateInput {
                deadline: Some(None),
                ..Default::default()
            },
        )
        .expect("clear deadline");
    assert!(cleared.deadline.is_none());

    // delete
    service.delete_task(&user, &created.id).expect("delete task");
    let err = service
        .get_task(&user, &created.id)
        .expect_err("deleted task is gone");
    assert!(matches!(err, AppError::NotFound));
}

#[test]
fn completion_flag_and_timestamp_stay_in_step() {
    let dir = tempdir().expect("temp dir");
    let service = TaskService::new(DbPool::new(dir.path().join("tasks.sqlite")).expect("db pool"));
    let user = user();

    let from_timestamp = service
        .create_task(
            &user,
            TaskCreateInput {
                title: "Reported".into(),
                completed_at: Some("2024-05-07T14:00:00Z".into()),
                ..Default::default()
            },
        )
        .expect("create with timestamp");
    assert!(from_timestamp.completed);

    let reopened = service
        .update_task(
            &user,
            &from_timestamp.id,
            TaskUpdateInput {
                completed: Some(false),
                ..Default::default()
            },
        )
        .expect("reopen");
    assert!(!reopened.completed);
    assert!(reopened.completed_at.is_none());

    let stored = service.get_task(&user, &reopened.id).expect("reload");
    assert!(stored.completed_at.is_none());

    let reclosed = service
        .update_task(
            &user,
            &reopened.id,
            TaskUpdateInput {
                completed_at: Some(Some("2024-05-08T09:00:00Z".into())),
                ..Default::default()
            },
        )
        .expect("close via timestamp");
    assert!(reclosed.completed);
    assert!(reclosed.is_reported());
}

#[test]
fn list_filters_sorts_and_pages() {
    let dir = tempdir().expect("temp dir");
    let service = TaskService::new(DbPool::new(dir.path().join("list.sqlite")).expect("db pool"));
    let user = user();

    let seeds = [
        ("Write report", "Work", "high", "2024-05-01T09:00:00Z", Some("2024-05-03T00:00:00Z"), true),
        ("Gym session", "Health", "low", "2024-05-02T09:00:00Z", None, false),
        ("Review budget", "Work", "medium", "2024-05-03T09:00:00Z", Some("2024-05-02T00:00:00Z"), false),
        ("Read novel", "Leisure", "low", "2024-05-04T09:00:00Z", None, true),
    ];
    for (title, category, priority, created_at, deadline, completed) in seeds {
        service
            .create_task(
                &user,
                TaskCreateInput {
                    title: title.into(),
                    category: Some(category.into()),
                    priority: Some(priority.into()),
                    created_at: Some(created_at.into()),
                    deadline: deadline.map(Into::into),
                    completed: Some(completed),
                    ..Default::default()
                },
            )
            .expect("seed task");
    }
    service
        .create_task(
            &CurrentUser::new("bob", UserRole::User),
            TaskCreateInput {
                title: "Bob's chore".into(),
                ..Default::default()
            },
        )
        .expect("seed bob task");

    let all = service
        .list_tasks(&user, TaskListQuery::default())
        .expect("list all");
    assert_eq!(all.total, 4);
    assert_eq!(all.items[0].title, "Read novel");

    let work = service
        .list_tasks(
            &user,
            TaskListQuery {
                categories: Some(vec!["work".into()]),
                sort_by: TaskSortKey::Deadline,
                sort_order: SortOrder::Asc,
                ..Default::default()
            },
        )
        .expect("work tasks");
    let titles: Vec<&str> = work.items.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(titles, vec!["Review budget", "Write report"]);

    let open = service
        .list_tasks(
            &user,
            TaskListQuery {
                completed: Some(false),
                search: Some("GYM".into()),
                ..Default::default()
            },
        )
        .expect("open gym tasks");
    assert_eq!(open.total, 1);
    assert_eq!(open.items[0].category, "Health");

    let by_priority = service
        .list_tasks(
            &user,
            TaskListQuery {
                priorities: Some(vec!["low".into()]),
                created_after: Some("2024-05-03T00:00:00Z".into()),
                ..Default::default()
            },
        )
        .expect("recent low priority");
    assert_eq!(by_priority.total, 1);
    assert_eq!(by_priority.items[0].title, "Read novel");

    let page_two = service
        .list_tasks(
            &user,
            TaskListQuery {
                sort_by: TaskSortKey::Title,
                sort_order: SortOrder::Asc,
                page: Some(2),
                page_size: Some(3),
                ..Default::default()
            },
        )
        .expect("second page");
    assert_eq!(page_two.total, 4);
    assert_eq!(page_two.page, 2);
    assert_eq!(page_two.items.len(), 1);
    assert_eq!(page_two.items[0].title, "Write report");

    let beyond = service
        .list_tasks(
            &user,
            TaskListQuery {
                page: Some(9),
                ..Default::default()
            },
        )
        .expect("page past the end");
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 4);
}

#[test]
fn tasks_are_scoped_to_their_owner() {
    let dir = tempdir().expect("temp dir");
    let service = TaskService::new(DbPool::new(dir.path().join("owners.sqlite")).expect("db pool"));
    let alice = user();
    let bob = CurrentUser::new("bob", UserRole::User);
    let admin = CurrentUser::new("root", UserRole::Admin);

    let task = service
        .create_task(
            &alice,
            TaskCreateInput {
                title: "Private".into(),
                ..Default::default()
            },
        )
        .expect("create task");

    let err = service.get_task(&bob, &task.id).expect_err("bob is blocked");
    assert!(matches!(err, AppError::Forbidden { .. }));
    let err = service
        .delete_task(&bob, &task.id)
        .expect_err("bob cannot delete");
    assert!(matches!(err, AppError::Forbidden { .. }));

    let err = service
        .list_tasks(
            &bob,
            TaskListQuery {
                owner_id: Some("alice".into()),
                ..Default::default()
            },
        )
        .expect_err("bob cannot list alice");
    assert!(matches!(err, AppError::Forbidden { .. }));

    let listed = service
        .list_tasks(
            &admin,
            TaskListQuery {
                owner_id: Some("alice".into()),
                ..Default::default()
            },
        )
        .expect("admin lists alice");
    assert_eq!(listed.total, 1);
    assert_eq!(service.get_task(&admin, &task.id).expect("admin reads").title, "Private");
}
