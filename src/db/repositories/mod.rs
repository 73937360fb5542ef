pub mod settings_repository;
pub mod snapshot_repository;
pub mod task_repository;
