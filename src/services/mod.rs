pub mod calendar_utils;
pub mod grade;
pub mod identity_service;
pub mod monthly_score;
pub mod overall_stats;
pub mod performance_service;
pub mod report_cache;
pub mod settings_service;
pub mod task_service;
pub mod week_partition;
pub mod weekly_score;
