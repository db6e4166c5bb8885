/// Leaderboard persistence operations.
pub mod leaderboard_store;
/// Persisted document model definitions.
pub mod models;
/// Question set loading.
pub mod question_bank;
/// Storage abstraction layer for persistence operations.
pub mod storage;
