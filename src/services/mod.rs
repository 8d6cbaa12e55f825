pub mod maintenance;
pub mod matching;
pub mod migration;
pub mod retry;
pub mod spotify;
