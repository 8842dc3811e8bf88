pub mod detection;
pub mod nlu;
pub mod queue;
pub mod storage;
