pub mod db;
pub mod estimate_llm;
pub mod layout_llm;

pub use db::DbAdapter;
pub use estimate_llm::OpenAiEstimateAdapter;
pub use layout_llm::OpenAiLayoutAdapter;
