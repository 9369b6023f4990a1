pub mod landmarks;
pub mod reducer;
pub mod extraction;
pub mod oracle;
pub mod stages;
pub mod graph;
pub mod fanout; // 4-way analysis fan-out with scoped threads
pub mod engine;
pub mod processor; // Directory driver + production factory
