pub mod ollama;
pub mod remote;

/// Low-randomness sampling shared by all providers: repeated questions over
/// the same schema should converge on similar SQL.
pub const TEMPERATURE: f32 = 0.1;
pub const TOP_K: u32 = 10;
pub const TOP_P: f32 = 0.3;
