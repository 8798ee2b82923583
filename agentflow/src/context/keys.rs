//! Well-known context keys.

/// The inbound message text.
pub const INPUT_TEXT: &str = "input_text";
/// Optional path of a document accompanying the message.
pub const PDF_PATH: &str = "pdf_path";
/// Generated quiz.
pub const QUIZ: &str = "quiz";
/// Extracted city name.
pub const CITY: &str = "city";
/// Current weather for the city.
pub const WEATHER: &str = "weather";
/// Current local time for the city.
pub const TIME: &str = "time";
/// Refined query proposed by the research evaluator.
pub const SEARCH_QUERY: &str = "search_query";
/// Latest search result.
pub const SEARCH_RESULT: &str = "search_result";
/// Text extracted from the accompanying document.
pub const PDF_TEXT: &str = "pdf_text";
/// One-sentence answer for the user.
pub const FINAL_RESPONSE: &str = "final_response";

/// Owner recorded for keys seeded from the inbound message.
pub const INPUT_OWNER: &str = "input";

/// Keys written from the inbound message rather than by a stage.
pub const SEED_KEYS: &[&str] = &[INPUT_TEXT, PDF_PATH];
