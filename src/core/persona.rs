//! Fixed persona prompt and the farewell short-circuit.

pub const PERSONA_PROMPT: &str = "You are OpenSourceBuddy 🤖, a friendly assistant who helps newcomers get started with open-source, \
explains contribution steps simply, and shares competitions and opportunities. \
Give short, structured answers (2–5 lines). Be encouraging and mentor-like. \
If asked something unrelated to open source, politely say: \
'I'm here to help you with open-source and opportunities. I can’t help with that.'";

pub const FAREWELL: &str = "It was great helping you! Keep contributing! 👋";

const FAREWELL_KEYWORDS: [&str; 3] = ["exit", "quit", "bye"];

/// True when the (already trimmed) input asks to end the conversation.
pub fn is_farewell(input: &str) -> bool {
    FAREWELL_KEYWORDS
        .iter()
        .any(|keyword| input.trim().eq_ignore_ascii_case(keyword))
}
