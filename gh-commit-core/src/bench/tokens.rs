// token estimation - a four-characters-per-token heuristic, not a tokenizer

/// approximate characters per token
const CHARS_PER_TOKEN: usize = 4;

/// estimated token counts for one trial
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenEstimate {
    pub input: u64,
    pub output: u64,
}

impl TokenEstimate {
    /// estimate both directions from character counts
    pub fn from_chars(in_chars: usize, out_chars: usize) -> Self {
        Self {
            input: estimate_tokens(in_chars),
            output: estimate_tokens(out_chars),
        }
    }
}

/// estimate tokens from a character count, rounding up
pub fn estimate_tokens(char_count: usize) -> u64 {
    char_count.div_ceil(CHARS_PER_TOKEN) as u64
}
