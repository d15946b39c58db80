use error_stack::{Report, bail};

use crate::error::CommandError;
use crate::model::ReportMode;

/// Words that ask for the full breakdown instead of the overview.
const FULL_MODE_WORDS: &[&str] = &["full", "breakdown", "deep", "detailed"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisCommand {
    /// Upper-case ticker or provider id as typed by the user.
    pub symbol: String,
    pub mode: ReportMode,
}

/// Parse free text such as `"analyze btc"` or `"full breakdown $ETH"`.
///
/// The last word names the asset. Input made only of mode words has no asset;
/// prefix a ticker with `$` (e.g. `$deep`) to use a mode word as a symbol.
pub fn parse(input: &str) -> Result<AnalysisCommand, Report<CommandError>> {
    let words: Vec<&str> = input.split_whitespace().collect();
    let Some(last) = words.last() else {
        bail!(CommandError::Empty);
    };

    let symbol = last.trim_start_matches('$').to_uppercase();
    if symbol.is_empty() {
        bail!(CommandError::Empty);
    }

    let mode_words = words.iter().filter(|w| is_mode_word(w)).count();
    if mode_words == words.len() {
        bail!(CommandError::MissingSymbol);
    }

    Ok(AnalysisCommand {
        symbol,
        mode: if mode_words > 0 {
            ReportMode::Full
        } else {
            ReportMode::Overview
        },
    })
}

fn is_mode_word(word: &str) -> bool {
    FULL_MODE_WORDS.iter().any(|f| word.eq_ignore_ascii_case(f))
}
