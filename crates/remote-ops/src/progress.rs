//! Progress extraction from downloader diagnostics.

use std::sync::LazyLock;

use regex::Regex;

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("valid percent regex"));

/// Returns the most recent `NN%` value in `chunk`, if any.
///
/// A chunk may carry several progress updates; the last one is current.
/// Values above 100 are not percentages and are skipped.
pub fn parse_percent(chunk: &str) -> Option<u8> {
    PERCENT
        .captures_iter(chunk)
        .filter_map(|c| c[1].parse::<u8>().ok())
        .filter(|p| *p <= 100)
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wget_dot_progress() {
        let line = "  1500K .......... .......... .......... .......... .......... 42% 1.21M 9s";
        assert_eq!(parse_percent(line), Some(42));
    }

    #[test]
    fn last_match_wins() {
        let chunk = "  50K ....  3% 1M\n 100K ....  7% 2M\n";
        assert_eq!(parse_percent(chunk), Some(7));
    }

    #[test]
    fn batched_lines_report_current_progress_not_first() {
        // One read can carry several wget lines; reporting the first would
        // leave the bar behind until the next chunk arrives.
        let chunk = concat!(
            " 9950K .......... 98% 2.1M 0s\n",
            "10000K .......... 99% 2.2M 0s\n",
            "10050K ....  100% 2.3M=4s\n",
        );
        assert_ne!(parse_percent(chunk), Some(98));
        assert_eq!(parse_percent(chunk), Some(100));
    }

    #[test]
    fn no_percentage() {
        assert_eq!(parse_percent("Resolving archive.org... 207.241.224.2"), None);
        assert_eq!(parse_percent(""), None);
    }

    #[test]
    fn values_above_hundred_are_not_progress() {
        assert_eq!(parse_percent("999%"), None);
        assert_eq!(parse_percent("150% 42%"), Some(42));
        assert_eq!(parse_percent("100%"), Some(100));
        assert_eq!(parse_percent("0%"), Some(0));
    }
}
